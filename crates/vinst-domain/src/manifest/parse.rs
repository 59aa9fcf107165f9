use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use toml_edit::{DocumentMut, Item, TableLike};

use super::validate::{validate_manifest, ManifestError, ManifestIssue};
use super::{BuildMode, Manifest, PackageSpec, RuntimeRequirements, SmokeTest};

pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&contents)
}

/// Parses and validates a manifest. Every problem found is reported at once.
pub fn parse_manifest(contents: &str) -> Result<Manifest, ManifestError> {
    let doc: DocumentMut = contents.parse()?;
    let mut issues = Vec::new();
    let manifest = read_manifest(&doc, &mut issues);
    issues.extend(validate_manifest(&manifest));
    if issues.is_empty() {
        Ok(manifest)
    } else {
        Err(ManifestError::Invalid(issues))
    }
}

fn read_manifest(doc: &DocumentMut, issues: &mut Vec<ManifestIssue>) -> Manifest {
    let package = doc.get("package").and_then(Item::as_table_like);
    if package.is_none() {
        issues.push(ManifestIssue::new("package", "missing [package] table"));
    }
    let root = package.map_or_else(
        || PackageSpec::new("", "", ""),
        |table| read_package_spec(table, "package", issues),
    );
    let version = package
        .map(|table| string_field(table, "version", "package", issues))
        .unwrap_or_default();
    let description = package.and_then(|table| optional_string(table, "description", "package", issues));
    let homepage = package.and_then(|table| optional_string(table, "homepage", "package", issues));
    if root.build != BuildMode::Standard {
        issues.push(ManifestIssue::new(
            "package.build",
            "the root package is always installed with the standard build",
        ));
    }

    let runtime = read_runtime(doc, issues);
    let resources = read_resources(doc, issues);
    let links = doc
        .get("link")
        .and_then(Item::as_table_like)
        .map(|table| string_list(table, "bin", "link", issues))
        .unwrap_or_default();
    let test = read_smoke_test(doc, issues);

    Manifest {
        name: root.name.clone(),
        version,
        description,
        homepage,
        root,
        runtime,
        resources,
        links,
        test,
    }
}

fn read_runtime(doc: &DocumentMut, issues: &mut Vec<ManifestIssue>) -> RuntimeRequirements {
    let mut runtime = RuntimeRequirements::default();
    let Some(table) = doc.get("runtime").and_then(Item::as_table_like) else {
        return runtime;
    };
    if let Some(python) = optional_string(table, "python", "runtime", issues) {
        runtime.python = python;
    }
    runtime.build_requires = string_list(table, "build-requires", "runtime", issues);
    runtime
}

fn read_resources(doc: &DocumentMut, issues: &mut Vec<ManifestIssue>) -> Vec<PackageSpec> {
    let Some(item) = doc.get("resource") else {
        return Vec::new();
    };
    let Some(tables) = item.as_array_of_tables() else {
        issues.push(ManifestIssue::new(
            "resource",
            "expected an array of [[resource]] tables",
        ));
        return Vec::new();
    };
    tables
        .iter()
        .enumerate()
        .map(|(idx, table)| read_package_spec(table, &format!("resource[{idx}]"), issues))
        .collect()
}

fn read_smoke_test(doc: &DocumentMut, issues: &mut Vec<ManifestIssue>) -> SmokeTest {
    let mut test = SmokeTest::default();
    let Some(table) = doc.get("test").and_then(Item::as_table_like) else {
        return test;
    };
    if table.contains_key("args") {
        test.args = string_list(table, "args", "test", issues);
    }
    test.expect = optional_string(table, "expect", "test", issues);
    test
}

fn read_package_spec(
    table: &dyn TableLike,
    prefix: &str,
    issues: &mut Vec<ManifestIssue>,
) -> PackageSpec {
    let name = string_field(table, "name", prefix, issues);
    let url = string_field(table, "url", prefix, issues);
    let sha256 = string_field(table, "sha256", prefix, issues).to_ascii_lowercase();
    let build = match optional_string(table, "build", prefix, issues) {
        None => BuildMode::Standard,
        Some(raw) => BuildMode::parse(&raw).unwrap_or_else(|| {
            issues.push(ManifestIssue::new(
                format!("{prefix}.build"),
                format!("unknown build mode `{raw}` (expected `standard` or `source`)"),
            ));
            BuildMode::Standard
        }),
    };
    let env = read_env(table, prefix, issues);
    PackageSpec {
        name,
        url,
        sha256,
        build,
        env,
    }
}

fn read_env(
    table: &dyn TableLike,
    prefix: &str,
    issues: &mut Vec<ManifestIssue>,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    let Some(item) = table.get("env") else {
        return env;
    };
    let Some(entries) = item.as_table_like() else {
        issues.push(ManifestIssue::new(
            format!("{prefix}.env"),
            "expected a table of strings",
        ));
        return env;
    };
    for (key, value) in entries.iter() {
        match value.as_str() {
            Some(value) => {
                env.insert(key.to_string(), value.to_string());
            }
            None => issues.push(ManifestIssue::new(
                format!("{prefix}.env.{key}"),
                "expected a string",
            )),
        }
    }
    env
}

fn string_field(
    table: &dyn TableLike,
    key: &str,
    prefix: &str,
    issues: &mut Vec<ManifestIssue>,
) -> String {
    optional_string(table, key, prefix, issues).unwrap_or_default()
}

fn optional_string(
    table: &dyn TableLike,
    key: &str,
    prefix: &str,
    issues: &mut Vec<ManifestIssue>,
) -> Option<String> {
    let item = table.get(key)?;
    if let Some(value) = item.as_str() {
        Some(value.trim().to_string())
    } else {
        issues.push(ManifestIssue::new(
            format!("{prefix}.{key}"),
            "expected a string",
        ));
        None
    }
}

fn string_list(
    table: &dyn TableLike,
    key: &str,
    prefix: &str,
    issues: &mut Vec<ManifestIssue>,
) -> Vec<String> {
    let Some(item) = table.get(key) else {
        return Vec::new();
    };
    let Some(array) = item.as_array() else {
        issues.push(ManifestIssue::new(
            format!("{prefix}.{key}"),
            "expected an array of strings",
        ));
        return Vec::new();
    };
    let mut values = Vec::new();
    for (idx, value) in array.iter().enumerate() {
        match value.as_str() {
            Some(value) => values.push(value.trim().to_string()),
            None => issues.push(ManifestIssue::new(
                format!("{prefix}.{key}[{idx}]"),
                "expected a string",
            )),
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "e0f2f813f7e12311a4cdccc97d6ba0a6781e9c1aa8eca0ab00d5931c0113a308";
    const HASH_B: &str = "f4f6e119474e58e04a2b1af817eb585b4fd72bdd89b998624712b5c99be7641c";
    const HASH_ROOT: &str = "6da503bd74cfeafbb5cd385854bf8d8f9bdc76024818a8f0ea2382b3898c7677";

    fn sample() -> String {
        format!(
            r#"
[package]
name = "demo-app"
version = "1.2.3"
description = "demo"
url = "https://example.invalid/demo-app-1.2.3.tar.gz"
sha256 = "{HASH_ROOT}"

[runtime]
python = "python3.11"
build-requires = ["cargo"]

[link]
bin = ["demo"]

[test]
args = ["--help"]
expect = "usage"

[[resource]]
name = "agate"
url = "https://example.invalid/agate-1.6.3.tar.gz"
sha256 = "{HASH_A}"

[[resource]]
name = "native-ext"
url = "https://example.invalid/native-ext-2.0.tar.gz"
sha256 = "{HASH_B}"
build = "source"
env = {{ CARGO_NET_GIT_FETCH_WITH_CLI = "true" }}
"#
        )
    }

    #[test]
    fn parses_complete_manifest() {
        let manifest = parse_manifest(&sample()).expect("valid manifest");
        assert_eq!(manifest.name, "demo-app");
        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(manifest.description.as_deref(), Some("demo"));
        assert_eq!(manifest.homepage, None);
        assert_eq!(manifest.runtime.python, "python3.11");
        assert_eq!(manifest.runtime.build_requires, vec!["cargo".to_string()]);
        assert_eq!(manifest.links, vec!["demo".to_string()]);
        assert_eq!(manifest.test.args, vec!["--help".to_string()]);
        assert_eq!(manifest.test.expect.as_deref(), Some("usage"));
        assert_eq!(manifest.resources.len(), 2);
        let native = manifest.source_resource().expect("source resource");
        assert_eq!(native.name, "native-ext");
        assert_eq!(
            native.env.get("CARGO_NET_GIT_FETCH_WITH_CLI").map(String::as_str),
            Some("true")
        );
        let standard: Vec<_> = manifest.standard_resources().map(|s| s.name.as_str()).collect();
        assert_eq!(standard, vec!["agate"]);
    }

    #[test]
    fn defaults_apply_when_optional_tables_are_missing() {
        let manifest = parse_manifest(&format!(
            "[package]\nname = \"solo\"\nversion = \"0.1\"\nurl = \"https://example.invalid/solo-0.1.tar.gz\"\nsha256 = \"{HASH_ROOT}\"\n"
        ))
        .expect("valid manifest");
        assert!(manifest.resources.is_empty());
        assert!(manifest.links.is_empty());
        assert_eq!(manifest.runtime, RuntimeRequirements::default());
        assert_eq!(manifest.test, SmokeTest::default());
    }

    #[test]
    fn uppercase_hashes_are_normalized() {
        let manifest = parse_manifest(&format!(
            "[package]\nname = \"solo\"\nversion = \"0.1\"\nurl = \"https://example.invalid/solo.tar.gz\"\nsha256 = \"{}\"\n",
            HASH_ROOT.to_ascii_uppercase()
        ))
        .expect("valid manifest");
        assert_eq!(manifest.root.sha256, HASH_ROOT);
    }

    #[test]
    fn reports_every_issue_at_once() {
        let err = parse_manifest(
            r#"
[package]
name = "broken"
url = "https://example.invalid/broken.tar.gz"
sha256 = "abc"

[[resource]]
name = "x"
url = "ftp://example.invalid/x.tar.gz"
sha256 = "zz"
build = "fast"
"#,
        )
        .expect_err("invalid manifest");
        let ManifestError::Invalid(issues) = err else {
            panic!("expected validation issues");
        };
        let fields: Vec<_> = issues.iter().map(|issue| issue.field.as_str()).collect();
        assert!(fields.contains(&"package.version"), "{fields:?}");
        assert!(fields.contains(&"package.sha256"), "{fields:?}");
        assert!(fields.contains(&"resource[0].build"), "{fields:?}");
        assert!(fields.contains(&"resource[0].url"), "{fields:?}");
        assert!(fields.contains(&"resource[0].sha256"), "{fields:?}");
    }

    #[test]
    fn rejects_invalid_toml() {
        let err = parse_manifest("[package\nname = 1").expect_err("syntax error");
        assert!(matches!(err, ManifestError::Syntax(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_manifest(&temp.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
