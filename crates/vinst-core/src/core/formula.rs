use vinst_domain::{parse_manifest, Manifest, ManifestError};

/// Label used for the manifest compiled into the binary.
pub const BUNDLED_MANIFEST_NAME: &str = "dbt-snowflake";

const BUNDLED_MANIFEST: &str = include_str!("../../../../formulas/dbt-snowflake.toml");

/// The dbt-snowflake manifest shipped with vinst.
pub fn bundled_manifest() -> Result<Manifest, ManifestError> {
    parse_manifest(BUNDLED_MANIFEST)
}
