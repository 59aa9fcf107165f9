use sha2::{Digest, Sha256};

use super::{Manifest, PackageSpec};

/// Hash of everything in a manifest that changes what ends up installed.
///
/// Descriptive fields (description, homepage, smoke test) are excluded so
/// editing them does not invalidate an existing install.
pub fn manifest_fingerprint(manifest: &Manifest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"version:");
    hasher.update(manifest.version.trim().as_bytes());
    hasher.update(b"\npython:");
    hasher.update(manifest.runtime.python.trim().as_bytes());
    hasher.update(b"\n");
    update_spec(&mut hasher, "root", &manifest.root);
    for spec in &manifest.resources {
        update_spec(&mut hasher, "resource", spec);
    }
    for link in &manifest.links {
        hasher.update(b"link:");
        hasher.update(link.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn update_spec(hasher: &mut Sha256, kind: &str, spec: &PackageSpec) {
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(spec.name.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(spec.url.as_bytes());
    hasher.update(b"|");
    hasher.update(spec.sha256.as_bytes());
    hasher.update(b"|");
    hasher.update(spec.build.as_str().as_bytes());
    for (key, value) in &spec.env {
        hasher.update(b"|");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    hasher.update(b"\n");
}
