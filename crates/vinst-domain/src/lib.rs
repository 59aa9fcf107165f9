#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod manifest;

pub use manifest::{
    artifact_filename, canonicalize_package_name, load_manifest, manifest_fingerprint,
    parse_manifest, validate_manifest, BuildMode, Manifest, ManifestError, ManifestIssue,
    PackageSpec, RuntimeRequirements, SmokeTest, DEFAULT_PYTHON, DEFAULT_SMOKE_ARGS,
};
