#![deny(clippy::all)]

mod core;

pub(crate) use crate::core::runtime::{effects, process};
pub(crate) use crate::core::tooling::outcome;
pub(crate) use crate::core::{config, formula, install, smoke, store};

pub use crate::core::commands::{
    execute, execute_with, format_status_message, to_json_response, CommandGroup, CommandInfo,
    ManifestSource, VinstCommand,
};
pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{Config, GlobalOptions, InstallLayout, NetworkConfig};
pub use crate::core::formula::{bundled_manifest, BUNDLED_MANIFEST_NAME};
pub use crate::core::install::{
    InstallError, InstallPhase, InstallReceipt, InstallReport, InstallState, InstalledPackage,
    Installer, PackageRole,
};
pub use crate::core::runtime::effects::{
    ArtifactFetcher, Effects, PythonRuntime, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::process::RunOutput;
pub use crate::core::smoke::{run_smoke_test, SmokeReport};
pub use crate::core::store::{FetchRequest, FetchedArtifact};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome, InstallUserError};

pub const VINST_VERSION: &str = env!("CARGO_PKG_VERSION");
