pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod formula;
pub(crate) mod install;
pub(crate) mod runtime;
pub(crate) mod smoke;
pub(crate) mod store;
pub(crate) mod tooling;
