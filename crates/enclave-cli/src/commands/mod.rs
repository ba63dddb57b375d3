//! CLI command implementations.

pub(crate) mod config;
pub(crate) mod dirs;
pub(crate) mod files;
pub(crate) mod log;
pub(crate) mod workspace;
