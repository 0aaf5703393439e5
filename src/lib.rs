//! Dobro - dependency installer with a content-addressable build cache
//!
//! Installs the packages listed in a project manifest from git, svn or the
//! npm registry. Each package's build output is stored under a key derived
//! from its source, so later installs anywhere that shares the storage
//! backends pull the archive instead of rebuilding it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod install;
pub mod manifest;
pub mod pipeline;
pub mod process;
pub mod staging;
pub mod storage;
pub mod ui;

pub use error::{DobroError, DobroResult};
