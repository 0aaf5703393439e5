//! Artifact storage
//!
//! Backends keep one tar archive per cache key:
//! - `local`: `<path>/<key>/<key>.tar` on a local or mounted filesystem
//! - `svn`: `<url>/<key>/<key>.tar` in an SVN repository
//!
//! A `StorageChain` orders them for fallback pulls and broadcast pushes.

pub mod archive;
mod backend;
mod chain;
mod config;
mod factory;
mod local;
mod svn;

pub use backend::{PullResult, PushResult, StorageBackend};
pub use chain::{ChainPull, PushReport, StorageChain};
pub use config::StorageConfig;
pub use factory::{create_backend, create_chain};
pub use local::{LocalBackend, LocalEntry};
pub use svn::SvnBackend;
