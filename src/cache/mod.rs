//! Content-addressed cache identity
//!
//! Cache keys name one package's build output; the bundle fingerprint names a
//! whole manifest.
//!
//! | Kind | Key |
//! |------|-----|
//! | git | `name_<sha256(repo)[..32]>_commit` |
//! | svn | `name_revision` |
//! | npm | `name_version` |

pub mod fingerprint;
pub mod key;

pub use fingerprint::bundle_fingerprint;
pub use key::{derive_key, hash_repo_url, CacheKey};
