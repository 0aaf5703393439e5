//! Whole-manifest fingerprint
//!
//! Identifies a bundle independently of the order its packages are listed in.

use crate::manifest::PackageSpec;
use sha2::{Digest, Sha256};

/// Concatenate a package's fields as `key + value`, sorted by key
fn package_string(spec: &PackageSpec) -> String {
    spec.fields()
        .into_iter()
        .map(|(key, value)| format!("{}{}", key, value))
        .collect()
}

/// Compute the bundle fingerprint of a manifest
///
/// Packages are sorted by name (ties broken by their field string so equal
/// multisets always produce the same input), each contributes its sorted
/// fields, and the concatenation is hashed with SHA256.
pub fn bundle_fingerprint(specs: &[PackageSpec]) -> String {
    let mut entries: Vec<(&str, String)> = specs
        .iter()
        .map(|spec| (spec.name.as_str(), package_string(spec)))
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (_, fields) in &entries {
        hasher.update(fields.as_bytes());
    }

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> Vec<PackageSpec> {
        vec![
            PackageSpec::git("lib", "https://example.com/lib.git", Some("abc")),
            PackageSpec::svn("old", "https://svn.example.com/old", "12"),
            PackageSpec::registry("left-pad", "1.3.0"),
        ]
    }

    #[test]
    fn package_string_is_sorted_key_value() {
        let spec = PackageSpec::registry("left-pad", "1.3.0");
        assert_eq!(package_string(&spec), "nameleft-padtypenpmversion1.3.0");
    }

    #[test]
    fn order_independent() {
        let forward = bundle();
        let mut reversed = bundle();
        reversed.reverse();

        assert_eq!(bundle_fingerprint(&forward), bundle_fingerprint(&reversed));
    }

    #[test]
    fn order_independent_with_duplicate_names() {
        let a = PackageSpec::registry("dup", "1.0.0");
        let b = PackageSpec::registry("dup", "2.0.0");

        assert_eq!(
            bundle_fingerprint(&[a.clone(), b.clone()]),
            bundle_fingerprint(&[b, a])
        );
    }

    #[test]
    fn content_sensitive() {
        let mut changed = bundle();
        changed[2] = PackageSpec::registry("left-pad", "1.3.1");

        assert_ne!(bundle_fingerprint(&bundle()), bundle_fingerprint(&changed));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = bundle_fingerprint(&bundle());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
