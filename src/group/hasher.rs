//! Group identity hashing
//!
//! Identities are SHA-1 over the sorted paths, concatenated without
//! separators. Collision resistance only matters for identity stability,
//! not security. The exact byte stream is part of the workspace format:
//! changing it would orphan every result and lease already on disk.

use sha1::{Digest, Sha1};

/// Length of an identity in hex characters (160-bit digest)
pub const HASH_HEX_LEN: usize = 40;

/// Compute the identity of a group of paths
///
/// Paths are sorted by byte order before hashing, so any permutation of the
/// same set yields the same identity.
///
/// # Example
///
/// ```
/// use fs_workqueue::group::compute_group_hash;
///
/// let a = compute_group_hash(&["/data/b.pdf", "/data/a.pdf"]);
/// let b = compute_group_hash(&["/data/a.pdf", "/data/b.pdf"]);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 40);
/// ```
pub fn compute_group_hash<S: AsRef<str>>(paths: &[S]) -> String {
    let mut sorted: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = Sha1::new();
    for path in sorted {
        hasher.update(path.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_independent() {
        let forward = compute_group_hash(&["a", "b", "c"]);
        let reversed = compute_group_hash(&["c", "b", "a"]);
        let shuffled = compute_group_hash(&["b", "c", "a"]);

        assert_eq!(forward, reversed);
        assert_eq!(forward, shuffled);
        assert_eq!(forward.len(), HASH_HEX_LEN);
    }

    #[test]
    fn test_known_digest() {
        // sha1("abc")
        assert_eq!(
            compute_group_hash(&["a", "b", "c"]),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        // sha1("")
        let empty: [&str; 0] = [];
        assert_eq!(
            compute_group_hash(&empty),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_different_sets_differ() {
        let a = compute_group_hash(&["/data/1.pdf", "/data/2.pdf"]);
        let b = compute_group_hash(&["/data/1.pdf", "/data/3.pdf"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_accepts_owned_strings() {
        let owned = vec!["/x".to_string(), "/y".to_string()];
        assert_eq!(compute_group_hash(&owned), compute_group_hash(&["/y", "/x"]));
    }
}
