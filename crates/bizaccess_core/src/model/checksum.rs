//! Checksum-based identifier derivation.
//!
//! # Invariants
//! - Output depends only on `(namespace, key)`; no clock, randomness or
//!   process state is involved.
//! - Identifiers are prefixed with their namespace tag.

use super::access::AccessId;
use sha2::{Digest, Sha256};

/// Namespace tag for access grant identifiers.
pub const ACCESS_ID_NAMESPACE: &str = "aces";

/// Marker prepended to the key of grants that carry no site.
pub const UNSCOPED_KEY_MARKER: &str = "-";

const CHECKSUM_HEX_LEN: usize = 32;

/// Derives a stable identifier from a namespace tag and a key string.
pub fn checksum_id(namespace: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update([0x1f]);
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{namespace}_{}", &digest[..CHECKSUM_HEX_LEN])
}

/// Builds the key string an access id is derived from.
///
/// Site-scoped grants concatenate `user_id + site_id`; unscoped grants use
/// `"-" + user_id`. The concatenation has no separator, so distinct pairs
/// such as `("U1", "S1")` and `("U1S", "1")` share a key.
pub fn access_key(user_id: &str, site_id: Option<&str>) -> String {
    match site_id {
        Some(site_id) => format!("{user_id}{site_id}"),
        None => format!("{UNSCOPED_KEY_MARKER}{user_id}"),
    }
}

/// Derives the access id for a user, optionally scoped to a site.
///
/// The granted role does not participate: one user holds at most one grant
/// per site (or per unscoped slot).
pub fn derive_access_id(user_id: &str, site_id: Option<&str>) -> AccessId {
    checksum_id(ACCESS_ID_NAMESPACE, &access_key(user_id, site_id))
}

#[cfg(test)]
mod tests {
    use super::{access_key, checksum_id, derive_access_id, ACCESS_ID_NAMESPACE};

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(
            derive_access_id("U1", Some("S1")),
            derive_access_id("U1", Some("S1"))
        );
        assert_eq!(derive_access_id("U1", None), derive_access_id("U1", None));
    }

    #[test]
    fn unscoped_id_differs_from_every_scoped_id() {
        let unscoped = derive_access_id("U1", None);
        for site in ["S1", "S2", "", "-"] {
            assert_ne!(unscoped, derive_access_id("U1", Some(site)));
        }
    }

    #[test]
    fn scoped_id_matches_checksum_of_concatenated_key() {
        assert_eq!(access_key("U1", Some("S1")), "U1S1");
        assert_eq!(access_key("U1", None), "-U1");
        assert_eq!(
            derive_access_id("U1", Some("S1")),
            checksum_id(ACCESS_ID_NAMESPACE, "U1S1")
        );
    }

    #[test]
    fn checksum_id_is_namespaced_hex() {
        let id = checksum_id("aces", "U1S1");
        let (prefix, digest) = id.split_once('_').expect("id should contain separator");
        assert_eq!(prefix, "aces");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(id, checksum_id("role", "U1S1"));
    }

    #[test]
    fn key_concatenation_can_collide() {
        assert_eq!(
            derive_access_id("U1", Some("S1")),
            derive_access_id("U1S", Some("1"))
        );
    }
}
