//! Hashing utilities for identity fingerprints.

use sha2::{Digest, Sha256};

/// Incremental hasher for building fingerprints from named components.
///
/// Every component is NUL-terminated so that `("ab", "c")` and `("a", "bc")`
/// hash differently.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    /// Add a `key=value` component.
    pub fn update_pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.hasher.update(key.as_bytes());
        self.hasher.update(b"=");
        self.update_str(value)
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalize and return a short fingerprint (first 16 chars).
    pub fn finish_short(self) -> String {
        self.finish()[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sha256() {
        let mut fp = Fingerprint::new();
        fp.update_str("hello");
        assert_eq!(fp.finish().len(), 64);
    }

    #[test]
    fn test_fingerprint_separates_components() {
        let joined = {
            let mut fp = Fingerprint::new();
            fp.update_str("ab").update_str("c");
            fp.finish()
        };
        let split = {
            let mut fp = Fingerprint::new();
            fp.update_str("a").update_str("bc");
            fp.finish()
        };

        assert_ne!(joined, split);
    }

    #[test]
    fn test_fingerprint_pairs() {
        let a = {
            let mut fp = Fingerprint::new();
            fp.update_pair("shared", "false");
            fp.finish_short()
        };
        let b = {
            let mut fp = Fingerprint::new();
            fp.update_pair("shared", "true");
            fp.finish_short()
        };

        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
