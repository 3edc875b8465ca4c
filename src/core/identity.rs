//! Package identity computation.
//!
//! The package identity is the subset of resolved options that changes the
//! produced binaries. It is the binary-compatibility cache key: two
//! evaluations with equal identities produce interchangeable packages.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::core::options::ResolvedOptions;
use crate::util::hash::Fingerprint;

/// Resolved options minus the non-ABI exclusion set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIdentity {
    options: ResolvedOptions,
    id: String,
}

impl PackageIdentity {
    /// The options that participate in the identity.
    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Short fingerprint over the participating options.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Reduce `options` to a package identity.
///
/// `options` is borrowed and left untouched; callers keep the full set for
/// the build invocation.
pub fn identity(options: &ResolvedOptions, excluded: &BTreeSet<String>) -> PackageIdentity {
    let kept: ResolvedOptions = options
        .iter()
        .filter(|(name, _)| !excluded.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    // ResolvedOptions iterates in name order, so the hash is order independent
    let mut fp = Fingerprint::new();
    for (name, value) in kept.iter() {
        fp.update_pair(name, &value.to_string());
    }

    PackageIdentity {
        options: kept,
        id: fp.finish_short(),
    }
}
