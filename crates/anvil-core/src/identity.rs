use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key naming a package's source location.
///
/// Two identities are equal when their trimmed strings are equal; URL
/// normalization (scheme or host case folding) is not performed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PackageIdentity(String);

impl PackageIdentity {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component of the location without a trailing `.git`.
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        let last = trimmed
            .rsplit(['/', ':'])
            .next()
            .filter(|component| !component.is_empty())
            .unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PackageIdentity {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PackageIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PackageIdentity> for String {
    fn from(value: PackageIdentity) -> Self {
        value.0
    }
}
