use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

pub fn version(major: u64, minor: u64, patch: u64) -> Version {
    Version::new(major, minor, patch)
}

/// Orders versions by their `(major, minor, patch)` triple, ignoring
/// prerelease and build metadata.
pub fn compare_versions(left: &Version, right: &Version) -> Ordering {
    (left.major, left.minor, left.patch).cmp(&(right.major, right.minor, right.patch))
}

fn triple(value: &Version) -> Version {
    version(value.major, value.minor, value.patch)
}

/// A non-empty interval `[lower, upper]` or `[lower, upper)` of versions.
///
/// Operations that could produce an empty interval return `None` instead;
/// there is no value of this type that means "anything".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    lower: Version,
    upper: Version,
    upper_inclusive: bool,
}

impl VersionRange {
    pub fn closed(lower: Version, upper: Version) -> Option<Self> {
        Self::from_bounds(triple(&lower), triple(&upper), true)
    }

    pub fn half_open(lower: Version, upper: Version) -> Option<Self> {
        Self::from_bounds(triple(&lower), triple(&upper), false)
    }

    pub fn exact(value: Version) -> Self {
        let value = triple(&value);
        Self {
            lower: value.clone(),
            upper: value,
            upper_inclusive: true,
        }
    }

    /// `None` when the major component is already at its maximum.
    pub fn up_to_next_major(value: Version) -> Option<Self> {
        let upper = version(value.major.checked_add(1)?, 0, 0);
        Self::from_bounds(triple(&value), upper, false)
    }

    /// `None` when the minor component is already at its maximum.
    pub fn up_to_next_minor(value: Version) -> Option<Self> {
        let upper = version(value.major, value.minor.checked_add(1)?, 0);
        Self::from_bounds(triple(&value), upper, false)
    }

    fn from_bounds(lower: Version, upper: Version, upper_inclusive: bool) -> Option<Self> {
        match compare_versions(&lower, &upper) {
            Ordering::Less => Some(Self {
                lower,
                upper,
                upper_inclusive,
            }),
            Ordering::Equal if upper_inclusive => Some(Self {
                lower,
                upper,
                upper_inclusive,
            }),
            _ => None,
        }
    }

    pub fn lower(&self) -> &Version {
        &self.lower
    }

    pub fn upper(&self) -> &Version {
        &self.upper
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    pub fn is_exact(&self) -> bool {
        self.upper_inclusive && compare_versions(&self.lower, &self.upper) == Ordering::Equal
    }

    pub fn contains(&self, value: &Version) -> bool {
        if compare_versions(value, &self.lower) == Ordering::Less {
            return false;
        }
        match compare_versions(value, &self.upper) {
            Ordering::Less => true,
            Ordering::Equal => self.upper_inclusive,
            Ordering::Greater => false,
        }
    }

    /// Tightest range contained in both `self` and `other`, or `None` when
    /// they do not overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let lower = match compare_versions(&self.lower, &other.lower) {
            Ordering::Less => other.lower.clone(),
            _ => self.lower.clone(),
        };
        let (upper, upper_inclusive) = match compare_versions(&self.upper, &other.upper) {
            Ordering::Less => (self.upper.clone(), self.upper_inclusive),
            Ordering::Greater => (other.upper.clone(), other.upper_inclusive),
            Ordering::Equal => (
                self.upper.clone(),
                self.upper_inclusive && other.upper_inclusive,
            ),
        };
        Self::from_bounds(lower, upper, upper_inclusive)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            write!(f, "{}", self.lower)
        } else if self.upper_inclusive {
            write!(f, "{}...{}", self.lower, self.upper)
        } else {
            write!(f, "{}..<{}", self.lower, self.upper)
        }
    }
}

impl FromStr for VersionRange {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> anyhow::Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("version range must not be empty"));
        }

        if let Some(rest) = trimmed.strip_prefix('^') {
            return Self::up_to_next_major(parse_version(rest)?)
                .ok_or_else(|| anyhow!("version range '{trimmed}' has no next major version"));
        }
        if let Some(rest) = trimmed.strip_prefix('~') {
            return Self::up_to_next_minor(parse_version(rest)?)
                .ok_or_else(|| anyhow!("version range '{trimmed}' has no next minor version"));
        }
        if let Some((lower, upper)) = trimmed.split_once("..<") {
            return Self::half_open(parse_version(lower)?, parse_version(upper)?)
                .ok_or_else(|| anyhow!("version range '{trimmed}' is empty"));
        }
        if let Some((lower, upper)) = trimmed.split_once("...") {
            return Self::closed(parse_version(lower)?, parse_version(upper)?)
                .ok_or_else(|| anyhow!("version range '{trimmed}' is empty"));
        }

        Ok(Self::exact(parse_version(trimmed)?))
    }
}

fn parse_version(input: &str) -> anyhow::Result<Version> {
    let trimmed = input.trim();
    Version::parse(trimmed).with_context(|| format!("invalid version '{trimmed}'"))
}

impl TryFrom<String> for VersionRange {
    type Error = anyhow::Error;

    fn try_from(value: String) -> anyhow::Result<Self> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}
