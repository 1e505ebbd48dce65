//! Release version parsing and ordering.
//!
//! Release tags come from GitHub and are not always strict semver:
//! `v1.2.3`, `1.2`, `V2`, `1.4.0-beta.1` all occur. Missing components are
//! zero. A release sorts after any pre-release with the same numbers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release label after `-`, e.g. `beta.1`.
    pub pre: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parses a tag such as `v1.2.3` or `1.4.0-beta.1`.
    pub fn parse(tag: &str) -> Result<Version, ValidationError> {
        let invalid = || ValidationError::invalid("versão", tag.to_string());

        let text = tag.trim();
        let text = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);

        // Build metadata (+...) never affects ordering
        let text = text.split_once('+').map_or(text, |(v, _)| v);

        let (numbers, pre) = match text.split_once('-') {
            Some((n, p)) if !p.is_empty() => (n, Some(p.to_string())),
            Some(_) => return Err(invalid()),
            None => (text, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Version {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            pre,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    pub fn is_newer_than(&self, other: &Version) -> bool {
        self > other
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_pre(a, b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dot-separated identifiers; numeric ones compare numerically and sort
/// before alphanumeric ones.
fn compare_pre(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(m), Ok(n)) => m.cmp(&n),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(v("v1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("1.2"), Version::new(1, 2, 0));
        assert_eq!(v("V2"), Version::new(2, 0, 0));
        assert_eq!(v("1.4.0-beta.1").pre.as_deref(), Some("beta.1"));
        assert_eq!(v("1.0.0+build.7"), Version::new(1, 0, 0));
    }

    #[test]
    fn test_parse_rejects() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("v").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("1.2-").is_err());
        assert!(Version::parse("abc").is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.10.0").is_newer_than(&v("1.9.9")));
        assert!(v("2.0").is_newer_than(&v("1.99.99")));
        assert!(v("1.4.0").is_newer_than(&v("1.4.0-beta.1")));
        assert!(v("1.4.0-beta.2").is_newer_than(&v("1.4.0-beta.1")));
        assert!(v("1.4.0-beta.10").is_newer_than(&v("1.4.0-beta.2")));
        assert!(v("1.4.0-rc").is_newer_than(&v("1.4.0-beta")));
        assert!(!v("v1.2.3").is_newer_than(&v("1.2.3")));
    }

    #[test]
    fn test_display() {
        assert_eq!(v("v1.2").to_string(), "1.2.0");
        assert_eq!(v("1.4.0-beta.1").to_string(), "1.4.0-beta.1");
    }
}
