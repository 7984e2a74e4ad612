//! Platform classification.
//!
//! Test hosts report a free-form platform string such as `centos-7-x86_64`
//! or `ubuntu-1604-amd64`. [`PlatformMatcher`] maps those strings to a
//! [`PlatformCategory`] through an ordered rule table; the first rule whose
//! pattern matches wins.

use std::str::FromStr;

use regex::Regex;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::RsprovisionError;

/// Coarse OS family derived from a platform string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PlatformCategory {
    /// Fedora, EL and CentOS.
    #[strum(serialize = "redhat")]
    RedHat,
    /// Debian and Ubuntu.
    Debian,
    /// Debian releases that still ship ruby 1.8.
    #[strum(serialize = "debian_ruby18")]
    DebianRuby18,
    Solaris,
    Windows,
}

impl PlatformCategory {
    /// Parses a category key, as used in package tables.
    pub fn from_key(key: &str) -> Result<Self, RsprovisionError> {
        Self::from_str(key).map_err(|_| RsprovisionError::UnknownCategory {
            key: key.to_string(),
        })
    }

    /// Pattern used by the default rule table.
    fn default_pattern(self) -> &'static str {
        match self {
            Self::RedHat => "fedora|el|centos",
            Self::Debian => "debian|ubuntu",
            Self::DebianRuby18 => "debian|ubuntu-lucid|ubuntu-precise",
            Self::Solaris => "solaris",
            Self::Windows => "windows",
        }
    }
}

/// A single (category, pattern) classification rule.
#[derive(Debug, Clone)]
pub struct PlatformRule {
    pub category: PlatformCategory,
    pub pattern: Regex,
}

impl PlatformRule {
    /// Compiles a rule from a regular expression.
    pub fn new(category: PlatformCategory, pattern: &str) -> Result<Self, RsprovisionError> {
        let pattern = Regex::new(pattern).map_err(|e| {
            RsprovisionError::Validation(format!("invalid pattern for {}: {}", category, e))
        })?;
        Ok(Self { category, pattern })
    }

    /// Returns true when the pattern matches anywhere in `platform`.
    pub fn is_match(&self, platform: &str) -> bool {
        self.pattern.is_match(platform)
    }
}

/// Ordered, first-match-wins platform classifier.
#[derive(Debug, Clone)]
pub struct PlatformMatcher {
    rules: Vec<PlatformRule>,
}

impl PlatformMatcher {
    /// Creates a matcher from an explicit rule list, evaluated in order.
    pub fn new(rules: Vec<PlatformRule>) -> Self {
        Self { rules }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[PlatformRule] {
        &self.rules
    }

    /// Classifies a platform string, returning the first matching category.
    pub fn classify(&self, platform: &str) -> Result<PlatformCategory, RsprovisionError> {
        self.rules
            .iter()
            .find(|rule| rule.is_match(platform))
            .map(|rule| rule.category)
            .ok_or_else(|| RsprovisionError::UnknownPlatform {
                platform: platform.to_string(),
            })
    }

    /// Tests a single category's rule against `platform`.
    ///
    /// Unlike [`classify`](Self::classify), this does not stop at the first
    /// match: a Debian host matches both `debian` and `debian_ruby18`.
    pub fn matches(
        &self,
        category: PlatformCategory,
        platform: &str,
    ) -> Result<bool, RsprovisionError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.category == category)
            .ok_or_else(|| RsprovisionError::UnknownCategory {
                key: category.to_string(),
            })?;
        Ok(rule.is_match(platform))
    }
}

impl Default for PlatformMatcher {
    fn default() -> Self {
        let rules = PlatformCategory::iter()
            .map(|category| PlatformRule {
                category,
                pattern: Regex::new(category.default_pattern())
                    .expect("default platform patterns are valid"),
            })
            .collect();
        Self { rules }
    }
}

const UBUNTU_CODENAMES: &[(&str, &str)] = &[
    ("1004", "lucid"),
    ("1204", "precise"),
    ("1404", "trusty"),
    ("1510", "wily"),
    ("1604", "xenial"),
    ("1804", "bionic"),
    ("2004", "focal"),
    ("2204", "jammy"),
    ("2404", "noble"),
];

const DEBIAN_CODENAMES: &[(&str, &str)] = &[
    ("6", "squeeze"),
    ("7", "wheezy"),
    ("8", "jessie"),
    ("9", "stretch"),
    ("10", "buster"),
    ("11", "bullseye"),
    ("12", "bookworm"),
    ("13", "trixie"),
];

/// Rewrites `ubuntu-<ver>-<arch>` / `debian-<ver>-<arch>` to use the release codename.
///
/// Platforms that are not Debian-like, or whose version is not in the table,
/// are returned unchanged.
pub fn with_version_codename(platform: &str) -> String {
    let mut parts = platform.splitn(3, '-');
    let (Some(name), Some(version), Some(arch)) = (parts.next(), parts.next(), parts.next()) else {
        return platform.to_string();
    };
    let table = match name {
        "ubuntu" => UBUNTU_CODENAMES,
        "debian" => DEBIAN_CODENAMES,
        _ => return platform.to_string(),
    };
    match table.iter().find(|(v, _)| *v == version) {
        Some((_, codename)) => format!("{}-{}-{}", name, codename, arch),
        None => platform.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_keys_round_trip() {
        for category in PlatformCategory::iter() {
            let key = category.to_string();
            assert_eq!(PlatformCategory::from_key(&key).unwrap(), category);
        }
        assert_eq!(PlatformCategory::RedHat.to_string(), "redhat");
        assert_eq!(PlatformCategory::DebianRuby18.to_string(), "debian_ruby18");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = PlatformCategory::from_key("gentoo").unwrap_err();
        assert!(matches!(err, RsprovisionError::UnknownCategory { ref key } if key == "gentoo"));
    }

    #[test]
    fn default_rule_order() {
        let matcher = PlatformMatcher::default();
        let order: Vec<_> = matcher.rules().iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                PlatformCategory::RedHat,
                PlatformCategory::Debian,
                PlatformCategory::DebianRuby18,
                PlatformCategory::Solaris,
                PlatformCategory::Windows,
            ]
        );
    }

    #[test]
    fn codename_rewrites_known_versions() {
        assert_eq!(with_version_codename("ubuntu-1404-amd64"), "ubuntu-trusty-amd64");
        assert_eq!(with_version_codename("debian-7-i386"), "debian-wheezy-i386");
    }

    #[test]
    fn codename_leaves_other_platforms_alone() {
        assert_eq!(with_version_codename("centos-7-x86_64"), "centos-7-x86_64");
        assert_eq!(with_version_codename("ubuntu-9999-amd64"), "ubuntu-9999-amd64");
        assert_eq!(with_version_codename("ubuntu-trusty-amd64"), "ubuntu-trusty-amd64");
        assert_eq!(with_version_codename("solaris"), "solaris");
    }
}
