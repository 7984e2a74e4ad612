//! Per-platform package installation.
//!
//! A [`PackageTable`] maps platform categories to the packages a test host of
//! that family needs. [`install_packages`] walks every host against every
//! table entry whose pattern matches the host's platform string.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use tracing::{debug, info};

use crate::error::RsprovisionError;
use crate::host::Host;
use crate::platform::{PlatformCategory, PlatformMatcher};

/// Flag that lets apt install from unsigned, locally built repositories.
pub const ALLOW_UNAUTHENTICATED: &str = "--allow-unauthenticated";

/// A package to install, optionally probed under a different name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSpec {
    /// Probe and package share one name.
    Name(String),
    /// The installed binary differs from the package providing it.
    Probed { probe: String, package: String },
}

impl PackageSpec {
    /// Name passed to the host's package probe.
    pub fn probe(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Probed { probe, .. } => probe,
        }
    }

    /// Name passed to the host's package installer.
    pub fn package(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Probed { package, .. } => package,
        }
    }
}

impl From<&str> for PackageSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<(&str, &str)> for PackageSpec {
    fn from((probe, package): (&str, &str)) -> Self {
        Self::Probed {
            probe: probe.to_string(),
            package: package.to_string(),
        }
    }
}

/// Accepts either `name` or `[probe, package]`.
impl<'de> Deserialize<'de> for PackageSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PackageSpecVisitor;

        impl<'de> Visitor<'de> for PackageSpecVisitor {
            type Value = PackageSpec;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a package name or a [probe, package] pair")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PackageSpec::Name(v.to_string()))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let probe: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let package: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }
                Ok(PackageSpec::Probed { probe, package })
            }
        }

        deserializer.deserialize_any(PackageSpecVisitor)
    }
}

/// Ordered mapping from platform category to package list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageTable {
    entries: Vec<(PlatformCategory, Vec<PackageSpec>)>,
}

impl PackageTable {
    /// Builds a table from string-keyed entries, keeping their order.
    ///
    /// Every key is checked before the table is returned, so an unknown key
    /// fails before any host is touched.
    pub fn from_entries<I, K>(entries: I) -> Result<Self, RsprovisionError>
    where
        I: IntoIterator<Item = (K, Vec<PackageSpec>)>,
        K: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, packages)| Ok((PlatformCategory::from_key(key.as_ref())?, packages)))
            .collect::<Result<Vec<_>, RsprovisionError>>()?;
        Ok(Self { entries })
    }

    /// Appends an entry for an already-typed category.
    pub fn push(&mut self, category: PlatformCategory, packages: Vec<PackageSpec>) {
        self.entries.push((category, packages));
    }

    pub fn entries(&self) -> &[(PlatformCategory, Vec<PackageSpec>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deserializes from a YAML mapping, preserving key order.
impl<'de> Deserialize<'de> for PackageTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PackageTableVisitor;

        impl<'de> Visitor<'de> for PackageTableVisitor {
            type Value = PackageTable;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map from platform category to package list")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PackageTable::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, packages)) = map.next_entry::<String, Vec<PackageSpec>>()? {
                    entries.push((key, packages));
                }
                PackageTable::from_entries(entries).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(PackageTableVisitor)
    }
}

/// Options for [`install_packages`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Probe each package first and skip it when already present.
    pub check_if_exists: bool,
}

/// Installs every matching table entry's packages on every host.
///
/// Hosts and entries are processed in order; the first failure aborts the
/// remaining work. Entries under the `debian` category get
/// [`ALLOW_UNAUTHENTICATED`] since acceptance repositories are unsigned.
pub fn install_packages(
    hosts: &[&dyn Host],
    table: &PackageTable,
    options: &InstallOptions,
    matcher: &PlatformMatcher,
) -> Result<bool> {
    for host in hosts {
        for (category, packages) in table.entries() {
            if !matcher.matches(*category, host.platform())? {
                debug!(host = host.name(), %category, "platform does not match, skipping");
                continue;
            }

            let extra_flags = match category {
                PlatformCategory::Debian => vec![ALLOW_UNAUTHENTICATED.to_string()],
                _ => Vec::new(),
            };

            for spec in packages {
                if options.check_if_exists
                    && host.check_for_package(spec.probe()).with_context(|| {
                        format!("failed to probe {} on {}", spec.probe(), host.name())
                    })?
                {
                    debug!(host = host.name(), probe = spec.probe(), "already present");
                    continue;
                }

                info!(host = host.name(), "Installing {}", spec.package());
                host.install_package(spec.package(), &extra_flags)?;
            }
        }
    }
    Ok(true)
}
