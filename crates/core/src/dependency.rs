//! Dependency identities: a package reference plus version constraint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Not yet known; populated once the package has been resolved.
    #[default]
    Unknown,
    /// A leaf package exporting type schemas.
    Module,
    /// An aggregate package declaring dependencies on other packages.
    Bundle,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Module => write!(f, "module"),
            Self::Bundle => write!(f, "bundle"),
        }
    }
}

/// A (package, version constraint) pair, the unit of resolution.
///
/// `constraints` starts out as a semver range (for example `^1.0`) and is
/// overwritten in place with the concrete version chosen by the resolver.
/// After that the identity is "finalized"; only finalized identities are used
/// as cache keys or fetch targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package reference, e.g. `registry.example.com/acme/database`.
    pub package: String,
    /// Version constraint before finalization, concrete version after.
    pub constraints: String,
    /// Package kind; [`PackageKind::Unknown`] until resolution reports it.
    #[serde(default)]
    pub kind: PackageKind,
}

impl Dependency {
    /// Create an unfinalized dependency.
    pub fn new(package: impl Into<String>, constraints: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            constraints: constraints.into(),
            kind: PackageKind::Unknown,
        }
    }

    /// Parse a `package[@constraint]` spec. A bare reference gets the
    /// wildcard constraint.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec.rsplit_once('@') {
            Some((package, constraints)) if !constraints.is_empty() => {
                Self::new(package, constraints)
            }
            _ => Self::new(spec, "*"),
        }
    }

    /// Replace the constraint with the concrete resolver-assigned version.
    pub fn finalize(&mut self, version: impl Into<String>) {
        self.constraints = version.into();
    }

    /// The finalized identity, used for cache addressing and cycle detection.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}@{}", self.package, self.constraints)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package, self.constraints)
    }
}
