//! Package metadata documents and parsed packages.

use crate::dependency::{Dependency, PackageKind};
use crate::schema::{SchemaValidator, TypeId};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Media type of the package metadata layer inside a depot image.
pub const PACKAGE_MEDIA_TYPE: &str = "application/vnd.depot.package.v1+json";

/// A dependency declaration as written in a package document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    /// Package reference of the dependency.
    pub package: String,
    /// Version constraint, e.g. `^2.0`.
    pub constraints: String,
}

/// One schema exported by a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// The type the schema validates.
    #[serde(rename = "type")]
    pub type_id: TypeId,
    /// The JSON Schema document.
    pub schema: Value,
}

/// The package metadata document embedded in a package image. This is the
/// wire format; it is also what the local cache persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMeta {
    /// Canonical package reference, matching how dependents declare it.
    pub name: String,
    /// Package kind.
    pub kind: PackageKind,
    /// Concrete version of this package.
    pub version: String,
    /// Dependencies this package declares.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DeclaredDependency>,
    /// Schemas this package exports, one per type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<SchemaEntry>,
}

/// Parsed metadata for one concrete package version.
///
/// Immutable after construction. When a digest mismatch forces a re-fetch the
/// package is superseded by a new instance, never mutated.
#[derive(Debug, Clone)]
pub struct ParsedPackage {
    kind: PackageKind,
    version: String,
    digest: String,
    dependencies: Vec<Dependency>,
    validators: BTreeMap<TypeId, Arc<SchemaValidator>>,
    meta: PackageMeta,
}

impl ParsedPackage {
    /// Build a package from its metadata document and the content digest of
    /// the image it was parsed from. Compiles every exported schema; an
    /// uncompilable schema fails the whole package.
    pub fn from_meta(meta: PackageMeta, digest: impl Into<String>) -> Result<Arc<Self>> {
        let mut validators = BTreeMap::new();
        for entry in &meta.schemas {
            let validator = SchemaValidator::compile(&meta.name, entry.schema.clone())?;
            validators.insert(entry.type_id.clone(), Arc::new(validator));
        }
        let dependencies = meta
            .depends_on
            .iter()
            .map(|d| Dependency::new(&d.package, &d.constraints))
            .collect();
        Ok(Arc::new(Self {
            kind: meta.kind,
            version: meta.version.clone(),
            digest: digest.into(),
            dependencies,
            validators,
            meta,
        }))
    }

    /// Canonical package reference.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.meta.name
    }

    /// Package kind.
    #[must_use]
    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Concrete version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Content digest of the image this package was parsed from. Digest
    /// equality is the sole identity used for freshness decisions.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Declared dependencies, unfinalized.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Exported validators keyed by type identifier.
    #[must_use]
    pub fn validators(&self) -> &BTreeMap<TypeId, Arc<SchemaValidator>> {
        &self.validators
    }

    /// The metadata document this package was built from.
    #[must_use]
    pub fn meta(&self) -> &PackageMeta {
        &self.meta
    }

    /// The finalized identity this package answers to.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}@{}", self.meta.name, self.version)
    }
}

/// Append-only ordered sequence of packages gathered during one resolution
/// run. Duplicates are permitted when a package is reachable through several
/// dependency paths; encounter order is preserved.
#[derive(Debug, Default)]
pub struct Accumulator {
    packages: Vec<Arc<ParsedPackage>>,
}

impl Accumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a package in encounter order.
    pub fn push(&mut self, package: Arc<ParsedPackage>) {
        self.packages.push(package);
    }

    /// Number of packages gathered, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing has been gathered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate the packages in encounter order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<ParsedPackage>> {
        self.packages.iter()
    }

    /// The packages in encounter order.
    #[must_use]
    pub fn packages(&self) -> &[Arc<ParsedPackage>] {
        &self.packages
    }
}

impl<'a> IntoIterator for &'a Accumulator {
    type Item = &'a Arc<ParsedPackage>;
    type IntoIter = std::slice::Iter<'a, Arc<ParsedPackage>>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

impl IntoIterator for Accumulator {
    type Item = Arc<ParsedPackage>;
    type IntoIter = std::vec::IntoIter<Arc<ParsedPackage>>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.into_iter()
    }
}
