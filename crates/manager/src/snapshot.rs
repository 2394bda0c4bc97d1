//! Immutable merged view of validators across a dependency closure.

use depot_core::{Accumulator, SchemaValidator, TypeId};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of validating an instance against a snapshot.
#[derive(Debug, PartialEq, Eq)]
pub enum Validation {
    /// The instance satisfies the schema registered for the type.
    Valid,
    /// The instance violates the schema; one message per violation.
    Invalid(Vec<String>),
    /// No package in the closure exports the type.
    UnknownType,
}

/// Read-only mapping from type identifier to validator, built from one
/// resolution run's accumulator. Later packages overwrite earlier ones for
/// the same type identifier; never mutated after construction.
#[derive(Debug, Default)]
pub struct Snapshot {
    view: BTreeMap<TypeId, Arc<SchemaValidator>>,
}

impl Snapshot {
    /// Fold an accumulator into a merged validator view, last writer wins in
    /// accumulation order.
    #[must_use]
    pub fn from_accumulator(acc: &Accumulator) -> Self {
        let mut view = BTreeMap::new();
        for pkg in acc {
            for (type_id, validator) in pkg.validators() {
                view.insert(type_id.clone(), Arc::clone(validator));
            }
        }
        Self { view }
    }

    /// The merged view.
    #[must_use]
    pub fn view(&self) -> &BTreeMap<TypeId, Arc<SchemaValidator>> {
        &self.view
    }

    /// The validator registered for a type, if any package exported one.
    #[must_use]
    pub fn validator_for(&self, type_id: &TypeId) -> Option<&Arc<SchemaValidator>> {
        self.view.get(type_id)
    }

    /// All type identifiers known to this snapshot.
    pub fn types(&self) -> impl Iterator<Item = &TypeId> {
        self.view.keys()
    }

    /// Number of distinct types in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.view.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Validate an instance against the schema registered for `type_id`.
    #[must_use]
    pub fn validate(&self, type_id: &TypeId, instance: &Value) -> Validation {
        match self.view.get(type_id) {
            None => Validation::UnknownType,
            Some(validator) => {
                let errors = validator.errors(instance);
                if errors.is_empty() {
                    Validation::Valid
                } else {
                    Validation::Invalid(errors)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{PackageKind, PackageMeta, ParsedPackage, SchemaEntry};
    use serde_json::json;

    fn package_with_schema(name: &str, digest: &str, schema: Value) -> Arc<ParsedPackage> {
        let meta = PackageMeta {
            name: name.to_string(),
            kind: PackageKind::Module,
            version: "1.0.0".to_string(),
            depends_on: Vec::new(),
            schemas: vec![SchemaEntry {
                type_id: TypeId::new("acme.example.com/Widget", "v1"),
                schema,
            }],
        };
        ParsedPackage::from_meta(meta, digest).unwrap()
    }

    #[test]
    fn later_package_wins_for_same_type() {
        let first = package_with_schema("acme/a", "sha256:d1", json!({"type": "string"}));
        let second = package_with_schema("acme/c", "sha256:d2", json!({"type": "integer"}));

        let mut acc = Accumulator::new();
        acc.push(first);
        acc.push(second);
        let snapshot = Snapshot::from_accumulator(&acc);

        let widget = TypeId::new("acme.example.com/Widget", "v1");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.validate(&widget, &json!(42)), Validation::Valid);
        assert!(matches!(
            snapshot.validate(&widget, &json!("text")),
            Validation::Invalid(_)
        ));
    }

    #[test]
    fn unknown_type_is_reported_distinctly() {
        let snapshot = Snapshot::default();
        assert_eq!(
            snapshot.validate(&TypeId::new("acme.example.com/Widget", "v1"), &json!({})),
            Validation::UnknownType
        );
        assert!(snapshot.is_empty());
        assert!(snapshot.validator_for(&TypeId::new("x", "v1")).is_none());
    }

    #[test]
    fn view_lists_every_exported_type() {
        let pkg = package_with_schema("acme/a", "sha256:d1", json!({"type": "object"}));
        let mut acc = Accumulator::new();
        acc.push(pkg);
        let snapshot = Snapshot::from_accumulator(&acc);
        let types: Vec<_> = snapshot.types().map(ToString::to_string).collect();
        assert_eq!(types, vec!["acme.example.com/Widget@v1"]);
    }
}
