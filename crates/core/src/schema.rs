//! Type identifiers and compiled schema validators.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifies a type exported by a package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId {
    /// Fully qualified type name, e.g. `acme.example.com/Database`.
    pub name: String,
    /// Schema version of the type, e.g. `v1`.
    pub version: String,
}

impl TypeId {
    /// Create a type identifier.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A compiled JSON Schema validator together with the document it was
/// compiled from. The raw document is retained so caches can persist the
/// package and recompile on load.
pub struct SchemaValidator {
    schema: Value,
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a validator from a raw schema document. `package` names the
    /// owning package for error context.
    pub fn compile(package: &str, schema: Value) -> Result<Self> {
        let compiled = jsonschema::validator_for(&schema)
            .map_err(|e| Error::malformed(package, format!("invalid schema: {e}")))?;
        Ok(Self { schema, compiled })
    }

    /// The raw schema document.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Whether the instance satisfies the schema.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }

    /// Every schema violation in the instance, rendered as messages.
    #[must_use]
    pub fn errors(&self, instance: &Value) -> Vec<String> {
        self.compiled
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect()
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_id_display() {
        let t = TypeId::new("acme.example.com/Database", "v1");
        assert_eq!(t.to_string(), "acme.example.com/Database@v1");
    }

    #[test]
    fn type_ids_order_by_name_then_version() {
        let a1 = TypeId::new("a", "v1");
        let a2 = TypeId::new("a", "v2");
        let b1 = TypeId::new("b", "v1");
        assert!(a1 < a2);
        assert!(a2 < b1);
    }

    #[test]
    fn compile_and_validate() {
        let v = SchemaValidator::compile(
            "acme/db",
            json!({"type": "object", "required": ["engine"]}),
        )
        .unwrap();
        assert!(v.is_valid(&json!({"engine": "postgres"})));
        assert!(!v.is_valid(&json!({})));
        assert!(!v.errors(&json!({})).is_empty());
    }

    #[test]
    fn compile_rejects_invalid_schema() {
        let err = SchemaValidator::compile("acme/db", json!({"type": "no-such-type"}))
            .expect_err("schema should not compile");
        assert!(matches!(err, Error::MalformedPackage { .. }));
    }
}
