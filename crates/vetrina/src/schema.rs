//! Versioned content schemas and JSON validation.
//!
//! Every page definition carries a [`ContentSchema`]: a JSON Schema document
//! plus a schema version. Content JSON — preset defaults, tenant overrides,
//! transform output — is validated against it before it is ever persisted.
//! This is the guard against the historical defect class of silently drifted
//! field names (a gallery authored as `images` against a schema that says
//! `gallery_images` fails loudly here instead of rendering an empty page).

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A versioned JSON Schema for one page's content.
///
/// The version is bumped whenever the structural shape changes, so that
/// field-migration transforms can state which generation they produce.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContentSchema {
    /// Schema generation. Starts at 1.
    pub version: u32,
    /// The JSON Schema document content must satisfy.
    pub schema: Value,
}

impl ContentSchema {
    /// Create a schema. Fails if the schema document is empty — every page
    /// definition must declare a real content shape.
    pub fn new(version: u32, schema: Value) -> Result<Self> {
        let schema = Self { version, schema };
        schema.ensure_non_empty()?;
        Ok(schema)
    }

    /// Check that the schema document is non-empty. An empty JSON Schema
    /// accepts every document, which would disable validation entirely.
    /// `Preset::validate` re-runs this on every store write because
    /// deserialization builds the struct without going through [`new`](Self::new).
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.schema.is_null() || self.schema.as_object().is_some_and(|o| o.is_empty()) {
            return Err(Error::SchemaViolation(
                "content schema must be non-empty".into(),
            ));
        }
        Ok(())
    }

    /// Validate a content document against this schema.
    ///
    /// Reports every violation with its instance path. A schema that itself
    /// fails to compile is also a `SchemaViolation` — validation is never
    /// silently skipped.
    pub fn validate(&self, content: &Value) -> Result<()> {
        let validator = jsonschema::validator_for(&self.schema)
            .map_err(|e| Error::SchemaViolation(format!("schema failed to compile: {e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(content)
            .map(|e| format!("  - {}: {e}", e.instance_path()))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::SchemaViolation(format!(
                "{} violation(s):\n{}",
                errors.len(),
                errors.join("\n")
            )))
        }
    }
}

/// Derive a [`ContentSchema`] from a Rust content type.
///
/// This is the bridge between strong Rust types and the stored JSON Schema:
/// built-in page content (galleries, menus, contact blocks) is defined once
/// as a struct, so the schema and the deserialization logic can never
/// diverge.
///
/// # Example
///
/// ```
/// use vetrina::schema::content_schema_for;
/// use schemars::JsonSchema;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, JsonSchema)]
/// struct Menu {
///     recipes: Vec<String>,
/// }
///
/// let schema = content_schema_for::<Menu>(1);
/// assert_eq!(schema.version, 1);
/// ```
pub fn content_schema_for<T: JsonSchema>(version: u32) -> ContentSchema {
    let schema = schemars::schema_for!(T);
    // Fail closed: a schema that cannot serialize must reject everything,
    // never become an accept-all document.
    let schema = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"not": {}}));
    ContentSchema { version, schema }
}
