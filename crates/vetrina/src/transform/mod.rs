//! Content enrichment transforms.
//!
//! A transform is a pure, idempotent mapping over one page's default
//! content, targeted at (vertical tag, component key) — it never touches
//! presets or pages outside its declared target set. Output is re-validated
//! against the page's content schema before it is accepted; a violation
//! aborts with nothing written.
//!
//! Two transform classes exist:
//! - [`ContentInjection`]: replace placeholder content wholesale with an
//!   authored, fully structured document.
//! - [`FieldRename`]: schema migration over `default_content` that renames
//!   a malformed top-level field (legacy `images` → canonical
//!   `gallery_images`). Expressed as a structured JSON operation, never a
//!   string edit, so unrelated content containing a matching substring can
//!   never be corrupted.

pub mod batch;

pub use batch::{BatchReport, TransformBatch};

use crate::error::{Error, Result};
use crate::preset::Preset;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Target ─────────────────────────────────────────────────────────

/// Declares which pages a transform applies to: every page with this
/// component key, in every preset carrying this vertical tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransformTarget {
    pub vertical: String,
    pub component_key: String,
}

impl TransformTarget {
    pub fn new(vertical: impl Into<String>, component_key: impl Into<String>) -> Self {
        Self {
            vertical: vertical.into(),
            component_key: component_key.into(),
        }
    }
}

// ── Transform trait ────────────────────────────────────────────────

/// A pure content mapping with a declared target.
///
/// Contract: `apply` must be idempotent — `apply(apply(x)) == apply(x)`.
/// The batch runner checks this in debug builds.
pub trait Transform {
    /// Name used in batch reports and logs.
    fn name(&self) -> &str;

    /// The (vertical, component key) pair this transform applies to.
    fn target(&self) -> &TransformTarget;

    /// Map one page's content. Must not observe or mutate anything else.
    fn apply(&self, content: &Value) -> Result<Value>;
}

/// Apply a transform to a preset, returning the rewritten preset and the
/// number of pages changed, or `None` if the preset is outside the
/// transform's target set (or no page content actually changed).
///
/// Every rewritten page is validated against its content schema; a
/// violation aborts without producing a preset.
pub fn apply_to_preset(transform: &dyn Transform, preset: &Preset) -> Result<Option<(Preset, usize)>> {
    let target = transform.target();
    if preset.vertical != target.vertical {
        return Ok(None);
    }

    let mut rewritten = preset.clone();
    let mut pages_changed = 0;
    for page in &mut rewritten.pages {
        if page.component_key != target.component_key {
            continue;
        }
        let next = transform.apply(&page.default_content)?;
        page.content_schema.validate(&next).map_err(|e| {
            Error::SchemaViolation(format!(
                "transform '{}' on page '{}' of preset '{}': {e}",
                transform.name(),
                page.slug,
                preset.id
            ))
        })?;
        if next != page.default_content {
            page.default_content = next;
            pages_changed += 1;
        }
    }

    if pages_changed == 0 {
        Ok(None)
    } else {
        Ok(Some((rewritten, pages_changed)))
    }
}

// ── ContentInjection ───────────────────────────────────────────────

/// Replaces a page's content wholesale with an authored document.
///
/// Trivially idempotent: the output never depends on the input.
#[derive(Debug, Clone)]
pub struct ContentInjection {
    name: String,
    target: TransformTarget,
    content: Value,
}

impl ContentInjection {
    pub fn new(name: impl Into<String>, target: TransformTarget, content: Value) -> Self {
        Self {
            name: name.into(),
            target,
            content,
        }
    }
}

impl Transform for ContentInjection {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &TransformTarget {
        &self.target
    }

    fn apply(&self, _content: &Value) -> Result<Value> {
        Ok(self.content.clone())
    }
}

// ── FieldRename ────────────────────────────────────────────────────

/// Renames a top-level content field: a schema migration for field names
/// left malformed by earlier authoring passes.
///
/// Idempotent by construction: once the source field is gone, the
/// transform is a no-op. Content carrying *both* fields is ambiguous and
/// fails rather than guessing.
#[derive(Debug, Clone)]
pub struct FieldRename {
    name: String,
    target: TransformTarget,
    from: String,
    to: String,
}

impl FieldRename {
    pub fn new(
        name: impl Into<String>,
        target: TransformTarget,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Transform for FieldRename {
    fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &TransformTarget {
        &self.target
    }

    fn apply(&self, content: &Value) -> Result<Value> {
        let Some(obj) = content.as_object() else {
            return Err(Error::SchemaViolation(format!(
                "field rename '{}' expects object content, got {content}",
                self.name
            )));
        };
        if !obj.contains_key(&self.from) {
            // Already migrated (or never had the field).
            return Ok(content.clone());
        }
        if obj.contains_key(&self.to) {
            return Err(Error::SchemaViolation(format!(
                "field rename '{}': content has both '{}' and '{}'",
                self.name, self.from, self.to
            )));
        }
        let mut obj = obj.clone();
        let value = obj.remove(&self.from).unwrap_or(Value::Null);
        obj.insert(self.to.clone(), value);
        Ok(Value::Object(obj))
    }
}

// ── TransformSpec ──────────────────────────────────────────────────

/// Serializable transform declaration, used by the batch runner's input
/// file: an ordered list of these describes an enrichment batch.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// See [`ContentInjection`].
    ContentInjection {
        name: String,
        vertical: String,
        component_key: String,
        content: Value,
    },
    /// See [`FieldRename`].
    FieldRename {
        name: String,
        vertical: String,
        component_key: String,
        from: String,
        to: String,
    },
}

impl TransformSpec {
    /// Build the runnable transform this declaration describes.
    pub fn into_transform(self) -> Box<dyn Transform> {
        match self {
            Self::ContentInjection {
                name,
                vertical,
                component_key,
                content,
            } => Box::new(ContentInjection::new(
                name,
                TransformTarget::new(vertical, component_key),
                content,
            )),
            Self::FieldRename {
                name,
                vertical,
                component_key,
                from,
                to,
            } => Box::new(FieldRename::new(
                name,
                TransformTarget::new(vertical, component_key),
                from,
                to,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{PageDefinition, Preset};
    use crate::schema::ContentSchema;
    use serde_json::json;

    fn gallery_schema() -> ContentSchema {
        ContentSchema::new(
            1,
            json!({
                "type": "object",
                "properties": { "gallery_images": { "type": "array" } },
                "required": ["gallery_images"]
            }),
        )
        .unwrap()
    }

    fn menu_preset() -> Preset {
        Preset::new(
            "restaurant-v1",
            "Ristorante",
            "restaurant",
            vec![PageDefinition {
                slug: "menu".into(),
                component_key: "MenuGuide".into(),
                content_schema: ContentSchema::new(
                    1,
                    json!({
                        "type": "object",
                        "properties": { "recipes": { "type": "array" } },
                        "required": ["recipes"]
                    }),
                )
                .unwrap(),
                default_content: json!({"recipes": []}),
            }],
        )
        .unwrap()
    }

    fn inject_recipes() -> ContentInjection {
        ContentInjection::new(
            "inject-recipes",
            TransformTarget::new("restaurant", "MenuGuide"),
            json!({"recipes": [
                {"name": "Zuppa del giorno"},
                {"name": "Tagliatelle al ragù"}
            ]}),
        )
    }

    #[test]
    fn injection_replaces_placeholder_content() {
        let preset = menu_preset();
        let (rewritten, pages) = apply_to_preset(&inject_recipes(), &preset)
            .unwrap()
            .unwrap();
        assert_eq!(pages, 1);
        let recipes = rewritten.pages[0].default_content["recipes"]
            .as_array()
            .unwrap();
        assert_eq!(recipes.len(), 2);
        // Still validates against the page schema.
        rewritten.validate().unwrap();
    }

    #[test]
    fn injection_is_idempotent() {
        let transform = inject_recipes();
        let preset = menu_preset();
        let (once, _) = apply_to_preset(&transform, &preset).unwrap().unwrap();
        // Second application changes nothing.
        assert!(apply_to_preset(&transform, &once).unwrap().is_none());
    }

    #[test]
    fn transforms_never_touch_other_verticals_or_components() {
        let transform = inject_recipes();

        let company = Preset::new("company-v1", "Azienda", "company", vec![]).unwrap();
        assert!(apply_to_preset(&transform, &company).unwrap().is_none());

        let mut other_component = menu_preset();
        other_component.pages[0].component_key = "Gallery".into();
        other_component.pages[0].content_schema = gallery_schema();
        other_component.pages[0].default_content = json!({"gallery_images": []});
        assert!(
            apply_to_preset(&transform, &other_component)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn injection_violating_schema_aborts() {
        let bad = ContentInjection::new(
            "inject-wrong-shape",
            TransformTarget::new("restaurant", "MenuGuide"),
            json!({"images": []}),
        );
        let err = apply_to_preset(&bad, &menu_preset()).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(_)));
        assert!(err.to_string().contains("inject-wrong-shape"));
    }

    #[test]
    fn field_rename_migrates_legacy_field() {
        let rename = FieldRename::new(
            "gallery-field-fix",
            TransformTarget::new("restaurant", "Gallery"),
            "images",
            "gallery_images",
        );
        let migrated = rename
            .apply(&json!({"images": [{"src": "a.jpg", "caption": null}]}))
            .unwrap();
        assert_eq!(
            migrated,
            json!({"gallery_images": [{"src": "a.jpg", "caption": null}]})
        );
    }

    #[test]
    fn field_rename_is_idempotent() {
        let rename = FieldRename::new(
            "gallery-field-fix",
            TransformTarget::new("restaurant", "Gallery"),
            "images",
            "gallery_images",
        );
        let once = rename.apply(&json!({"images": []})).unwrap();
        let twice = rename.apply(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn field_rename_rejects_ambiguous_content() {
        let rename = FieldRename::new(
            "gallery-field-fix",
            TransformTarget::new("restaurant", "Gallery"),
            "images",
            "gallery_images",
        );
        let err = rename
            .apply(&json!({"images": [], "gallery_images": []}))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(_)));
    }

    #[test]
    fn field_rename_rejects_non_object_content() {
        let rename = FieldRename::new(
            "fix",
            TransformTarget::new("restaurant", "Gallery"),
            "a",
            "b",
        );
        assert!(rename.apply(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn spec_deserializes_and_builds_transforms() {
        let specs: Vec<TransformSpec> = serde_json::from_value(json!([
            {
                "kind": "field_rename",
                "name": "gallery-field-fix",
                "vertical": "restaurant",
                "component_key": "Gallery",
                "from": "images",
                "to": "gallery_images"
            },
            {
                "kind": "content_injection",
                "name": "inject-recipes",
                "vertical": "restaurant",
                "component_key": "MenuGuide",
                "content": {"recipes": [{"name": "Zuppa"}]}
            }
        ]))
        .unwrap();

        let transforms: Vec<Box<dyn Transform>> =
            specs.into_iter().map(TransformSpec::into_transform).collect();
        assert_eq!(transforms[0].name(), "gallery-field-fix");
        assert_eq!(transforms[1].target().component_key, "MenuGuide");
    }
}
