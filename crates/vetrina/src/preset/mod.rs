//! Preset model: a reusable site template for one business vertical.
//!
//! A [`Preset`] is an ordered list of [`PageDefinition`]s — page order is
//! navigation order. Presets are whole documents: the store replaces them
//! atomically as a unit, versioned to detect concurrent writers. They are
//! mutated only by enrichment transforms or manual authoring.

pub mod starter;
pub mod store;

pub use store::{FsPresetStore, MemPresetStore, PresetStore};

use crate::error::{Error, Result};
use crate::schema::ContentSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One page within a preset: slug, renderer key, content schema, and the
/// placeholder content materialized until a tenant customizes the page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageDefinition {
    /// URL segment, unique within the owning preset.
    pub slug: String,
    /// Which content-renderer variant handles this page
    /// ("Gallery", "MenuGuide", "ContactForm", ...).
    pub component_key: String,
    /// Structural shape the content JSON must satisfy.
    pub content_schema: ContentSchema,
    /// Placeholder/fallback content, conforming to `content_schema`.
    pub default_content: Value,
}

/// A named site template for a business vertical.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Preset {
    /// Unique key, also the document filename in the store.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// Business-vertical tag ("restaurant", "craftsman", "company", ...).
    pub vertical: String,
    /// Document version, bumped by the store on every replace.
    pub version: u32,
    /// Pages in display/navigation order.
    pub pages: Vec<PageDefinition>,
}

/// Lightweight listing entry, returned by [`PresetStore::list`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PresetSummary {
    pub id: String,
    pub name: String,
    pub vertical: String,
    pub version: u32,
    pub page_count: usize,
}

impl Preset {
    /// Create an unversioned preset (version 0, assigned by the store on
    /// insert) and validate its structure.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        vertical: impl Into<String>,
        pages: Vec<PageDefinition>,
    ) -> Result<Self> {
        let preset = Self {
            id: id.into(),
            name: name.into(),
            vertical: vertical.into(),
            version: 0,
            pages,
        };
        preset.validate()?;
        Ok(preset)
    }

    /// Find a page definition by slug.
    pub fn page(&self, slug: &str) -> Option<&PageDefinition> {
        self.pages.iter().find(|p| p.slug == slug)
    }

    /// Summary for listings.
    pub fn summary(&self) -> PresetSummary {
        PresetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            vertical: self.vertical.clone(),
            version: self.version,
            page_count: self.pages.len(),
        }
    }

    /// Structural validation, enforced on every store write:
    /// URL-safe id and page slugs, slug uniqueness, non-empty schemas, and
    /// every `default_content` conforming to its page's schema.
    pub fn validate(&self) -> Result<()> {
        if !is_url_safe(&self.id) {
            return Err(Error::SchemaViolation(format!(
                "preset id '{}' is not URL-safe",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for page in &self.pages {
            if !is_url_safe(&page.slug) {
                return Err(Error::SchemaViolation(format!(
                    "page slug '{}' is not URL-safe",
                    page.slug
                )));
            }
            if !seen.insert(page.slug.as_str()) {
                return Err(Error::SchemaViolation(format!(
                    "duplicate page slug '{}' in preset '{}'",
                    page.slug, self.id
                )));
            }
            // Deserialized presets never went through `ContentSchema::new`,
            // so the non-empty invariant must be re-checked here.
            page.content_schema.ensure_non_empty().map_err(|e| {
                Error::SchemaViolation(format!(
                    "page '{}' in preset '{}': {e}",
                    page.slug, self.id
                ))
            })?;
            page.content_schema
                .validate(&page.default_content)
                .map_err(|e| {
                    Error::SchemaViolation(format!(
                        "default content for page '{}' in preset '{}': {e}",
                        page.slug, self.id
                    ))
                })?;
        }
        Ok(())
    }
}

/// Whether a string is usable as a URL segment and a document filename:
/// non-empty, lowercase alphanumeric plus `-`, no leading/trailing dash.
pub fn is_url_safe(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn menu_page(slug: &str) -> PageDefinition {
        PageDefinition {
            slug: slug.into(),
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
        }
    }

    #[test]
    fn valid_preset_passes_validation() {
        let preset =
            Preset::new("restaurant-v1", "Ristorante", "restaurant", vec![menu_page("menu")])
                .unwrap();
        assert_eq!(preset.version, 0);
        assert!(preset.page("menu").is_some());
        assert!(preset.page("nope").is_none());
    }

    #[test]
    fn duplicate_page_slugs_rejected() {
        let err = Preset::new(
            "restaurant-v1",
            "Ristorante",
            "restaurant",
            vec![menu_page("menu"), menu_page("menu")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate page slug"));
    }

    #[test]
    fn non_url_safe_slugs_rejected() {
        for bad in ["Menu", "menu page", "menu/", "-menu", "menu-", ""] {
            assert!(
                Preset::new("p1", "P", "restaurant", vec![menu_page(bad)]).is_err(),
                "slug {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn default_content_must_match_schema() {
        let mut page = menu_page("menu");
        page.default_content = json!({"images": []});
        let err = Preset::new("restaurant-v1", "R", "restaurant", vec![page]).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(_)));
        assert!(err.to_string().contains("default content for page 'menu'"));
    }

    #[test]
    fn deserialized_empty_schema_fails_validation() {
        // Deserialization fills public fields directly, so `validate` must
        // catch what `ContentSchema::new` would have refused.
        let preset: Preset = serde_json::from_value(json!({
            "id": "restaurant-v1",
            "name": "Ristorante",
            "vertical": "restaurant",
            "version": 0,
            "pages": [{
                "slug": "menu",
                "component_key": "MenuGuide",
                "content_schema": { "version": 1, "schema": {} },
                "default_content": { "anything": "goes" }
            }]
        }))
        .unwrap();

        let err = preset.validate().unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(_)));
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn url_safe_check() {
        assert!(is_url_safe("mia-azienda-srl"));
        assert!(is_url_safe("menu2"));
        assert!(!is_url_safe("Mia"));
        assert!(!is_url_safe("a_b"));
    }
}
