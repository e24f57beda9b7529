//! Content resolver: the render-time data read for one page.
//!
//! Given a site id and a page slug, produces the merged content the page's
//! renderer receives. The merge rule is deliberate: **an override replaces
//! the preset default entirely** — never a field-level deep merge. Content
//! blocks (menus, galleries) are authored as complete structured documents;
//! partial merging would need per-field semantics the schema does not
//! define and could produce documents satisfying no schema version at all.
//!
//! The preset is read at resolution time, not provisioning time: preset
//! edits are immediately visible to every page a tenant has not overridden.

use crate::error::{Error, Result};
use crate::preset::PresetStore;
use crate::site::{SiteId, SiteRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where resolved content came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    /// The tenant's page override.
    Override,
    /// The preset's default content.
    PresetDefault,
}

/// The data a page renderer receives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResolvedContent {
    /// Renderer variant for the page, from the page definition.
    pub component_key: String,
    /// Schema generation the content conforms to.
    pub schema_version: u32,
    pub content: Value,
    pub origin: ContentOrigin,
}

/// Render-time content lookup over a site registry.
pub struct ContentResolver<'a, S: PresetStore> {
    registry: &'a SiteRegistry<'a, S>,
}

impl<'a, S: PresetStore> ContentResolver<'a, S> {
    pub fn new(registry: &'a SiteRegistry<'a, S>) -> Self {
        Self { registry }
    }

    /// Resolve one page's content for one site.
    ///
    /// Fails with `PageNotFound` when the slug is absent from the site's
    /// *current* preset — even if a stale override for that slug is still
    /// stored. A renamed or removed page surfaces here as a user-visible
    /// error, never as a silent fallback.
    pub fn resolve(&self, site_id: SiteId, page_slug: &str) -> Result<ResolvedContent> {
        let instance = self.registry.get(site_id)?;
        let preset = self.registry.store().get(&instance.preset_id)?;

        let page = preset.page(page_slug).ok_or_else(|| Error::PageNotFound {
            preset: preset.id.clone(),
            page: page_slug.to_string(),
        })?;

        // Full replacement, never a deep merge.
        let (content, origin) = match instance.page_overrides.get(page_slug) {
            Some(override_content) => (override_content.clone(), ContentOrigin::Override),
            None => (page.default_content.clone(), ContentOrigin::PresetDefault),
        };

        Ok(ResolvedContent {
            component_key: page.component_key.clone(),
            schema_version: page.content_schema.version,
            content,
            origin,
        })
    }
}
