//! Site materializer: expands a site instance into render-ready page
//! module descriptors.
//!
//! A descriptor is a derived, disposable artifact — one per (site, page
//! definition) pair, always regenerable from the instance plus its preset.
//! The rendering pipeline consumes descriptors and, at render time, calls
//! the content resolver with exactly the `(site_id, page_slug)` pair in the
//! descriptor's data binding. File/bundle emission is outside this crate.
//!
//! Rematerialization is an idempotent full replace: the new descriptor set
//! is diffed against the persisted one and modules for page slugs no
//! longer in the preset are deleted. Other sites' modules are never
//! touched. Materializations for the same site are mutually exclusive via
//! a per-site lock table; different sites proceed in parallel.

use crate::error::{Error, Result};
use crate::preset::PresetStore;
use crate::site::{SiteId, SiteRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// The resolver call a rendered page must make for its data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataBinding {
    pub site_id: SiteId,
    pub page_slug: String,
}

/// One render-ready page module: routing slug, renderer variant, and the
/// content-resolver binding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageModuleDescriptor {
    /// Routing slug — exactly one path per page, no catch-alls.
    pub slug: String,
    /// Content-renderer variant for this page.
    pub component_key: String,
    pub data_binding: DataBinding,
}

/// Outcome of a (re)materialization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSite {
    /// Descriptors in preset page order.
    pub descriptors: Vec<PageModuleDescriptor>,
    /// Modules deleted because their page slug left the preset.
    pub orphans_removed: usize,
}

/// Emits and maintains per-site page module descriptors under a modules
/// directory (`modules/site-<id>/<page-slug>.json`).
pub struct Materializer {
    modules_dir: PathBuf,
    locks: Mutex<HashMap<SiteId, Arc<Mutex<()>>>>,
}

impl Materializer {
    /// Open (creating if needed) a materializer rooted at `modules_dir`.
    pub fn new(modules_dir: impl Into<PathBuf>) -> Result<Self> {
        let modules_dir = modules_dir.into();
        std::fs::create_dir_all(&modules_dir)
            .map_err(|e| Error::store("failed to create modules dir", e))?;
        Ok(Self {
            modules_dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// The materializer's root directory.
    pub fn dir(&self) -> &Path {
        &self.modules_dir
    }

    fn site_dir(&self, site_id: SiteId) -> PathBuf {
        self.modules_dir.join(format!("site-{site_id}"))
    }

    /// Per-site mutual exclusion scope: same site serializes, different
    /// sites run independently.
    fn site_lock(&self, site_id: SiteId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(site_id).or_default().clone()
    }

    /// Materialize a site: emit one descriptor per page definition, in
    /// preset page order. A zero-page preset yields an empty set — a valid,
    /// if degenerate, site.
    pub fn materialize<S: PresetStore>(
        &self,
        registry: &SiteRegistry<'_, S>,
        site_id: SiteId,
    ) -> Result<Vec<PageModuleDescriptor>> {
        self.rematerialize(registry, site_id).map(|m| m.descriptors)
    }

    /// Idempotent full replace of a site's module set.
    ///
    /// Computes the descriptor set from the current instance + preset,
    /// writes each module, and deletes modules whose page slug is no
    /// longer present. Run twice with no state change, the second run
    /// produces an identical set and removes nothing.
    pub fn rematerialize<S: PresetStore>(
        &self,
        registry: &SiteRegistry<'_, S>,
        site_id: SiteId,
    ) -> Result<MaterializedSite> {
        let lock = self.site_lock(site_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let instance = registry.get(site_id)?;
        let preset = registry.store().get(&instance.preset_id)?;

        let descriptors: Vec<PageModuleDescriptor> = preset
            .pages
            .iter()
            .map(|page| PageModuleDescriptor {
                slug: page.slug.clone(),
                component_key: page.component_key.clone(),
                data_binding: DataBinding {
                    site_id,
                    page_slug: page.slug.clone(),
                },
            })
            .collect();

        let site_dir = self.site_dir(site_id);
        std::fs::create_dir_all(&site_dir)
            .map_err(|e| Error::store("failed to create site modules dir", e))?;

        let keep: HashSet<&str> = descriptors.iter().map(|d| d.slug.as_str()).collect();

        // Remove orphans first: modules for slugs the preset dropped.
        let mut orphans_removed = 0;
        let entries = std::fs::read_dir(&site_dir)
            .map_err(|e| Error::store("failed to read site modules dir", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::store("failed to read dir entry", e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(slug) = name.strip_suffix(".json") else {
                continue;
            };
            if !keep.contains(slug) {
                std::fs::remove_file(entry.path())
                    .map_err(|e| Error::store("failed to remove orphaned module", e))?;
                debug!("site {site_id}: removed orphaned module '{slug}'");
                orphans_removed += 1;
            }
        }

        // Write the full replacement set.
        for descriptor in &descriptors {
            let path = site_dir.join(format!("{}.json", descriptor.slug));
            let json = serde_json::to_string_pretty(descriptor).map_err(|e| {
                Error::StoreUnavailable(format!("failed to serialize module: {e}"))
            })?;
            std::fs::write(&path, json)
                .map_err(|e| Error::store("failed to write module descriptor", e))?;
        }

        info!(
            "materialized site {site_id}: {} page(s), {orphans_removed} orphan(s) removed",
            descriptors.len()
        );
        Ok(MaterializedSite {
            descriptors,
            orphans_removed,
        })
    }

    /// The persisted descriptor set for a site, sorted by slug. Empty if
    /// the site has never been materialized.
    pub fn modules(&self, site_id: SiteId) -> Result<Vec<PageModuleDescriptor>> {
        let site_dir = self.site_dir(site_id);
        if !site_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&site_dir)
            .map_err(|e| Error::store("failed to read site modules dir", e))?;

        let mut modules = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::store("failed to read dir entry", e))?;
            let json = std::fs::read_to_string(entry.path())
                .map_err(|e| Error::store("failed to read module descriptor", e))?;
            let descriptor: PageModuleDescriptor = serde_json::from_str(&json).map_err(|e| {
                Error::StoreUnavailable(format!("module descriptor is corrupt: {e}"))
            })?;
            modules.push(descriptor);
        }
        modules.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(modules)
    }

    /// Inverse of materialization: delete every module a site owns.
    /// Returns the number of modules removed; a never-materialized site
    /// removes zero.
    pub fn remove_site_modules(&self, site_id: SiteId) -> Result<usize> {
        let lock = self.site_lock(site_id);
        let count = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            let site_dir = self.site_dir(site_id);
            if site_dir.exists() {
                let count = std::fs::read_dir(&site_dir)
                    .map_err(|e| Error::store("failed to read site modules dir", e))?
                    .count();
                std::fs::remove_dir_all(&site_dir)
                    .map_err(|e| Error::store("failed to remove site modules dir", e))?;
                count
            } else {
                0
            }
        };
        drop(lock);

        // The site is gone; drop its lock entry so the table does not grow
        // unbounded over decommissioned sites. Kept if another thread still
        // holds a handle.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(&site_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&site_id);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{MemPresetStore, PageDefinition, Preset, PresetStore};
    use crate::schema::ContentSchema;
    use serde_json::json;

    fn page(slug: &str, component_key: &str) -> PageDefinition {
        PageDefinition {
            slug: slug.into(),
            component_key: component_key.into(),
            content_schema: ContentSchema::new(
                1,
                json!({
                    "type": "object",
                    "properties": { "title": { "type": "string" } },
                    "required": ["title"]
                }),
            )
            .unwrap(),
            default_content: json!({"title": "Segnaposto"}),
        }
    }

    fn seeded_store(pages: Vec<PageDefinition>) -> MemPresetStore {
        let store = MemPresetStore::new();
        store
            .insert(Preset::new("restaurant-v1", "Ristorante", "restaurant", pages).unwrap())
            .unwrap();
        store
    }

    #[test]
    fn descriptors_follow_preset_page_order() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![page("home", "RichText"), page("menu", "MenuGuide")]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(16), "restaurant-v1", "mia-azienda-srl").unwrap();
        let descriptors = materializer.materialize(&registry, SiteId(16)).unwrap();

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].slug, "home");
        assert_eq!(descriptors[1].slug, "menu");
        assert_eq!(descriptors[1].component_key, "MenuGuide");
        assert_eq!(
            descriptors[1].data_binding,
            DataBinding {
                site_id: SiteId(16),
                page_slug: "menu".into()
            }
        );
    }

    #[test]
    fn zero_page_preset_materializes_to_empty_set() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(1), "restaurant-v1", "vuoto").unwrap();
        let result = materializer.rematerialize(&registry, SiteId(1)).unwrap();
        assert!(result.descriptors.is_empty());
        assert_eq!(result.orphans_removed, 0);
    }

    #[test]
    fn rematerialize_twice_is_idempotent() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![page("home", "RichText")]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(1), "restaurant-v1", "uno").unwrap();
        let first = materializer.rematerialize(&registry, SiteId(1)).unwrap();
        let second = materializer.rematerialize(&registry, SiteId(1)).unwrap();

        assert_eq!(first.descriptors, second.descriptors);
        assert_eq!(second.orphans_removed, 0);
    }

    #[test]
    fn dropped_pages_become_cleaned_orphans() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![page("home", "RichText"), page("menu", "MenuGuide")]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(1), "restaurant-v1", "uno").unwrap();
        materializer.rematerialize(&registry, SiteId(1)).unwrap();

        // The preset drops its menu page.
        store
            .update("restaurant-v1", |mut p| {
                p.pages.retain(|pg| pg.slug != "menu");
                Ok(p)
            })
            .unwrap();

        let result = materializer.rematerialize(&registry, SiteId(1)).unwrap();
        assert_eq!(result.orphans_removed, 1);
        let slugs: Vec<String> = materializer
            .modules(SiteId(1))
            .unwrap()
            .into_iter()
            .map(|m| m.slug)
            .collect();
        assert_eq!(slugs, ["home"]);
    }

    #[test]
    fn other_sites_modules_are_untouched() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![page("home", "RichText")]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(1), "restaurant-v1", "uno").unwrap();
        registry.create(SiteId(2), "restaurant-v1", "due").unwrap();
        materializer.rematerialize(&registry, SiteId(1)).unwrap();
        materializer.rematerialize(&registry, SiteId(2)).unwrap();

        materializer.remove_site_modules(SiteId(1)).unwrap();
        assert!(materializer.modules(SiteId(1)).unwrap().is_empty());
        assert_eq!(materializer.modules(SiteId(2)).unwrap().len(), 1);
    }

    #[test]
    fn removing_modules_of_unknown_site_is_zero() {
        let module_dir = tempfile::tempdir().unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();
        assert_eq!(materializer.remove_site_modules(SiteId(99)).unwrap(), 0);
    }

    #[test]
    fn decommissioned_site_leaves_no_lock_entry() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![page("home", "RichText")]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(1), "restaurant-v1", "uno").unwrap();
        materializer.rematerialize(&registry, SiteId(1)).unwrap();
        assert!(materializer
            .locks
            .lock()
            .unwrap()
            .contains_key(&SiteId(1)));

        materializer.remove_site_modules(SiteId(1)).unwrap();
        assert!(!materializer
            .locks
            .lock()
            .unwrap()
            .contains_key(&SiteId(1)));
    }

    #[test]
    fn site_removal_cleans_modules() {
        let module_dir = tempfile::tempdir().unwrap();
        let site_dir = tempfile::tempdir().unwrap();
        let store = seeded_store(vec![page("home", "RichText")]);
        let registry = SiteRegistry::new(site_dir.path(), &store).unwrap();
        let materializer = Materializer::new(module_dir.path()).unwrap();

        registry.create(SiteId(1), "restaurant-v1", "uno").unwrap();
        materializer.rematerialize(&registry, SiteId(1)).unwrap();

        registry.remove(SiteId(1), &materializer).unwrap();
        assert!(matches!(registry.get(SiteId(1)), Err(Error::SiteNotFound(_))));
        assert!(materializer.modules(SiteId(1)).unwrap().is_empty());
    }
}
