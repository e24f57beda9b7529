//! Site instance registry: one tenant's concrete site.
//!
//! A [`SiteInstance`] binds a tenant (numeric site id plus a globally
//! unique slug) to the preset it was instantiated from, with per-page
//! content overrides for customized pages. Overrides are validated against
//! the page's content schema *at write time* — malformed content is caught
//! at the authoring surface, never at render time.
//!
//! Instances are stored as one JSON document per site, written atomically.

use crate::error::{Error, Result};
use crate::materialize::Materializer;
use crate::preset::{PresetStore, is_url_safe};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Opaque tenant site identifier, assigned by the provisioning platform.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tenant's concrete site: preset binding plus per-page overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SiteInstance {
    pub site_id: SiteId,
    /// Tenant-facing URL segment, unique across all site instances.
    pub slug: String,
    /// The preset this site was instantiated from. Many sites may share
    /// one preset.
    pub preset_id: String,
    /// Page slug → content overriding the preset default for that page.
    /// Only populated for customized pages.
    #[serde(default)]
    pub page_overrides: BTreeMap<String, Value>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last override change.
    pub updated_at: String,
}

/// Registry of site instances over a preset store.
///
/// Writes go through a registry-wide lock so uniqueness checks and the
/// read-modify-write override paths are not interleaved with another
/// writer in this process.
pub struct SiteRegistry<'a, S: PresetStore> {
    sites_dir: PathBuf,
    store: &'a S,
    write_lock: Mutex<()>,
}

impl<'a, S: PresetStore> SiteRegistry<'a, S> {
    /// Open (creating if needed) a registry rooted at `sites_dir`.
    pub fn new(sites_dir: impl Into<PathBuf>, store: &'a S) -> Result<Self> {
        let sites_dir = sites_dir.into();
        std::fs::create_dir_all(&sites_dir)
            .map_err(|e| Error::store("failed to create sites dir", e))?;
        Ok(Self {
            sites_dir,
            store,
            write_lock: Mutex::new(()),
        })
    }

    /// The preset store this registry resolves against.
    pub fn store(&self) -> &S {
        self.store
    }

    /// The registry's root directory.
    pub fn dir(&self) -> &Path {
        &self.sites_dir
    }

    fn site_path(&self, site_id: SiteId) -> PathBuf {
        self.sites_dir.join(format!("site-{site_id}.json"))
    }

    // ── Provisioning ───────────────────────────────────────────────

    /// Provision a tenant site from a preset.
    ///
    /// The site id comes from the provisioning platform; the registry
    /// enforces its uniqueness along with global slug uniqueness.
    pub fn create(&self, site_id: SiteId, preset_id: &str, slug: &str) -> Result<SiteInstance> {
        // Fail fast on a dangling preset reference.
        self.store.get(preset_id)?;
        // Uniqueness checks and the save must not interleave with another
        // writer.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        if !is_url_safe(slug) {
            return Err(Error::SchemaViolation(format!(
                "site slug '{slug}' is not URL-safe"
            )));
        }
        if self.site_path(site_id).exists() {
            return Err(Error::SiteExists(site_id));
        }
        if self.list()?.iter().any(|s| s.slug == slug) {
            return Err(Error::DuplicateSlug(slug.to_string()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let instance = SiteInstance {
            site_id,
            slug: slug.to_string(),
            preset_id: preset_id.to_string(),
            page_overrides: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.save(&instance)?;
        info!("provisioned site {site_id} ('{slug}') from preset '{preset_id}'");
        Ok(instance)
    }

    // ── Lookup ─────────────────────────────────────────────────────

    /// Fetch a site instance by id.
    pub fn get(&self, site_id: SiteId) -> Result<SiteInstance> {
        let path = self.site_path(site_id);
        if !path.exists() {
            return Err(Error::SiteNotFound(site_id));
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| Error::store("failed to read site document", e))?;
        serde_json::from_str(&json).map_err(|e| {
            Error::StoreUnavailable(format!("site document {site_id} is corrupt: {e}"))
        })
    }

    /// Look up a site instance by its tenant slug.
    pub fn find_by_slug(&self, slug: &str) -> Result<Option<SiteInstance>> {
        Ok(self.list()?.into_iter().find(|s| s.slug == slug))
    }

    /// All site instances, skipping malformed documents with a warning.
    pub fn list(&self) -> Result<Vec<SiteInstance>> {
        let entries = std::fs::read_dir(&self.sites_dir)
            .map_err(|e| Error::store("failed to read sites dir", e))?;

        let mut sites = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::store("failed to read dir entry", e))?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<SiteInstance>(&json) {
                    Ok(site) => sites.push(site),
                    Err(e) => warn!("skipping malformed site at {}: {e}", path.display()),
                },
                Err(e) => warn!("skipping unreadable site at {}: {e}", path.display()),
            }
        }
        sites.sort_by_key(|s| s.site_id);
        Ok(sites)
    }

    // ── Overrides ──────────────────────────────────────────────────

    /// Set a tenant's content override for one page.
    ///
    /// The page must exist in the site's current preset (`UnknownPage`
    /// otherwise) and the content must validate against that page's
    /// schema (`SchemaViolation` otherwise). The override replaces the
    /// preset default entirely at resolution time — it is stored as the
    /// complete content document, not a patch.
    pub fn set_page_override(
        &self,
        site_id: SiteId,
        page_slug: &str,
        content: Value,
    ) -> Result<SiteInstance> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut instance = self.get(site_id)?;
        let preset = self.store.get(&instance.preset_id)?;

        let page = preset
            .page(page_slug)
            .ok_or_else(|| Error::UnknownPage(page_slug.to_string()))?;
        page.content_schema.validate(&content)?;

        instance
            .page_overrides
            .insert(page_slug.to_string(), content);
        instance.updated_at = chrono::Utc::now().to_rfc3339();
        self.save(&instance)?;
        debug!("site {site_id}: override set for page '{page_slug}'");
        Ok(instance)
    }

    /// Drop a page override, reverting the page to the preset default.
    /// Also usable to clear overrides left stale by a preset page removal.
    pub fn clear_page_override(&self, site_id: SiteId, page_slug: &str) -> Result<SiteInstance> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut instance = self.get(site_id)?;
        if instance.page_overrides.remove(page_slug).is_some() {
            instance.updated_at = chrono::Utc::now().to_rfc3339();
            self.save(&instance)?;
            debug!("site {site_id}: override cleared for page '{page_slug}'");
        }
        Ok(instance)
    }

    // ── Decommissioning ────────────────────────────────────────────

    /// Remove a site instance and its materialized page modules.
    /// Removing an already-absent site is not an error.
    pub fn remove(&self, site_id: SiteId, materializer: &Materializer) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.site_path(site_id);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| Error::store("failed to remove site document", e))?;
        }
        let orphans = materializer.remove_site_modules(site_id)?;
        info!("removed site {site_id} ({orphans} page module(s) cleaned up)");
        Ok(())
    }

    /// Delete a preset, refusing while any site instance still references
    /// it. Decommission or re-point the referencing sites first.
    pub fn remove_preset(&self, preset_id: &str) -> Result<()> {
        // Lock out a racing `create` between the reference scan and the
        // store delete.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let referents = self
            .list()?
            .iter()
            .filter(|s| s.preset_id == preset_id)
            .count();
        if referents > 0 {
            return Err(Error::PresetInUse {
                preset: preset_id.to_string(),
                sites: referents,
            });
        }
        self.store.remove(preset_id)?;
        info!("removed preset '{preset_id}'");
        Ok(())
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn save(&self, instance: &SiteInstance) -> Result<()> {
        let final_path = self.site_path(instance.site_id);
        let tmp_path = self
            .sites_dir
            .join(format!(".site-{}.json.tmp", instance.site_id));

        let json = serde_json::to_string_pretty(instance)
            .map_err(|e| Error::StoreUnavailable(format!("failed to serialize site: {e}")))?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| Error::store("failed to write temp site document", e))?;
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| Error::store("failed to rename site document", e))?;
        Ok(())
    }
}
