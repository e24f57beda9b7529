//! Durable preset registry with atomic, versioned document replace.
//!
//! Presets are whole documents keyed by id. The store contract is
//! get/replace by key with optimistic versioning — a replace carrying a
//! stale version fails with `VersionConflict` and the caller re-reads.
//! [`FsPresetStore`] keeps one JSON file per preset and writes atomically
//! (temp file, then rename into place). [`MemPresetStore`] backs tests and
//! the transform batch's snapshot stage.

use crate::error::{Error, Result};
use crate::preset::{Preset, PresetSummary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Storage contract for presets: atomic get/replace by key.
///
/// `update` is the read-modify-write convenience built on `get` +
/// `replace`; the mutator receives the full document and returns the
/// replacement, so there are no partial-field races.
pub trait PresetStore {
    /// Fetch a preset by id.
    fn get(&self, id: &str) -> Result<Preset>;

    /// List preset summaries, optionally filtered by vertical tag.
    fn list(&self, vertical: Option<&str>) -> Result<Vec<PresetSummary>>;

    /// Insert a new preset. The stored document gets version 1.
    fn insert(&self, preset: Preset) -> Result<Preset>;

    /// Replace an existing preset. `expected_version` must match the
    /// stored document's version; the replacement is written with the
    /// version bumped by one.
    fn replace(&self, preset: Preset, expected_version: u32) -> Result<Preset>;

    /// Delete a preset document. Callers that track references (the site
    /// registry) must check them first; the store itself only knows keys.
    fn remove(&self, id: &str) -> Result<()>;

    /// Atomic read-modify-write: fetch, run the mutator on the full
    /// document, replace with the version observed at read time.
    fn update<F>(&self, id: &str, mutator: F) -> Result<Preset>
    where
        F: FnOnce(Preset) -> Result<Preset>,
        Self: Sized,
    {
        let current = self.get(id)?;
        let expected = current.version;
        let replacement = mutator(current)?;
        self.replace(replacement, expected)
    }
}

// ── FsPresetStore ──────────────────────────────────────────────────

/// File-backed preset store: one `<id>.json` document per preset.
///
/// Writes go through a store-wide write lock so the version check and the
/// rename are not interleaved with another writer in this process.
pub struct FsPresetStore {
    presets_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FsPresetStore {
    /// Open (creating if needed) a store rooted at `presets_dir`.
    pub fn new(presets_dir: impl Into<PathBuf>) -> Result<Self> {
        let presets_dir = presets_dir.into();
        std::fs::create_dir_all(&presets_dir)
            .map_err(|e| Error::store("failed to create presets dir", e))?;
        Ok(Self {
            presets_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// The store's root directory.
    pub fn dir(&self) -> &Path {
        &self.presets_dir
    }

    fn preset_path(&self, id: &str) -> PathBuf {
        self.presets_dir.join(format!("{id}.json"))
    }

    fn read_doc(&self, id: &str) -> Result<Preset> {
        let path = self.preset_path(id);
        if !path.exists() {
            return Err(Error::PresetNotFound(id.to_string()));
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| Error::store("failed to read preset document", e))?;
        serde_json::from_str(&json).map_err(|e| {
            Error::StoreUnavailable(format!("preset document '{id}' is corrupt: {e}"))
        })
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn write_doc(&self, preset: &Preset) -> Result<()> {
        let final_path = self.preset_path(&preset.id);
        let tmp_path = self.presets_dir.join(format!(".{}.json.tmp", preset.id));

        let json = serde_json::to_string_pretty(preset)
            .map_err(|e| Error::StoreUnavailable(format!("failed to serialize preset: {e}")))?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| Error::store("failed to write temp preset document", e))?;
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| Error::store("failed to rename preset document", e))?;

        debug!("wrote preset '{}' v{}", preset.id, preset.version);
        Ok(())
    }
}

impl PresetStore for FsPresetStore {
    fn get(&self, id: &str) -> Result<Preset> {
        self.read_doc(id)
    }

    fn list(&self, vertical: Option<&str>) -> Result<Vec<PresetSummary>> {
        let entries = std::fs::read_dir(&self.presets_dir)
            .map_err(|e| Error::store("failed to read presets dir", e))?;

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::store("failed to read dir entry", e))?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let json = match std::fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) => {
                    warn!("skipping unreadable preset at {}: {e}", path.display());
                    continue;
                }
            };
            match serde_json::from_str::<Preset>(&json) {
                Ok(preset) => {
                    if vertical.is_none_or(|v| preset.vertical == v) {
                        summaries.push(preset.summary());
                    }
                }
                Err(e) => {
                    warn!("skipping malformed preset at {}: {e}", path.display());
                }
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    fn insert(&self, preset: Preset) -> Result<Preset> {
        preset.validate()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        if self.preset_path(&preset.id).exists() {
            return Err(Error::PresetExists(preset.id));
        }
        let stored = Preset {
            version: 1,
            ..preset
        };
        self.write_doc(&stored)?;
        Ok(stored)
    }

    fn replace(&self, preset: Preset, expected_version: u32) -> Result<Preset> {
        preset.validate()?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.read_doc(&preset.id)?;
        if current.version != expected_version {
            return Err(Error::VersionConflict {
                preset: preset.id,
                expected: expected_version,
                found: current.version,
            });
        }
        let stored = Preset {
            version: expected_version + 1,
            ..preset
        };
        self.write_doc(&stored)?;
        Ok(stored)
    }

    fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.preset_path(id);
        if !path.exists() {
            return Err(Error::PresetNotFound(id.to_string()));
        }
        std::fs::remove_file(&path)
            .map_err(|e| Error::store("failed to remove preset document", e))?;
        debug!("removed preset '{id}'");
        Ok(())
    }
}

// ── MemPresetStore ─────────────────────────────────────────────────

/// In-memory preset store with the same versioning semantics as the
/// file-backed store.
#[derive(Default)]
pub struct MemPresetStore {
    presets: Mutex<HashMap<String, Preset>>,
}

impl MemPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetStore for MemPresetStore {
    fn get(&self, id: &str) -> Result<Preset> {
        let presets = self.presets.lock().unwrap_or_else(|e| e.into_inner());
        presets
            .get(id)
            .cloned()
            .ok_or_else(|| Error::PresetNotFound(id.to_string()))
    }

    fn list(&self, vertical: Option<&str>) -> Result<Vec<PresetSummary>> {
        let presets = self.presets.lock().unwrap_or_else(|e| e.into_inner());
        let mut summaries: Vec<PresetSummary> = presets
            .values()
            .filter(|p| vertical.is_none_or(|v| p.vertical == v))
            .map(Preset::summary)
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    fn insert(&self, preset: Preset) -> Result<Preset> {
        preset.validate()?;
        let mut presets = self.presets.lock().unwrap_or_else(|e| e.into_inner());
        if presets.contains_key(&preset.id) {
            return Err(Error::PresetExists(preset.id));
        }
        let stored = Preset {
            version: 1,
            ..preset
        };
        presets.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn replace(&self, preset: Preset, expected_version: u32) -> Result<Preset> {
        preset.validate()?;
        let mut presets = self.presets.lock().unwrap_or_else(|e| e.into_inner());
        let current = presets
            .get(&preset.id)
            .ok_or_else(|| Error::PresetNotFound(preset.id.clone()))?;
        if current.version != expected_version {
            return Err(Error::VersionConflict {
                preset: preset.id,
                expected: expected_version,
                found: current.version,
            });
        }
        let stored = Preset {
            version: expected_version + 1,
            ..preset
        };
        presets.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn remove(&self, id: &str) -> Result<()> {
        let mut presets = self.presets.lock().unwrap_or_else(|e| e.into_inner());
        presets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::PresetNotFound(id.to_string()))
    }
}
