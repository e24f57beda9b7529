//! All-or-nothing enrichment batch runner.
//!
//! An operator-triggered, offline job: load the preset store, apply a
//! declared ordered list of transforms, commit the result. Transforms run
//! against an in-memory snapshot, so any transform failure aborts before a
//! single byte is written. Commits carry the version observed at snapshot
//! time; a conflict mid-commit rolls back the presets already committed.

use crate::error::Result;
use crate::preset::{Preset, PresetStore};
use crate::transform::{Transform, TransformSpec, apply_to_preset};
use tracing::{info, warn};

/// One preset/transform pairing that changed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchChange {
    pub preset_id: String,
    pub transform: String,
    pub pages_changed: usize,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Every change the batch produced (or would produce, when dry).
    pub changes: Vec<BatchChange>,
    /// Presets actually written. Zero on a dry run.
    pub presets_committed: usize,
    pub dry_run: bool,
}

/// A declared, ordered list of transforms executed as one unit.
#[derive(Default)]
pub struct TransformBatch {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from serialized declarations, preserving their order.
    pub fn from_specs(specs: Vec<TransformSpec>) -> Self {
        Self {
            transforms: specs.into_iter().map(TransformSpec::into_transform).collect(),
        }
    }

    /// Append a transform (builder pattern). Declaration order is
    /// execution order.
    pub fn with(mut self, transform: Box<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run the batch against `store`.
    ///
    /// Phase 1 snapshots every preset and applies all transforms in
    /// memory — any failure here aborts with nothing written. Phase 2
    /// commits each changed preset with its snapshot version; a
    /// `VersionConflict` (a concurrent editor raced the batch) rolls the
    /// already-committed presets back and surfaces the error.
    pub fn run<S: PresetStore>(&self, store: &S, dry_run: bool) -> Result<BatchReport> {
        let mut report = BatchReport {
            dry_run,
            ..BatchReport::default()
        };

        // Phase 1: transform in memory.
        let mut pending: Vec<PendingCommit> = Vec::new();
        for summary in store.list(None)? {
            let original = store.get(&summary.id)?;
            let snapshot_version = original.version;
            let mut current = original.clone();
            let mut touched = false;

            for transform in &self.transforms {
                let Some((next, pages_changed)) = apply_to_preset(transform.as_ref(), &current)?
                else {
                    continue;
                };
                debug_assert!(
                    matches!(apply_to_preset(transform.as_ref(), &next), Ok(None)),
                    "transform '{}' must be idempotent",
                    transform.name()
                );
                report.changes.push(BatchChange {
                    preset_id: current.id.clone(),
                    transform: transform.name().to_string(),
                    pages_changed,
                });
                current = next;
                touched = true;
            }

            if touched {
                pending.push(PendingCommit {
                    original,
                    transformed: current,
                    snapshot_version,
                });
            }
        }

        if dry_run {
            info!(
                "enrichment batch (dry run): {} change(s) across {} preset(s)",
                report.changes.len(),
                pending.len()
            );
            return Ok(report);
        }

        // Phase 2: commit, rolling back on failure.
        let mut committed: Vec<(Preset, u32)> = Vec::new();
        for commit in pending {
            match store.replace(commit.transformed, commit.snapshot_version) {
                Ok(stored) => {
                    info!("committed preset '{}' v{}", stored.id, stored.version);
                    committed.push((commit.original, stored.version));
                    report.presets_committed += 1;
                }
                Err(e) => {
                    warn!("batch commit failed on '{}', rolling back", commit.original.id);
                    Self::rollback(store, committed);
                    return Err(e);
                }
            }
        }

        info!(
            "enrichment batch: {} change(s), {} preset(s) committed",
            report.changes.len(),
            report.presets_committed
        );
        Ok(report)
    }

    /// Restore the original content of presets committed before a batch
    /// failure. Best-effort: a rollback write that itself conflicts is
    /// logged and skipped — the operator re-runs the batch from a clean
    /// read either way.
    fn rollback<S: PresetStore>(store: &S, committed: Vec<(Preset, u32)>) {
        for (original, committed_version) in committed {
            let id = original.id.clone();
            if let Err(e) = store.replace(original, committed_version) {
                warn!("failed to roll back preset '{id}': {e}");
            }
        }
    }
}

struct PendingCommit {
    original: Preset,
    transformed: Preset,
    snapshot_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{MemPresetStore, PageDefinition, Preset};
    use crate::schema::ContentSchema;
    use crate::transform::{ContentInjection, TransformTarget};
    use serde_json::json;

    fn menu_page_with_schema(required: &str) -> PageDefinition {
        PageDefinition {
            slug: "menu".into(),
            component_key: "MenuGuide".into(),
            content_schema: ContentSchema::new(
                1,
                json!({
                    "type": "object",
                    "properties": { required: { "type": "array" } },
                    "required": [required]
                }),
            )
            .unwrap(),
            default_content: json!({ required: [] }),
        }
    }

    fn seeded_store() -> MemPresetStore {
        let store = MemPresetStore::new();
        store
            .insert(
                Preset::new(
                    "restaurant-v1",
                    "Ristorante",
                    "restaurant",
                    vec![menu_page_with_schema("recipes")],
                )
                .unwrap(),
            )
            .unwrap();
        store
    }

    fn inject_recipes() -> Box<ContentInjection> {
        Box::new(ContentInjection::new(
            "inject-recipes",
            TransformTarget::new("restaurant", "MenuGuide"),
            json!({"recipes": [{"name": "Zuppa del giorno"}]}),
        ))
    }

    #[test]
    fn batch_commits_and_bumps_versions() {
        let store = seeded_store();
        let report = TransformBatch::new()
            .with(inject_recipes())
            .run(&store, false)
            .unwrap();

        assert_eq!(report.presets_committed, 1);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].pages_changed, 1);

        let preset = store.get("restaurant-v1").unwrap();
        assert_eq!(preset.version, 2);
        assert!(
            !preset.pages[0].default_content["recipes"]
                .as_array()
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn rerun_is_a_no_op() {
        let store = seeded_store();
        let batch = TransformBatch::new().with(inject_recipes());
        batch.run(&store, false).unwrap();
        let report = batch.run(&store, false).unwrap();

        assert_eq!(report.presets_committed, 0);
        assert!(report.changes.is_empty());
        // Version untouched by the second run.
        assert_eq!(store.get("restaurant-v1").unwrap().version, 2);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let store = seeded_store();
        let report = TransformBatch::new()
            .with(inject_recipes())
            .run(&store, true)
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.presets_committed, 0);
        assert_eq!(store.get("restaurant-v1").unwrap().version, 1);
    }

    #[test]
    fn transform_failure_aborts_the_whole_batch() {
        let store = seeded_store();
        // A second restaurant preset whose menu schema expects a different
        // shape — the injection payload violates it.
        store
            .insert(
                Preset::new(
                    "trattoria-v1",
                    "Trattoria",
                    "restaurant",
                    vec![menu_page_with_schema("dishes")],
                )
                .unwrap(),
            )
            .unwrap();

        let err = TransformBatch::new()
            .with(inject_recipes())
            .run(&store, false)
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::SchemaViolation(_)));

        // Nothing was committed anywhere, including the preset that would
        // have transformed cleanly.
        assert_eq!(store.get("restaurant-v1").unwrap().version, 1);
        assert_eq!(
            store.get("restaurant-v1").unwrap().pages[0].default_content,
            json!({"recipes": []})
        );
        assert_eq!(store.get("trattoria-v1").unwrap().version, 1);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = seeded_store();
        let report = TransformBatch::new().run(&store, false).unwrap();
        assert!(report.changes.is_empty());
        assert_eq!(report.presets_committed, 0);
    }
}
