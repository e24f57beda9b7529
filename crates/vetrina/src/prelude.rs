//! Convenience re-exports: `use vetrina::prelude::*;`
//!
//! Pulls in the types needed for the vast majority of pipeline programs:
//! the preset model and stores, the transform batch, the site registry,
//! resolver, and materializer. Specialized types (transform
//! implementations, batch reports, retry config) are intentionally
//! excluded — import those from their modules directly when needed.

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::error::{Error, Result};

// ── Presets ─────────────────────────────────────────────────────────
pub use crate::preset::{
    FsPresetStore, MemPresetStore, PageDefinition, Preset, PresetStore, PresetSummary,
};
pub use crate::schema::{ContentSchema, content_schema_for};

// ── Transforms ──────────────────────────────────────────────────────
pub use crate::transform::{Transform, TransformBatch, TransformSpec, TransformTarget};

// ── Sites and rendering ─────────────────────────────────────────────
pub use crate::materialize::{Materializer, PageModuleDescriptor};
pub use crate::resolve::{ContentResolver, ResolvedContent};
pub use crate::site::{SiteId, SiteInstance, SiteRegistry};
