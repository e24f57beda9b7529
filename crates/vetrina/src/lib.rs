//! Preset-driven site materialization engine for multi-tenant platforms.
//!
//! `vetrina` is the core of a multi-tenant business-site platform: a
//! registry of business-vertical "starter site" templates (**presets**), a
//! set of schema-validated **enrichment transforms** that inject authored
//! content into those templates, and a **materializer** that expands a
//! tenant's site into render-ready page modules bound to a content
//! resolver.
//!
//! # Pipeline
//!
//! ```text
//! preset store ──(enrichment batch)──▶ enriched presets
//!       │
//!       └──▶ site registry ──▶ materializer ──▶ page module descriptors
//!                  │                                      │
//!                  └────────── content resolver ◀─────────┘ (render time)
//! ```
//!
//! An operator seeds or authors a [`Preset`](preset::Preset); the offline
//! [`TransformBatch`](transform::TransformBatch) replaces placeholder
//! content ahead of provisioning; a tenant signup creates a
//! [`SiteInstance`](site::SiteInstance) bound to one preset; the
//! [`Materializer`](materialize::Materializer) expands it into one
//! [`PageModuleDescriptor`](materialize::PageModuleDescriptor) per page;
//! at render time each page calls the
//! [`ContentResolver`](resolve::ContentResolver) with its data binding.
//!
//! # Getting started
//!
//! ```ignore
//! use vetrina::prelude::*;
//!
//! fn main() -> vetrina::Result<()> {
//!     let store = FsPresetStore::new(".vetrina/presets")?;
//!     store.insert(vetrina::preset::starter::restaurant()?)?;
//!
//!     let registry = SiteRegistry::new(".vetrina/sites", &store)?;
//!     registry.create(SiteId(16), "restaurant-v1", "mia-azienda-srl")?;
//!
//!     let materializer = Materializer::new(".vetrina/modules")?;
//!     for module in materializer.materialize(&registry, SiteId(16))? {
//!         println!("/{} → {}", module.slug, module.component_key);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`preset`] | [`Preset`](preset::Preset) model, starter templates, versioned [`PresetStore`](preset::PresetStore) with atomic replace |
//! | [`transform`] | Targeted, idempotent content transforms and the all-or-nothing batch runner |
//! | [`site`] | [`SiteRegistry`](site::SiteRegistry): tenant provisioning and write-time-validated page overrides |
//! | [`resolve`] | [`ContentResolver`](resolve::ContentResolver): override-replaces-default content lookup |
//! | [`materialize`] | [`Materializer`](materialize::Materializer): descriptor emission and orphan cleanup |
//! | [`schema`] | Versioned JSON content schemas and validation |
//! | [`retry`] | Bounded backoff for transient store failures |
//!
//! # Design principles
//!
//! 1. **Schemas are load-bearing.** Every content document — preset
//!    default, transform output, tenant override — validates against its
//!    page's schema before it is persisted. Field-name drift fails loudly
//!    at the authoring surface, never silently at render time.
//!
//! 2. **Presets are whole documents.** The store replaces them atomically
//!    with optimistic versioning; there are no partial-field writes to
//!    race.
//!
//! 3. **Derived artifacts are disposable.** Page modules are a pure
//!    projection of (instance, preset) — regenerable, diffable, and owned
//!    exclusively by the site that produced them.

pub mod content;
pub mod error;
pub mod materialize;
pub mod prelude;
pub mod preset;
pub mod resolve;
pub mod retry;
pub mod schema;
pub mod site;
pub mod transform;

pub use error::{Error, Result};

// Re-export schemars for downstream crates deriving content types.
pub use schemars;
