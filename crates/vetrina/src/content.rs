//! Built-in page content types.
//!
//! These structs define the canonical content shapes used by the starter
//! presets. Their schemas are derived with
//! [`content_schema_for`](crate::schema::content_schema_for), so the field
//! names here *are* the canonical field names — `gallery_images`, not the
//! legacy `images` spelling that older authoring passes left behind.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Gallery ────────────────────────────────────────────────────────

/// One image in a gallery page.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct GalleryImage {
    /// Image source URL or asset path.
    pub src: String,
    /// Optional caption shown under the image.
    pub caption: Option<String>,
}

/// Content for a `Gallery` page.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct GalleryContent {
    /// Canonical field name. Legacy presets used `images`; the
    /// field-rename transform migrates them here.
    pub gallery_images: Vec<GalleryImage>,
}

// ── Menu ───────────────────────────────────────────────────────────

/// One dish on a restaurant menu page.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub description: Option<String>,
    /// Display price, kept as text ("12,50 €") — currency formatting is a
    /// rendering concern.
    pub price: Option<String>,
}

/// Content for a `MenuGuide` page.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct MenuContent {
    pub recipes: Vec<Recipe>,
}

// ── Contact ────────────────────────────────────────────────────────

/// Content for a `ContactForm` page.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct ContactContent {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// ── Rich text ──────────────────────────────────────────────────────

/// Content for a free-form text page (`RichText` renderer).
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct RichTextContent {
    pub title: String,
    /// Markdown body.
    pub body: String,
}
