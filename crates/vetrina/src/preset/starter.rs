//! Built-in starter presets, one per supported business vertical.
//!
//! These are the templates a freshly seeded store offers: placeholder
//! content throughout, schemas derived from the canonical content types in
//! [`crate::content`]. The enrichment batch replaces the placeholders with
//! authored content before tenants are provisioned.

use crate::content::{ContactContent, GalleryContent, MenuContent, RichTextContent};
use crate::error::Result;
use crate::preset::{PageDefinition, Preset};
use crate::schema::content_schema_for;
use serde_json::json;

fn rich_text_page(slug: &str, title: &str) -> PageDefinition {
    PageDefinition {
        slug: slug.into(),
        component_key: "RichText".into(),
        content_schema: content_schema_for::<RichTextContent>(1),
        default_content: json!({
            "title": title,
            "body": "Testo segnaposto — da personalizzare."
        }),
    }
}

fn gallery_page() -> PageDefinition {
    PageDefinition {
        slug: "galleria".into(),
        component_key: "Gallery".into(),
        content_schema: content_schema_for::<GalleryContent>(1),
        default_content: json!({ "gallery_images": [] }),
    }
}

fn contact_page() -> PageDefinition {
    PageDefinition {
        slug: "contatti".into(),
        component_key: "ContactForm".into(),
        content_schema: content_schema_for::<ContactContent>(1),
        default_content: json!({ "email": null, "phone": null, "address": null }),
    }
}

/// Starter template for restaurants: home, menu, gallery, contact.
pub fn restaurant() -> Result<Preset> {
    Preset::new(
        "restaurant-v1",
        "Ristorante",
        "restaurant",
        vec![
            rich_text_page("home", "Benvenuti"),
            PageDefinition {
                slug: "menu".into(),
                component_key: "MenuGuide".into(),
                content_schema: content_schema_for::<MenuContent>(1),
                default_content: json!({ "recipes": [] }),
            },
            gallery_page(),
            contact_page(),
        ],
    )
}

/// Starter template for craftsman businesses: home, portfolio gallery,
/// services, contact.
pub fn craftsman() -> Result<Preset> {
    Preset::new(
        "craftsman-v1",
        "Artigiano",
        "craftsman",
        vec![
            rich_text_page("home", "Benvenuti"),
            gallery_page(),
            rich_text_page("servizi", "I nostri servizi"),
            contact_page(),
        ],
    )
}

/// Starter template for generic companies: home, about, contact.
pub fn company() -> Result<Preset> {
    Preset::new(
        "company-v1",
        "Azienda",
        "company",
        vec![
            rich_text_page("home", "Benvenuti"),
            rich_text_page("chi-siamo", "Chi siamo"),
            contact_page(),
        ],
    )
}

/// All starter presets, in the order they are offered to operators.
pub fn all() -> Result<Vec<Preset>> {
    Ok(vec![restaurant()?, craftsman()?, company()?])
}
