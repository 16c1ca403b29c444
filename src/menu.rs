//! # Menu Model & Normalizer
//!
//! The input representation for the layout engine. A menu is an ordered tree
//! of sections containing priced items, designed to be easily produced by a
//! POS export, a CMS, or direct JSON construction.
//!
//! The normalizer converts a raw [`Menu`] into an [`EngineMenu`]: sections
//! and items re-sorted by `sortOrder` (ties keep input order), indicator
//! defaults filled in, and a single implicit section substituted when the
//! menu has no categories at all. Empty sections survive normalization so
//! header accounting stays correct; the paginator skips them for placement.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CartaError;

/// A complete raw menu ready for normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub metadata: MenuMetadata,

    /// Ordered sections. May be empty, in which case the top-level `items`
    /// form one implicit section named "Menu".
    #[serde(default)]
    pub categories: Vec<Category>,

    /// Uncategorized items; only consulted when `categories` is empty.
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Venue-level metadata carried through to title and logo tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMetadata {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Default for MenuMetadata {
    fn default() -> Self {
        MenuMetadata {
            currency: default_currency(),
            venue_name: None,
            logo_url: None,
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// A named group of items with a stable sort position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// A single priced item. Immutable once handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Non-negative price in the menu's currency.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub indicators: Indicators,
}

/// Dietary/allergen markers and spice level for an item.
///
/// Sets are ordered so serialized output is byte-stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicators {
    #[serde(default)]
    pub dietary: BTreeSet<String>,
    #[serde(default)]
    pub allergens: BTreeSet<String>,
    /// 0..=3, or absent when the item has no spice rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<u8>,
}

// ─── Normalized tree ────────────────────────────────────────────────

/// The validated, ordered menu tree the rest of the pipeline consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMenu {
    pub id: String,
    pub name: String,
    pub metadata: MenuMetadata,
    /// At least one section, sorted by `sortOrder`.
    pub sections: Vec<Section>,
}

/// A normalized section. Items are sorted by `sortOrder`. A section may be
/// empty; the paginator skips it for placement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub sort_order: i32,
    pub items: Vec<MenuItem>,
}

impl EngineMenu {
    /// Total item count across all sections.
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// Fraction of items carrying an image URL, 0.0 when the menu is empty.
    pub fn image_fraction(&self) -> f64 {
        let total = self.total_items();
        if total == 0 {
            return 0.0;
        }
        let with_image = self
            .sections
            .iter()
            .flat_map(|s| &s.items)
            .filter(|i| i.image_url.is_some())
            .count();
        with_image as f64 / total as f64
    }
}

// ─── Normalization ──────────────────────────────────────────────────

/// Normalize a raw menu into an [`EngineMenu`].
///
/// Fails with [`CartaError::MenuValidation`] when a required field is missing
/// or malformed; validation runs before any placement so a failure is never
/// partially applied.
pub fn normalize(menu: &Menu) -> Result<EngineMenu, CartaError> {
    if menu.id.trim().is_empty() {
        return Err(CartaError::MenuValidation("menu id must not be empty".into()));
    }
    if menu.name.trim().is_empty() {
        return Err(CartaError::MenuValidation("menu name must not be empty".into()));
    }

    let mut sections: Vec<Section> = if menu.categories.is_empty() {
        // No categories: substitute one implicit section holding the loose items.
        vec![Section {
            id: format!("{}-menu", menu.id),
            name: "Menu".to_string(),
            sort_order: 0,
            items: menu.items.clone(),
        }]
    } else {
        menu.categories
            .iter()
            .map(|c| {
                if c.id.trim().is_empty() {
                    return Err(CartaError::MenuValidation(format!(
                        "category \"{}\" has an empty id",
                        c.name
                    )));
                }
                if c.name.trim().is_empty() {
                    return Err(CartaError::MenuValidation(format!(
                        "category {} has an empty name",
                        c.id
                    )));
                }
                Ok(Section {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    sort_order: c.sort_order,
                    items: c.items.clone(),
                })
            })
            .collect::<Result<_, _>>()?
    };

    for section in &mut sections {
        for item in &section.items {
            validate_item(item, &section.name)?;
        }
        // Stable sort: equal sortOrder keeps input order.
        section.items.sort_by_key(|i| i.sort_order);
    }
    sections.sort_by_key(|s| s.sort_order);

    Ok(EngineMenu {
        id: menu.id.clone(),
        name: menu.name.clone(),
        metadata: menu.metadata.clone(),
        sections,
    })
}

fn validate_item(item: &MenuItem, section_name: &str) -> Result<(), CartaError> {
    if item.id.trim().is_empty() {
        return Err(CartaError::MenuValidation(format!(
            "item \"{}\" in section \"{}\" has an empty id",
            item.name, section_name
        )));
    }
    if item.name.trim().is_empty() {
        return Err(CartaError::MenuValidation(format!(
            "item {} in section \"{}\" has an empty name",
            item.id, section_name
        )));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(CartaError::MenuValidation(format!(
            "item {} has an invalid price {}",
            item.id, item.price
        )));
    }
    if let Some(level) = item.indicators.spice_level {
        if level > 3 {
            return Err(CartaError::MenuValidation(format!(
                "item {} has spice level {} (expected 0..=3)",
                item.id, level
            )));
        }
    }
    Ok(())
}
