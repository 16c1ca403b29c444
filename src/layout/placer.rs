//! # Tile Placer
//!
//! Pure footprint selection: given one element (an item, a section header, a
//! divider, a static element), produce the tile content payload plus the
//! grid footprint the template's content budget declares for it. No runtime
//! text measurement happens anywhere; the budget numbers are trusted.
//!
//! Item tiles pick between the image-bearing card variant and the text-only
//! row variant based on the global text-only selection and per-item
//! overrides. An item without an image still reserves the card footprint
//! when the template expects cards: the absence of an image never changes
//! slot geometry, only rendering.

use crate::document::{Layer, TileContent};
use crate::menu::{MenuItem, Section};
use crate::template::{StaticKind, Template, TileBudget};
use crate::Selection;

/// A content-typed tile instance before it gets pixel coordinates: grid
/// footprint, fixed pixel height, and the render payload.
#[derive(Debug, Clone)]
pub struct TileFootprint {
    pub rows: usize,
    pub cols: usize,
    pub height: f64,
    pub layer: Layer,
    pub content: TileContent,
}

fn footprint(budget: &TileBudget, grid_cols: usize, layer: Layer, content: TileContent) -> TileFootprint {
    TileFootprint {
        rows: budget.rows,
        cols: budget.col_span(grid_cols),
        height: budget.height,
        layer,
        content,
    }
}

/// Whether this item renders as a text row under the current selection.
pub fn renders_as_text_row(item: &MenuItem, selection: &Selection) -> bool {
    selection.text_only || selection.item_text_only.contains(&item.id)
}

/// Footprint and payload for one item.
pub fn item_footprint(
    item: &MenuItem,
    section_id: &str,
    currency: &str,
    template: &Template,
    selection: &Selection,
) -> TileFootprint {
    if renders_as_text_row(item, selection) {
        footprint(
            &template.budgets.item_text_row,
            template.grid.cols,
            Layer::Content,
            TileContent::ItemTextRow {
                item_id: item.id.clone(),
                section_id: section_id.to_string(),
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                currency: currency.to_string(),
                indicators: item.indicators.clone(),
            },
        )
    } else {
        footprint(
            &template.budgets.item_card,
            template.grid.cols,
            Layer::Content,
            TileContent::ItemCard {
                item_id: item.id.clone(),
                section_id: section_id.to_string(),
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                currency: currency.to_string(),
                show_image: item.image_url.is_some(),
                image_url: item.image_url.clone(),
                indicators: item.indicators.clone(),
            },
        )
    }
}

/// Footprint and payload for a section header. `continuation` selects the
/// repeated-header variant used when the section spans a page break.
pub fn section_header_footprint(
    section: &Section,
    continuation: bool,
    template: &Template,
) -> TileFootprint {
    footprint(
        &template.budgets.section_header,
        template.grid.cols,
        Layer::Content,
        TileContent::SectionHeader {
            section_id: section.id.clone(),
            label: section.name.clone(),
            continuation,
        },
    )
}

/// Footprint for the decorative divider placed between sections.
pub fn divider_footprint(template: &Template) -> TileFootprint {
    footprint(
        &template.budgets.divider,
        template.grid.cols,
        Layer::Background,
        TileContent::DecorativeDivider,
    )
}

/// Payload and pixel height for the menu title tile (region-anchored, no
/// grid footprint).
pub fn title_tile(menu_name: &str, template: &Template) -> (TileContent, f64) {
    (
        TileContent::Title {
            text: menu_name.to_string(),
        },
        template.budgets.title.height,
    )
}

/// Payload and pixel height for the venue logo tile.
pub fn logo_tile(logo_url: &str, template: &Template) -> (TileContent, f64) {
    (
        TileContent::Logo {
            url: logo_url.to_string(),
        },
        template.budgets.logo.height,
    )
}

/// Payload, pixel height, and layer for a template-declared static element.
pub fn static_tile(kind: &StaticKind, template: &Template) -> (TileContent, f64, Layer) {
    match kind {
        StaticKind::TextBlock { text } => (
            TileContent::TextBlock { text: text.clone() },
            template.budgets.text_block.height,
            Layer::Content,
        ),
        StaticKind::Spacer => (
            TileContent::Spacer,
            template.budgets.spacer.height,
            Layer::Background,
        ),
    }
}
