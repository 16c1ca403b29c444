//! # Layout Document
//!
//! The output model: a tree of pages, each holding absolutely-positioned
//! tiles inside resolved page regions. This is the sole externally-visible
//! artifact of the engine and is immutable once returned; downstream
//! renderers (web preview, PDF export) consume it as plain data.
//!
//! Tile content is a closed sum type matched exhaustively throughout the
//! crate: adding a tile kind means extending the enum and every match site,
//! which the compiler enforces.

use serde::{Deserialize, Serialize};

use crate::menu::Indicators;
use crate::template::PageSpec;

/// The finished, paginated layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    pub template_id: String,
    pub template_version: String,
    pub page_spec: PageSpec,
    pub pages: Vec<Page>,
}

impl LayoutDocument {
    /// Count of item tiles (cards and text rows) across all pages.
    pub fn item_tile_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| &p.tiles)
            .filter(|t| {
                matches!(
                    t.content,
                    TileContent::ItemCard { .. } | TileContent::ItemTextRow { .. }
                )
            })
            .count()
    }
}

/// Position of a page within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageType {
    First,
    Continuation,
    Final,
    /// The whole menu fits on one page.
    Single,
}

/// One page: resolved region geometry plus the tiles placed on it.
///
/// Pages are created and owned solely by the paginator; the filler pass may
/// only append tiles to an existing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_index: usize,
    pub page_type: PageType,
    pub regions: Vec<Region>,
    pub tiles: Vec<Tile>,
}

impl Page {
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn tiles_in_region<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Tile> {
        self.tiles.iter().filter(move |t| t.region_id == id)
    }
}

/// A resolved page region rectangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Overlap rules distinguish decorative background tiles from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Layer {
    Content,
    Background,
}

/// An absolutely-positioned tile. Grid coordinates are meaningful only for
/// body tiles; tiles in fixed regions carry zeroed grid fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    pub region_id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub grid_row: usize,
    pub grid_col: usize,
    pub row_span: usize,
    pub col_span: usize,
    pub layer: Layer,
    pub content: TileContent,
}

impl Tile {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Standard separating-axis test: not overlapping iff one rectangle is
    /// entirely left/right/above/below the other.
    pub fn overlaps(&self, other: &Tile) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }
}

/// The closed set of tile payloads. Each variant carries only the data a
/// renderer needs for that tile kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileContent {
    Title {
        text: String,
    },
    Logo {
        url: String,
    },
    SectionHeader {
        section_id: String,
        label: String,
        /// Set on headers re-emitted when a section spans a page break, so
        /// renderers can show a "continued" label variant.
        continuation: bool,
    },
    ItemCard {
        item_id: String,
        section_id: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        price: f64,
        currency: String,
        /// False when the item has no image; the footprint is unchanged and
        /// fallback artwork is the renderer's concern.
        show_image: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        indicators: Indicators,
    },
    ItemTextRow {
        item_id: String,
        section_id: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        price: f64,
        currency: String,
        indicators: Indicators,
    },
    Filler {
        variant: String,
    },
    TextBlock {
        text: String,
    },
    DecorativeDivider,
    Spacer,
}

impl TileContent {
    /// The `sectionId` an item or header tile belongs to, if any. Item tiles
    /// record it so filler confinement and orphan checks can group by
    /// section.
    pub fn section_id(&self) -> Option<&str> {
        match self {
            TileContent::SectionHeader { section_id, .. }
            | TileContent::ItemCard { section_id, .. }
            | TileContent::ItemTextRow { section_id, .. } => Some(section_id),
            _ => None,
        }
    }

    /// True for item-shaped tiles (cards and text rows).
    pub fn is_item(&self) -> bool {
        matches!(
            self,
            TileContent::ItemCard { .. } | TileContent::ItemTextRow { .. }
        )
    }
}
