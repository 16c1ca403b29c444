//! # Invariant Validator
//!
//! A read-only auditor over a finished document. It re-walks every page and
//! asserts the structural guarantees the paginator and filler manager are
//! supposed to uphold: tiles stay inside their regions, content never
//! overlaps content, no section header is stranded without its items, and
//! item tiles only ever live in the body.
//!
//! The validator never mutates the document. Production callers may skip it
//! for speed; whenever the validation flag is set, any non-empty violation
//! list is a fatal [`crate::CartaError::InvariantViolation`], never a
//! silent downgrade.

use std::fmt;

use serde::Serialize;

use crate::document::{Layer, LayoutDocument, Page, TileContent};
use crate::template::BODY_REGION;

/// Positional slack for bounds checks, absorbing accumulated float error.
const EPSILON: f64 = 0.01;

/// Category of a structural violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    OutOfBounds,
    ContentOverlap,
    OrphanHeader,
    RegionMismatch,
}

/// One structural violation: what broke, where, and which tiles did it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub code: ViolationCode,
    pub message: String,
    pub tile_ids: Vec<String>,
    pub page_index: usize,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] page {}: {} ({})",
            self.code,
            self.page_index,
            self.message,
            self.tile_ids.join(", ")
        )
    }
}

/// Audit a finished document. Returns every violation found; an empty list
/// means the document satisfies all structural guarantees.
pub fn validate(doc: &LayoutDocument) -> Vec<Violation> {
    let mut violations = vec![];
    for page in &doc.pages {
        check_bounds(page, &mut violations);
        check_overlap(page, &mut violations);
        check_orphan_headers(page, &mut violations);
        check_region_discipline(page, &mut violations);
    }
    violations
}

/// Every tile's pixel rectangle must lie within its declared region.
fn check_bounds(page: &Page, out: &mut Vec<Violation>) {
    for tile in &page.tiles {
        let Some(region) = page.region(&tile.region_id) else {
            out.push(Violation {
                code: ViolationCode::OutOfBounds,
                message: format!("tile references unknown region \"{}\"", tile.region_id),
                tile_ids: vec![tile.id.clone()],
                page_index: page.page_index,
            });
            continue;
        };
        let inside = tile.x >= region.x - EPSILON
            && tile.y >= region.y - EPSILON
            && tile.right() <= region.x + region.width + EPSILON
            && tile.bottom() <= region.y + region.height + EPSILON;
        if !inside {
            out.push(Violation {
                code: ViolationCode::OutOfBounds,
                message: format!(
                    "tile rect ({:.1}, {:.1}, {:.1}, {:.1}) escapes region \"{}\"",
                    tile.x, tile.y, tile.width, tile.height, tile.region_id
                ),
                tile_ids: vec![tile.id.clone()],
                page_index: page.page_index,
            });
        }
    }
}

/// Overlap between two tiles sharing a region is legal only when at least
/// one of them is on the background layer.
fn check_overlap(page: &Page, out: &mut Vec<Violation>) {
    for (i, a) in page.tiles.iter().enumerate() {
        for b in page.tiles.iter().skip(i + 1) {
            if a.region_id != b.region_id {
                continue;
            }
            if a.layer == Layer::Background || b.layer == Layer::Background {
                continue;
            }
            if a.overlaps(b) {
                out.push(Violation {
                    code: ViolationCode::ContentOverlap,
                    message: "content tiles overlap".to_string(),
                    tile_ids: vec![a.id.clone(), b.id.clone()],
                    page_index: page.page_index,
                });
            }
        }
    }
}

/// A section header must have at least one item of its own section placed
/// strictly below it on the same page.
fn check_orphan_headers(page: &Page, out: &mut Vec<Violation>) {
    for tile in &page.tiles {
        let TileContent::SectionHeader { section_id, .. } = &tile.content else {
            continue;
        };
        let followed = page.tiles.iter().any(|other| {
            other.content.is_item()
                && other.content.section_id() == Some(section_id.as_str())
                && other.y > tile.y
        });
        if !followed {
            out.push(Violation {
                code: ViolationCode::OrphanHeader,
                message: format!("section header \"{section_id}\" has no items below it"),
                tile_ids: vec![tile.id.clone()],
                page_index: page.page_index,
            });
        }
    }
}

/// Item tiles belong to the body region, nowhere else.
fn check_region_discipline(page: &Page, out: &mut Vec<Violation>) {
    for tile in &page.tiles {
        if tile.content.is_item() && tile.region_id != BODY_REGION {
            out.push(Violation {
                code: ViolationCode::RegionMismatch,
                message: format!(
                    "item tile placed in region \"{}\" instead of \"{BODY_REGION}\"",
                    tile.region_id
                ),
                tile_ids: vec![tile.id.clone()],
                page_index: page.page_index,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Layer, Page, PageType, Region, Tile, TileContent};
    use crate::menu::Indicators;
    use crate::template::PageSpec;

    fn body_region() -> Region {
        Region {
            id: "body".to_string(),
            x: 0.0,
            y: 0.0,
            width: 600.0,
            height: 800.0,
        }
    }

    fn tile(id: &str, x: f64, y: f64, layer: Layer, content: TileContent) -> Tile {
        Tile {
            id: id.to_string(),
            region_id: "body".to_string(),
            x,
            y,
            width: 100.0,
            height: 100.0,
            grid_row: 0,
            grid_col: 0,
            row_span: 1,
            col_span: 1,
            layer,
            content,
        }
    }

    fn header(id: &str, section: &str, y: f64) -> Tile {
        tile(
            id,
            0.0,
            y,
            Layer::Content,
            TileContent::SectionHeader {
                section_id: section.to_string(),
                label: "Mains".to_string(),
                continuation: false,
            },
        )
    }

    fn item(id: &str, section: &str, x: f64, y: f64) -> Tile {
        tile(
            id,
            x,
            y,
            Layer::Content,
            TileContent::ItemTextRow {
                item_id: id.to_string(),
                section_id: section.to_string(),
                name: "Soup".to_string(),
                description: None,
                price: 5.0,
                currency: "USD".to_string(),
                indicators: Indicators::default(),
            },
        )
    }

    fn doc_with_tiles(tiles: Vec<Tile>) -> LayoutDocument {
        LayoutDocument {
            template_id: "t".to_string(),
            template_version: "1".to_string(),
            page_spec: PageSpec::default(),
            pages: vec![Page {
                page_index: 0,
                page_type: PageType::Single,
                regions: vec![body_region()],
                tiles,
            }],
        }
    }

    #[test]
    fn clean_page_passes() {
        let doc = doc_with_tiles(vec![header("h", "c1", 0.0), item("i", "c1", 0.0, 120.0)]);
        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn out_of_bounds_detected() {
        let doc = doc_with_tiles(vec![item("i", "c1", 550.0, 0.0)]);
        let violations = validate(&doc);
        assert!(violations
            .iter()
            .any(|v| v.code == ViolationCode::OutOfBounds));
    }

    #[test]
    fn content_overlap_detected() {
        let doc = doc_with_tiles(vec![item("a", "c1", 0.0, 0.0), item("b", "c1", 50.0, 50.0)]);
        let violations = validate(&doc);
        assert!(violations
            .iter()
            .any(|v| v.code == ViolationCode::ContentOverlap));
    }

    #[test]
    fn background_overlap_allowed() {
        let filler = tile(
            "f",
            50.0,
            50.0,
            Layer::Background,
            TileContent::Filler {
                variant: "half-opacity-block".to_string(),
            },
        );
        let doc = doc_with_tiles(vec![item("a", "c1", 0.0, 0.0), filler]);
        let violations = validate(&doc);
        assert!(!violations
            .iter()
            .any(|v| v.code == ViolationCode::ContentOverlap));
    }

    #[test]
    fn orphan_header_detected() {
        let doc = doc_with_tiles(vec![header("h", "c1", 700.0)]);
        let violations = validate(&doc);
        assert!(violations
            .iter()
            .any(|v| v.code == ViolationCode::OrphanHeader));
    }

    #[test]
    fn header_with_item_of_other_section_is_still_orphaned() {
        let doc = doc_with_tiles(vec![
            header("h", "c1", 0.0),
            item("i", "c2", 0.0, 120.0),
            // c2's own header with its item, so only c1's header is orphaned.
            header("h2", "c2", 110.0),
        ]);
        let violations = validate(&doc);
        let orphaned: Vec<_> = violations
            .iter()
            .filter(|v| v.code == ViolationCode::OrphanHeader)
            .collect();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].tile_ids, vec!["h".to_string()]);
    }

    #[test]
    fn item_outside_body_detected() {
        let mut bad = item("i", "c1", 0.0, 0.0);
        bad.region_id = "footer".to_string();
        let mut doc = doc_with_tiles(vec![bad]);
        doc.pages[0].regions.push(Region {
            id: "footer".to_string(),
            x: 0.0,
            y: 800.0,
            width: 600.0,
            height: 100.0,
        });
        doc.pages[0].tiles[0].y = 800.0;
        let violations = validate(&doc);
        assert!(violations
            .iter()
            .any(|v| v.code == ViolationCode::RegionMismatch));
    }
}
