//! # Streaming Paginator
//!
//! This is the heart of Carta and the reason it exists.
//!
//! The engine never lays a menu out on an infinite canvas and slices it
//! afterwards. The paginator walks the normalized menu in order, asks the
//! tile placer for each element's footprint, and advances a cursor through
//! the current page's body grid:
//!
//! 1. Headers always start a fresh row; a mid-row cursor forces a row
//!    advance first.
//! 2. A header is only placed when its keep-with quota of items also fits
//!    below it on the same page; otherwise the whole group moves to a new
//!    page (orphan avoidance).
//! 3. An item that does not fit the remaining row width wraps to the next
//!    row; one that does not fit the remaining page height opens a new page,
//!    re-emitting a continuation header when the template asks for it.
//! 4. New pages are built from the template's continuation geometry, and
//!    sticky elements (title, logo, all-pages statics) from page 0 are
//!    cloned onto them with new ids and verbatim footprints.
//!
//! After all sections are placed the last row of each page is optionally
//! centered, unless fillers are enabled for the run (fillers claim those
//! empty cells instead, so the two features never fight over the same gap).

pub mod filler;
pub mod placer;
pub mod rng;

use tracing::trace;

use crate::document::{Layer, Page, PageType, Region, Tile, TileContent};
use crate::error::CartaError;
use crate::menu::{EngineMenu, Section};
use crate::template::{BalancingMode, PageScope, PageSpec, Template, BODY_REGION};
use crate::Selection;

use filler::RowPlan;
use placer::TileFootprint;
use rng::{filler_seed, SeededRng};

/// Everything one pagination run needs. Built by the facade after the
/// capacity gate has passed.
pub(crate) struct PaginationInput<'a> {
    pub menu: &'a EngineMenu,
    pub template: &'a Template,
    pub selection: &'a Selection,
    pub page_spec: &'a PageSpec,
    /// Item-tile ceiling from the capacity evaluator's `maximum`.
    pub max_item_tiles: usize,
    /// Whether the filler pass will run afterwards; suppresses balancing and
    /// enables interspersed slot planning.
    pub fillers_active: bool,
}

/// Pixel math for one page's body grid.
#[derive(Debug, Clone)]
pub(crate) struct GridGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub col_width: f64,
    pub row_height: f64,
    pub gap_x: f64,
    pub gap_y: f64,
    pub cols: usize,
    pub rows: usize,
}

impl GridGeometry {
    pub fn for_body(body: &Region, template: &Template) -> Self {
        let grid = &template.grid;
        GridGeometry {
            origin_x: body.x,
            origin_y: body.y,
            col_width: grid.col_width(body.width),
            row_height: grid.row_height,
            gap_x: grid.gap_x,
            gap_y: grid.gap_y,
            cols: grid.cols,
            rows: grid.rows_in(body.height),
        }
    }

    pub fn cell_x(&self, col: usize) -> f64 {
        self.origin_x + col as f64 * (self.col_width + self.gap_x)
    }

    pub fn cell_y(&self, row: usize) -> f64 {
        self.origin_y + row as f64 * (self.row_height + self.gap_y)
    }

    pub fn span_width(&self, cols: usize) -> f64 {
        cols as f64 * self.col_width + cols.saturating_sub(1) as f64 * self.gap_x
    }

    pub fn span_height(&self, rows: usize) -> f64 {
        rows as f64 * self.row_height + rows.saturating_sub(1) as f64 * self.gap_y
    }
}

/// Tracks where we are on the current page during pagination.
struct PageCursor {
    page_index: usize,
    regions: Vec<Region>,
    geom: GridGeometry,
    /// Body rows available for content on this page.
    usable_rows: usize,
    row: usize,
    col: usize,
    /// Tallest rowSpan placed in the row in progress; rows advance by it.
    row_max_span: usize,
    tiles: Vec<Tile>,
}

impl PageCursor {
    fn remaining_rows(&self) -> usize {
        self.usable_rows.saturating_sub(self.row)
    }

    fn finalize(self) -> Page {
        Page {
            page_index: self.page_index,
            // Corrected in one pass once the page count is known.
            page_type: PageType::Continuation,
            regions: self.regions,
            tiles: self.tiles,
        }
    }
}

struct Paginator<'a> {
    input: PaginationInput<'a>,
    pages: Vec<Page>,
    cursor: PageCursor,
    /// Page-0 region tiles that replicate onto continuation pages.
    sticky: Vec<Tile>,
    placed_items: usize,
    divider_seq: usize,
    capacity_reached: bool,
}

/// Lay the menu out into pages. The capacity gate has already passed; this
/// only fails on structural template problems.
pub(crate) fn paginate(input: PaginationInput<'_>) -> Result<Vec<Page>, CartaError> {
    let template = input.template;

    if let Some(required) = template.limits.required_section_slots {
        let available = input.menu.sections.len();
        if available < required {
            return Err(CartaError::Generation(format!(
                "template requires {required} section slots but the menu supplies {available}"
            )));
        }
    }

    let mut paginator = Paginator::new(input)?;
    paginator.check_item_slots()?;
    paginator.run()?;
    Ok(paginator.finish())
}

impl<'a> Paginator<'a> {
    fn new(input: PaginationInput<'a>) -> Result<Self, CartaError> {
        let cursor = open_cursor(&input, 0, false, &[])?;
        let sticky = sticky_tiles(&input, &cursor.tiles);
        Ok(Paginator {
            input,
            pages: vec![],
            cursor,
            sticky,
            placed_items: 0,
            divider_seq: 0,
            capacity_reached: false,
        })
    }

    /// A template through which no item can ever be placed is malformed.
    fn check_item_slots(&self) -> Result<(), CartaError> {
        if self.input.menu.total_items() == 0 {
            return Ok(());
        }
        let template = self.input.template;
        let budget = if self.input.selection.text_only {
            &template.budgets.item_text_row
        } else {
            &template.budgets.item_card
        };
        let per_row = template.grid.cols / budget.col_span(template.grid.cols);
        let fresh_rows = template.body_rows(self.input.page_spec, true);
        let usable = if template.policies.reserve_footer_row {
            fresh_rows.saturating_sub(1)
        } else {
            fresh_rows
        };
        if per_row == 0 || usable < budget.rows {
            return Err(CartaError::Generation(
                "template provides zero item-capable tile slots".to_string(),
            ));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), CartaError> {
        let sections: Vec<&Section> = self
            .input
            .menu
            .sections
            .iter()
            .filter(|s| !s.items.is_empty())
            .collect();

        for (index, section) in sections.iter().enumerate() {
            if self.capacity_reached {
                break;
            }
            if index > 0 && self.input.template.policies.divider_between_sections {
                self.place_divider()?;
            }
            self.place_section(section)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.cursor.finalize());

        let count = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.page_type = if count == 1 {
                PageType::Single
            } else if i == 0 {
                PageType::First
            } else if i == count - 1 {
                PageType::Final
            } else {
                PageType::Continuation
            };
        }

        if !self.input.fillers_active {
            balance_last_rows(&mut self.pages, self.input.template);
        }
        self.pages
    }

    // ── Section placement ───────────────────────────────────────────

    fn place_section(&mut self, section: &Section) -> Result<(), CartaError> {
        let template = self.input.template;

        // Headers always start a fresh row.
        if self.cursor.col > 0 {
            self.advance_row();
        }

        let header = placer::section_header_footprint(section, false, template);
        let keep = template
            .policies
            .header_keep_with
            .min(section.items.len())
            .max(1);
        let mut need = header.rows + self.rows_for_items(section, keep);
        let fresh = self.fresh_page_rows();
        if need > fresh {
            // The keep-with quota can never be met on any page; fall back to
            // keeping a single item so deferral cannot loop.
            need = header.rows + self.rows_for_items(section, 1);
        }
        if need > self.cursor.remaining_rows() {
            self.open_new_page(None)?;
        }

        let header_id = format!("header-{}", section.id);
        self.place_row_tile(header, header_id)?;

        let plan = self.interspersed_plan(section);
        match plan {
            Some(rows) => self.place_planned_items(section, &rows),
            None => self.place_flowing_items(section),
        }
    }

    /// Left-packed streaming placement, the default flow.
    fn place_flowing_items(&mut self, section: &Section) -> Result<(), CartaError> {
        let template = self.input.template;
        let currency = &self.input.menu.metadata.currency;

        for item in &section.items {
            if self.placed_items >= self.input.max_item_tiles {
                self.capacity_reached = true;
                return Ok(());
            }
            let fp = placer::item_footprint(item, &section.id, currency, template, self.input.selection);
            if fp.cols > self.cursor.geom.cols {
                return Err(CartaError::Generation(format!(
                    "item footprint spans {} columns on a {}-column grid",
                    fp.cols, self.cursor.geom.cols
                )));
            }

            if self.cursor.col + fp.cols > self.cursor.geom.cols {
                self.advance_row();
            }
            if self.cursor.row + fp.rows > self.cursor.usable_rows {
                self.open_new_page(Some(section))?;
                if self.cursor.row + fp.rows > self.cursor.usable_rows {
                    return Err(CartaError::Generation(
                        "item footprint exceeds the page's body capacity".to_string(),
                    ));
                }
            }

            let (rows, cols) = (fp.rows, fp.cols);
            let id = format!("item-{}", item.id);
            self.push_body_tile(fp, id, self.cursor.row, self.cursor.col);
            self.cursor.row_max_span = self.cursor.row_max_span.max(rows);
            self.cursor.col += cols;
            if self.cursor.col >= self.cursor.geom.cols {
                self.advance_row();
            }
            self.placed_items += 1;
        }
        Ok(())
    }

    /// Interspersed-mode placement: each planned row pins its items to
    /// pre-computed columns, leaving spread-out gaps for the filler pass.
    fn place_planned_items(&mut self, section: &Section, plan: &[RowPlan]) -> Result<(), CartaError> {
        let template = self.input.template;
        let currency = &self.input.menu.metadata.currency;
        let mut items = section.items.iter();

        for row_plan in plan {
            if self.cursor.col > 0 {
                self.advance_row();
            }
            let row_items: Vec<_> = items.by_ref().take(row_plan.item_cols.len()).collect();
            if row_items.is_empty() {
                break;
            }
            let footprints: Vec<TileFootprint> = row_items
                .iter()
                .map(|item| {
                    placer::item_footprint(item, &section.id, currency, template, self.input.selection)
                })
                .collect();
            let row_height = footprints.iter().map(|f| f.rows).max().unwrap_or(1);

            if self.cursor.row + row_height > self.cursor.usable_rows {
                self.open_new_page(Some(section))?;
                if self.cursor.row + row_height > self.cursor.usable_rows {
                    return Err(CartaError::Generation(
                        "item footprint exceeds the page's body capacity".to_string(),
                    ));
                }
            }

            for (slot, (item, fp)) in row_items.iter().zip(footprints).enumerate() {
                if self.placed_items >= self.input.max_item_tiles {
                    self.capacity_reached = true;
                    return Ok(());
                }
                let col = row_plan.item_cols[slot];
                let id = format!("item-{}", item.id);
                self.push_body_tile(fp, id, self.cursor.row, col);
                self.placed_items += 1;
            }
            self.cursor.row += row_height;
            self.cursor.col = 0;
            self.cursor.row_max_span = 0;
        }
        Ok(())
    }

    /// Column plan for a section when interspersed fillers are active.
    fn interspersed_plan(&self, section: &Section) -> Option<Vec<RowPlan>> {
        use crate::template::FillerMode;
        let template = self.input.template;
        if !self.input.fillers_active || template.fillers.mode != FillerMode::Interspersed {
            return None;
        }
        let mut rng = SeededRng::new(filler_seed(
            &self.input.menu.id,
            &template.id,
            0,
            Some(&section.id),
        ));
        Some(filler::section_slot_plan(
            template.grid.cols,
            section.items.len(),
            &mut rng,
        ))
    }

    fn place_divider(&mut self) -> Result<(), CartaError> {
        if self.cursor.col > 0 {
            self.advance_row();
        }
        let fp = placer::divider_footprint(self.input.template);
        if self.cursor.row + fp.rows > self.cursor.usable_rows {
            self.open_new_page(None)?;
        }
        let id = format!("divider-{}", self.divider_seq);
        self.divider_seq += 1;
        self.place_row_tile(fp, id)
    }

    /// Place a full-row element (header, divider) at column 0 and consume
    /// its rows outright.
    fn place_row_tile(&mut self, fp: TileFootprint, id: String) -> Result<(), CartaError> {
        let rows = fp.rows;
        self.push_body_tile(fp, id, self.cursor.row, 0);
        self.cursor.row += rows;
        self.cursor.col = 0;
        self.cursor.row_max_span = 0;
        Ok(())
    }

    fn push_body_tile(&mut self, fp: TileFootprint, id: String, row: usize, col: usize) {
        let geom = &self.cursor.geom;
        self.cursor.tiles.push(Tile {
            id,
            region_id: BODY_REGION.to_string(),
            x: geom.cell_x(col),
            y: geom.cell_y(row),
            width: geom.span_width(fp.cols),
            height: fp.height,
            grid_row: row,
            grid_col: col,
            row_span: fp.rows,
            col_span: fp.cols,
            layer: fp.layer,
            content: fp.content,
        });
    }

    // ── Cursor movement ─────────────────────────────────────────────

    fn advance_row(&mut self) {
        self.cursor.row += self.cursor.row_max_span.max(1);
        self.cursor.col = 0;
        self.cursor.row_max_span = 0;
    }

    /// How many body rows `count` leading items of this section will take,
    /// packed the way the flow will pack them.
    fn rows_for_items(&self, section: &Section, count: usize) -> usize {
        let template = self.input.template;
        let currency = &self.input.menu.metadata.currency;
        let cols = template.grid.cols;
        let mut rows = 0;
        let mut col = 0;
        let mut span = 0;
        for item in section.items.iter().take(count) {
            let fp = placer::item_footprint(item, &section.id, currency, template, self.input.selection);
            if col + fp.cols > cols {
                rows += span.max(1);
                col = 0;
                span = 0;
            }
            span = span.max(fp.rows);
            col += fp.cols;
        }
        rows + span
    }

    fn fresh_page_rows(&self) -> usize {
        let template = self.input.template;
        let rows = template.body_rows(self.input.page_spec, true);
        if template.policies.reserve_footer_row {
            rows.saturating_sub(1)
        } else {
            rows
        }
    }

    // ── Page transitions ────────────────────────────────────────────

    fn open_new_page(&mut self, continuing: Option<&Section>) -> Result<(), CartaError> {
        let next_index = self.cursor.page_index + 1;
        trace!(page = next_index, "opening continuation page");

        let finished = std::mem::replace(
            &mut self.cursor,
            open_cursor(&self.input, next_index, true, &self.sticky)?,
        );
        self.pages.push(finished.finalize());

        if let Some(section) = continuing {
            if self.input.template.policies.repeat_section_headers {
                let fp = placer::section_header_footprint(section, true, self.input.template);
                let id = format!("header-{}-p{}", section.id, self.cursor.page_index);
                self.place_row_tile(fp, id)?;
            }
        }
        Ok(())
    }
}

/// Build the cursor for one page: resolve regions, compute grid geometry,
/// and place the page's region tiles (title/logo/statics on the first page,
/// sticky clones on continuations).
fn open_cursor(
    input: &PaginationInput<'_>,
    page_index: usize,
    continuation: bool,
    sticky: &[Tile],
) -> Result<PageCursor, CartaError> {
    let template = input.template;
    let regions = template.resolve_regions(input.page_spec, continuation);
    let body = regions
        .iter()
        .find(|r| r.id == BODY_REGION)
        .cloned()
        .ok_or_else(|| CartaError::Generation("template has no body region".to_string()))?;
    let geom = GridGeometry::for_body(&body, template);
    let usable_rows = if template.policies.reserve_footer_row {
        geom.rows.saturating_sub(1)
    } else {
        geom.rows
    };

    let mut cursor = PageCursor {
        page_index,
        regions,
        geom,
        usable_rows,
        row: 0,
        col: 0,
        row_max_span: 0,
        tiles: vec![],
    };

    if continuation {
        // Sticky elements replicate with verbatim footprints and new ids;
        // the placer is not consulted again.
        for tile in sticky {
            if let Some(region) = cursor.regions.iter().find(|r| r.id == tile.region_id) {
                if region.height + 0.01 < tile.height {
                    continue;
                }
                let mut clone = tile.clone();
                clone.id = format!("{}-p{page_index}", tile.id);
                clone.x = region.x;
                clone.y = region.y;
                cursor.tiles.push(clone);
            }
        }
    } else {
        place_first_page_statics(input, &mut cursor);
    }

    Ok(cursor)
}

/// Title, logo, and template statics on page 0. The title goes in the
/// `title` region and the logo in the `header` region when those regions
/// exist; templates without them simply get no such tile.
fn place_first_page_statics(input: &PaginationInput<'_>, cursor: &mut PageCursor) {
    let template = input.template;

    let mut place = |id: String, region_id: &str, content: TileContent, height: f64, layer: Layer| {
        if let Some(region) = cursor.regions.iter().find(|r| r.id == region_id) {
            if region.height + 0.01 >= height && height > 0.0 {
                cursor.tiles.push(Tile {
                    id,
                    region_id: region_id.to_string(),
                    x: region.x,
                    y: region.y,
                    width: region.width,
                    height,
                    grid_row: 0,
                    grid_col: 0,
                    row_span: 0,
                    col_span: 0,
                    layer,
                    content,
                });
            }
        }
    };

    let (content, height) = placer::title_tile(&input.menu.name, template);
    place("title".to_string(), "title", content, height, Layer::Content);

    if let Some(logo_url) = &input.menu.metadata.logo_url {
        let (content, height) = placer::logo_tile(logo_url, template);
        place("logo".to_string(), "header", content, height, Layer::Content);
    }

    for (i, elem) in template.statics.iter().enumerate() {
        let (content, height, layer) = placer::static_tile(&elem.kind, template);
        place(format!("static-{i}"), &elem.region_id, content, height, layer);
    }
}

/// Page-0 tiles that replicate onto continuation pages per policy.
fn sticky_tiles(input: &PaginationInput<'_>, first_page_tiles: &[Tile]) -> Vec<Tile> {
    let policies = &input.template.policies;
    first_page_tiles
        .iter()
        .filter(|tile| match &tile.content {
            TileContent::Title { .. } => policies.sticky_title == PageScope::All,
            TileContent::Logo { .. } => policies.sticky_logo == PageScope::All,
            TileContent::TextBlock { .. } | TileContent::Spacer => {
                // Statics carry their own page scope.
                static_scope(input, tile) == Some(PageScope::All)
            }
            _ => false,
        })
        .cloned()
        .collect()
}

fn static_scope(input: &PaginationInput<'_>, tile: &Tile) -> Option<PageScope> {
    let index: usize = tile.id.strip_prefix("static-")?.parse().ok()?;
    input.template.statics.get(index).map(|s| s.pages)
}

// ─── Last-row balancing ─────────────────────────────────────────────

/// Center the final partial row of each page when the template asks for it.
/// Pure horizontal shift: pixel x moves and grid bookkeeping follows.
fn balance_last_rows(pages: &mut [Page], template: &Template) {
    if template.policies.last_row_balancing != BalancingMode::Center {
        return;
    }
    for page in pages {
        let Some(body) = page.region(BODY_REGION).cloned() else {
            continue;
        };
        let geom = GridGeometry::for_body(&body, template);

        let last_row = page
            .tiles
            .iter()
            .filter(|t| t.region_id == BODY_REGION && t.layer == Layer::Content)
            .map(|t| t.grid_row)
            .max();
        let Some(last_row) = last_row else { continue };

        let occupied: usize = page
            .tiles
            .iter()
            .filter(|t| {
                t.region_id == BODY_REGION && t.layer == Layer::Content && t.grid_row == last_row
            })
            .map(|t| t.col_span)
            .sum();
        if occupied == 0 || occupied >= geom.cols {
            continue;
        }
        let shift = (geom.cols - occupied) / 2;
        if shift == 0 {
            continue;
        }

        let dx = shift as f64 * (geom.col_width + geom.gap_x);
        for tile in page.tiles.iter_mut().filter(|t| {
            t.region_id == BODY_REGION && t.layer == Layer::Content && t.grid_row == last_row
        }) {
            tile.grid_col += shift;
            tile.x += dx;
        }
    }
}
