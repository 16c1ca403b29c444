//! # Filler Manager
//!
//! Post-placement pass that fills still-empty body cells inside declared
//! safe zones with deterministic decorative tiles. Two scopes:
//!
//! - **Global**: any empty safe-zone cell on the page is eligible.
//! - **Interspersed**: filling is restricted to the grid rows each section's
//!   own tiles occupy, so fillers never bleed into a neighbor section. This
//!   mode also supplies the paginator with a pre-placement column plan
//!   ([`section_slot_plan`]) that spreads the gaps through the section
//!   instead of leaving them all in the last row.
//!
//! The occupancy grid is rebuilt from pixel bounds (5px tolerance) for every
//! page, lives only for that page's pass, and is discarded afterwards.
//! Variant choice runs through the seeded policy, so re-running generation
//! on unchanged input reproduces filler ids and positions byte for byte.

use crate::document::{Layer, LayoutDocument, Page, Tile, TileContent};
use crate::menu::EngineMenu;
use crate::template::{
    FillerConfig, FillerMode, FillerPolicy, FillerVariant, RowBound, SafeZone, Template,
    BODY_REGION,
};

use super::rng::{filler_seed, SeededRng};
use super::GridGeometry;

/// Pixel slop when mapping tile rectangles back onto grid cells. Keeps
/// balanced (pixel-shifted) tiles from reading as empty cells.
const OCCUPANCY_TOLERANCE: f64 = 5.0;

/// One planned row of an interspersed section: the columns items go in.
/// The complementary columns are the gaps the filler pass will claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RowPlan {
    pub item_cols: Vec<usize>,
}

// ─── Occupancy grid ─────────────────────────────────────────────────

/// Function-local boolean grid, built fresh per page and never shared.
struct Occupancy {
    cells: Vec<Vec<bool>>,
    rows: usize,
    cols: usize,
}

impl Occupancy {
    /// Derive occupancy from the actual pixel bounds of every body tile.
    fn from_page(page: &Page, geom: &GridGeometry) -> Self {
        let mut occ = Occupancy {
            cells: vec![vec![false; geom.cols]; geom.rows],
            rows: geom.rows,
            cols: geom.cols,
        };
        for tile in page.tiles_in_region(BODY_REGION) {
            occ.mark_pixels(tile, geom);
        }
        occ
    }

    fn mark_pixels(&mut self, tile: &Tile, geom: &GridGeometry) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.cells[row][col] {
                    continue;
                }
                let cx = geom.cell_x(col) + OCCUPANCY_TOLERANCE;
                let cy = geom.cell_y(row) + OCCUPANCY_TOLERANCE;
                let cw = (geom.col_width - 2.0 * OCCUPANCY_TOLERANCE).max(0.0);
                let ch = (geom.row_height - 2.0 * OCCUPANCY_TOLERANCE).max(0.0);
                let intersects = tile.x < cx + cw
                    && cx < tile.right()
                    && tile.y < cy + ch
                    && cy < tile.bottom();
                if intersects {
                    self.cells[row][col] = true;
                }
            }
        }
    }

    fn is_free(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && !self.cells[row][col]
    }

    fn is_free_rect(&self, row: usize, col: usize, rows: usize, cols: usize) -> bool {
        if row + rows > self.rows || col + cols > self.cols {
            return false;
        }
        (row..row + rows).all(|r| (col..col + cols).all(|c| !self.cells[r][c]))
    }

    fn mark_rect(&mut self, row: usize, col: usize, rows: usize, cols: usize) {
        for r in row..(row + rows).min(self.rows) {
            for c in col..(col + cols).min(self.cols) {
                self.cells[r][c] = true;
            }
        }
    }

    fn last_content_row(&self) -> Option<usize> {
        (0..self.rows).rev().find(|&r| self.cells[r].iter().any(|&c| c))
    }
}

// ─── Safe-zone resolution ───────────────────────────────────────────

struct ResolvedZone {
    start_row: usize,
    end_row: usize,
    start_col: usize,
    end_col: usize,
}

fn resolve_bound(bound: RowBound, occ: &Occupancy) -> Option<usize> {
    match bound {
        RowBound::Row(r) => (r < occ.rows).then_some(r),
        RowBound::Last => occ.rows.checked_sub(1),
        RowBound::LastContent => occ.last_content_row(),
    }
}

fn resolve_zone(zone: &SafeZone, occ: &Occupancy) -> Option<ResolvedZone> {
    let start_row = resolve_bound(zone.start_row, occ)?;
    let end_row = resolve_bound(zone.end_row, occ)?;
    if end_row < start_row {
        return None;
    }
    let end_col = zone.end_col.min(occ.cols.saturating_sub(1));
    if zone.start_col > end_col {
        return None;
    }
    Some(ResolvedZone {
        start_row,
        end_row,
        start_col: zone.start_col,
        end_col,
    })
}

fn effective_zones(config: &FillerConfig, cols: usize) -> Vec<SafeZone> {
    if config.safe_zones.is_empty() {
        vec![SafeZone {
            start_row: RowBound::Row(0),
            end_row: RowBound::Last,
            start_col: 0,
            end_col: cols.saturating_sub(1),
        }]
    } else {
        config.safe_zones.clone()
    }
}

fn effective_variants(config: &FillerConfig) -> Vec<FillerVariant> {
    if config.variants.is_empty() {
        vec![FillerVariant::default_block()]
    } else {
        config.variants.clone()
    }
}

fn pick_variant<'a>(
    policy: FillerPolicy,
    variants: &'a [FillerVariant],
    seq: &mut usize,
    rng: &mut SeededRng,
) -> &'a FillerVariant {
    match policy {
        // BY_PAGE_TYPE is reserved; it currently behaves as SEQUENTIAL.
        FillerPolicy::Sequential | FillerPolicy::ByPageType => &variants[*seq % variants.len()],
        FillerPolicy::RandomSeeded => &variants[rng.next_below(variants.len())],
    }
}

// ─── Filler insertion ───────────────────────────────────────────────

/// Append filler tiles to every page of the document. Returns the number of
/// tiles added. Pages are only ever appended to, never reorganized.
pub(crate) fn insert_fillers(doc: &mut LayoutDocument, menu: &EngineMenu, template: &Template) -> usize {
    let mut added = 0;
    for page in &mut doc.pages {
        let Some(body) = page.region(BODY_REGION).cloned() else {
            continue;
        };
        let geom = GridGeometry::for_body(&body, template);
        if geom.rows == 0 || geom.cols == 0 {
            continue;
        }
        added += match template.fillers.mode {
            FillerMode::Global => fill_page_global(page, menu, template, &geom),
            FillerMode::Interspersed => fill_page_interspersed(page, menu, template, &geom),
        };
    }
    added
}

fn fill_page_global(
    page: &mut Page,
    menu: &EngineMenu,
    template: &Template,
    geom: &GridGeometry,
) -> usize {
    let mut occ = Occupancy::from_page(page, geom);
    let mut rng = SeededRng::new(filler_seed(&menu.id, &template.id, page.page_index, None));
    fill_zones(page, template, geom, &mut occ, &mut rng, None)
}

fn fill_page_interspersed(
    page: &mut Page,
    menu: &EngineMenu,
    template: &Template,
    geom: &GridGeometry,
) -> usize {
    let mut occ = Occupancy::from_page(page, geom);
    let mut added = 0;

    // Sections are visited in menu order so the scan order, and with it the
    // sequential variant rotation, is reproducible.
    for section in &menu.sections {
        let mut section_rows: Vec<usize> = page
            .tiles_in_region(BODY_REGION)
            .filter(|t| t.content.section_id() == Some(section.id.as_str()) && t.content.is_item())
            .flat_map(|t| t.grid_row..t.grid_row + t.row_span.max(1))
            .collect();
        section_rows.sort_unstable();
        section_rows.dedup();
        if section_rows.is_empty() {
            continue;
        }
        let mut rng = SeededRng::new(filler_seed(
            &menu.id,
            &template.id,
            page.page_index,
            Some(&section.id),
        ));
        added += fill_zones(page, template, geom, &mut occ, &mut rng, Some(&section_rows));
    }
    added
}

/// Scan every effective zone row-major and drop a filler on each still-empty
/// cell. `row_filter` restricts eligible rows (interspersed mode).
fn fill_zones(
    page: &mut Page,
    template: &Template,
    geom: &GridGeometry,
    occ: &mut Occupancy,
    rng: &mut SeededRng,
    row_filter: Option<&[usize]>,
) -> usize {
    let config = &template.fillers;
    let zones = effective_zones(config, geom.cols);
    let variants = effective_variants(config);
    let mut seq = 0;
    let mut added = 0;

    for zone in &zones {
        let Some(zone) = resolve_zone(zone, occ) else {
            continue;
        };
        for row in zone.start_row..=zone.end_row {
            if let Some(allowed) = row_filter {
                if !allowed.contains(&row) {
                    continue;
                }
            }
            for col in zone.start_col..=zone.end_col {
                if !occ.is_free(row, col) {
                    continue;
                }
                let variant = pick_variant(config.policy, &variants, &mut seq, rng).clone();
                // Multi-cell variants must clear their whole footprint and
                // stay inside the zone.
                if row + variant.rows - 1 > zone.end_row || col + variant.cols - 1 > zone.end_col {
                    continue;
                }
                if !occ.is_free_rect(row, col, variant.rows, variant.cols) {
                    continue;
                }
                if let Some(allowed) = row_filter {
                    if !(row..row + variant.rows).all(|r| allowed.contains(&r)) {
                        continue;
                    }
                }

                occ.mark_rect(row, col, variant.rows, variant.cols);
                page.tiles.push(Tile {
                    id: format!("filler-{}-{row}-{col}", page.page_index),
                    region_id: BODY_REGION.to_string(),
                    x: geom.cell_x(col),
                    y: geom.cell_y(row),
                    width: geom.span_width(variant.cols),
                    height: geom.span_height(variant.rows),
                    grid_row: row,
                    grid_col: col,
                    row_span: variant.rows,
                    col_span: variant.cols,
                    layer: Layer::Background,
                    content: TileContent::Filler {
                        variant: variant.id.clone(),
                    },
                });
                seq += 1;
                added += 1;
            }
        }
    }
    added
}

// ─── Interspersed slot planning ─────────────────────────────────────

/// Distribute a section's items over its rows so the empty cells spread out
/// instead of piling up in the last row. Per row, the empty columns are
/// chosen by exhaustive subset scoring: 10 points for each horizontally
/// adjacent empty pair, 1 point for each column repeated from the previous
/// row's empties, lowest score wins, ties broken by the seeded RNG.
pub(crate) fn section_slot_plan(cols: usize, item_count: usize, rng: &mut SeededRng) -> Vec<RowPlan> {
    if cols == 0 || item_count == 0 {
        return vec![];
    }
    let rows = item_count.div_ceil(cols);
    let empty_total = rows * cols - item_count;
    let base = empty_total / rows;
    let extra = empty_total % rows;

    let mut plans = Vec::with_capacity(rows);
    let mut prev_empty: Vec<usize> = vec![];
    for row in 0..rows {
        // Later rows absorb the remainder, so early rows stay fullest.
        let empties = base + usize::from(row >= rows - extra);
        let empty_cols = choose_empty_columns(cols, empties, &prev_empty, rng);
        let item_cols: Vec<usize> = (0..cols).filter(|c| !empty_cols.contains(c)).collect();
        prev_empty = empty_cols;
        plans.push(RowPlan { item_cols });
    }
    plans
}

fn choose_empty_columns(
    cols: usize,
    count: usize,
    prev_empty: &[usize],
    rng: &mut SeededRng,
) -> Vec<usize> {
    if count == 0 {
        return vec![];
    }
    let candidates = combinations(cols, count);
    let mut best_score = u32::MAX;
    let mut best: Vec<&Vec<usize>> = vec![];
    for candidate in &candidates {
        let score = score_empty_columns(candidate, prev_empty);
        if score < best_score {
            best_score = score;
            best = vec![candidate];
        } else if score == best_score {
            best.push(candidate);
        }
    }
    let pick = if best.len() > 1 {
        rng.next_below(best.len())
    } else {
        0
    };
    best[pick].clone()
}

fn score_empty_columns(candidate: &[usize], prev_empty: &[usize]) -> u32 {
    let mut score = 0;
    for pair in candidate.windows(2) {
        if pair[1] == pair[0] + 1 {
            score += 10;
        }
    }
    for col in candidate {
        if prev_empty.contains(col) {
            score += 1;
        }
    }
    score
}

/// All k-subsets of `0..n` in lexicographic order. Grids eligible for
/// interspersed planning have at most 6 columns, so this stays tiny.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = vec![];
    let mut current = Vec::with_capacity(k);
    fn recurse(n: usize, k: usize, start: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            recurse(n, k, i + 1, current, out);
            current.pop();
        }
    }
    recurse(n, k, 0, &mut current, &mut result);
    result
}
