//! # Template Model
//!
//! An already-validated, immutable description of a page: size and margins,
//! stacked regions, the body grid, per-tile-kind content budgets, filler
//! rules, and placement policies. The engine consumes this model; it never
//! builds or stores template definitions itself. Parsing from YAML/JSON and
//! on-disk lookup belong to an external collaborator, so this module only
//! offers the serde shape, a validation pass for that collaborator to call,
//! and an explicit [`TemplateRegistry`] for id-based resolution.
//!
//! Content budgets replace runtime text measurement: each tile kind declares
//! a grid footprint (row/column span) and a fixed pixel height, and the
//! paginator trusts those numbers unconditionally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::Region;
use crate::error::CartaError;

/// Region id the single `Remainder` band must use. Item tiles may only ever
/// land here.
pub const BODY_REGION: &str = "body";

/// Fallback ceiling on menu size when a template declares no `hardMaxItems`.
pub const DEFAULT_HARD_MAX_ITEMS: usize = 500;

/// Edge values (top, right, bottom, left) used for page margins.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Page size and margins in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub margin: Edges,
}

impl Default for PageSpec {
    fn default() -> Self {
        // US Letter at 96dpi with a 0.5in margin.
        PageSpec {
            width: 816.0,
            height: 1056.0,
            margin: Edges::uniform(48.0),
        }
    }
}

/// A horizontal band of the page. Bands stack top to bottom in declaration
/// order inside the margins; exactly one band is the `Remainder` (the body).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSpec {
    pub id: String,
    pub band: Band,
}

/// Band height: fixed, or whatever vertical space the fixed bands leave over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Band {
    /// Fixed height on the first page; continuation pages may reserve less
    /// (or zero, collapsing the band entirely).
    Fixed {
        height: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        continuation_height: Option<f64>,
    },
    /// Remaining vertical space. The body grid lives here.
    Remainder,
}

impl Band {
    fn height_on(&self, continuation: bool) -> Option<f64> {
        match self {
            Band::Fixed {
                height,
                continuation_height,
            } => Some(if continuation {
                continuation_height.unwrap_or(*height)
            } else {
                *height
            }),
            Band::Remainder => None,
        }
    }
}

/// The body grid: column count, uniform row height, and inter-cell gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub cols: usize,
    pub row_height: f64,
    #[serde(default)]
    pub gap_x: f64,
    #[serde(default)]
    pub gap_y: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec {
            cols: 3,
            row_height: 96.0,
            gap_x: 8.0,
            gap_y: 8.0,
        }
    }
}

impl GridSpec {
    /// Number of whole grid rows that fit in `body_height`.
    pub fn rows_in(&self, body_height: f64) -> usize {
        if self.row_height <= 0.0 {
            return 0;
        }
        ((body_height + self.gap_y) / (self.row_height + self.gap_y)).floor() as usize
    }

    /// Width of a single column within `body_width`.
    pub fn col_width(&self, body_width: f64) -> f64 {
        (body_width - (self.cols.saturating_sub(1)) as f64 * self.gap_x) / self.cols as f64
    }
}

/// Declared footprint for one tile kind: grid span plus fixed pixel height.
///
/// `cols: None` means "span the full grid width", which is how section
/// headers and dividers are usually declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBudget {
    pub rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<usize>,
    pub height: f64,
}

impl TileBudget {
    /// Concrete column span for a grid with `grid_cols` columns.
    pub fn col_span(&self, grid_cols: usize) -> usize {
        self.cols.unwrap_or(grid_cols).min(grid_cols)
    }
}

/// Per-tile-kind content budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentBudgets {
    pub title: TileBudget,
    pub logo: TileBudget,
    pub section_header: TileBudget,
    pub item_card: TileBudget,
    pub item_text_row: TileBudget,
    pub divider: TileBudget,
    pub text_block: TileBudget,
    pub spacer: TileBudget,
}

impl Default for ContentBudgets {
    fn default() -> Self {
        ContentBudgets {
            title: TileBudget { rows: 1, cols: None, height: 48.0 },
            logo: TileBudget { rows: 1, cols: None, height: 64.0 },
            section_header: TileBudget { rows: 1, cols: None, height: 36.0 },
            item_card: TileBudget { rows: 2, cols: Some(1), height: 180.0 },
            item_text_row: TileBudget { rows: 1, cols: Some(1), height: 40.0 },
            divider: TileBudget { rows: 1, cols: None, height: 24.0 },
            text_block: TileBudget { rows: 1, cols: None, height: 60.0 },
            spacer: TileBudget { rows: 1, cols: Some(1), height: 40.0 },
        }
    }
}

// ─── Filler configuration ───────────────────────────────────────────

/// Filler insertion rules for the template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FillerConfig {
    pub enabled: bool,
    pub mode: FillerMode,
    /// Grid rectangles eligible for fillers. Empty means "the whole grid".
    pub safe_zones: Vec<SafeZone>,
    /// Declared filler variants. Empty means one 1x1 `half-opacity-block`.
    pub variants: Vec<FillerVariant>,
    pub policy: FillerPolicy,
}

impl Default for FillerConfig {
    fn default() -> Self {
        FillerConfig {
            enabled: false,
            mode: FillerMode::Global,
            safe_zones: vec![],
            variants: vec![],
            policy: FillerPolicy::Sequential,
        }
    }
}

/// Scope of a filler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillerMode {
    /// Fill any empty safe-zone cell on the page.
    Global,
    /// Fill only within each section's own rows, with pre-placement column
    /// spreading so fillers mix in among the items.
    Interspersed,
}

/// How a filler variant is chosen for each empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillerPolicy {
    /// Round-robin through the declared variants in cell-scan order.
    Sequential,
    /// Seeded RNG index pick per cell.
    RandomSeeded,
    /// Reserved for per-page-type variant maps; currently identical to
    /// `Sequential`.
    ByPageType,
}

/// A rectangular region of grid cells eligible for filler placement.
/// Row and column bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeZone {
    pub start_row: RowBound,
    pub end_row: RowBound,
    #[serde(default)]
    pub start_col: usize,
    pub end_col: usize,
}

/// A safe-zone row edge: a concrete index or a page-relative keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowBound {
    Row(usize),
    /// The last grid row of the page.
    Last,
    /// The last row containing any occupied cell.
    LastContent,
}

/// One decorative filler shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillerVariant {
    pub id: String,
    #[serde(default = "one")]
    pub rows: usize,
    #[serde(default = "one")]
    pub cols: usize,
}

fn one() -> usize {
    1
}

impl FillerVariant {
    /// The fallback variant used when a template declares none.
    pub fn default_block() -> Self {
        FillerVariant {
            id: "half-opacity-block".to_string(),
            rows: 1,
            cols: 1,
        }
    }
}

// ─── Placement policies ─────────────────────────────────────────────

/// Which pages a sticky element appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageScope {
    FirstOnly,
    All,
}

/// How the last row of each page is treated when fillers are off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancingMode {
    None,
    /// Shift the final partial row right so it sits centered in the grid.
    Center,
}

/// Pagination behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementPolicies {
    pub last_row_balancing: BalancingMode,
    pub sticky_title: PageScope,
    pub sticky_logo: PageScope,
    /// Re-emit a continuation header when a section spans a page break.
    pub repeat_section_headers: bool,
    /// Minimum items of a section that must fit under its header on the same
    /// page; otherwise the header moves to the next page.
    pub header_keep_with: usize,
    /// Keep the bottom grid row free of content tiles.
    pub reserve_footer_row: bool,
    pub divider_between_sections: bool,
}

impl Default for PlacementPolicies {
    fn default() -> Self {
        PlacementPolicies {
            last_row_balancing: BalancingMode::None,
            sticky_title: PageScope::FirstOnly,
            sticky_logo: PageScope::FirstOnly,
            repeat_section_headers: true,
            header_keep_with: 1,
            reserve_footer_row: false,
            divider_between_sections: false,
        }
    }
}

// ─── Capacity limits ────────────────────────────────────────────────

/// Item slots contributed by continuation pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepeatConfig {
    pub slots_per_repeat: usize,
    pub max_repeats: usize,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        RepeatConfig {
            slots_per_repeat: 0,
            max_repeats: 0,
        }
    }
}

/// The template's declared structural limits, consumed by the capacity
/// evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapacityLimits {
    pub min_sections: usize,
    /// `None` means unbounded.
    pub max_sections: Option<usize>,
    pub min_items: usize,
    /// `None` falls back to [`DEFAULT_HARD_MAX_ITEMS`].
    pub hard_max_items: Option<usize>,
    /// Warn when fewer than half the items carry an image.
    pub requires_images: bool,
    pub repeat: RepeatConfig,
    /// For position-indexed layouts: the number of section slots the design
    /// requires the menu to supply.
    pub required_section_slots: Option<usize>,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        CapacityLimits {
            min_sections: 1,
            max_sections: None,
            min_items: 1,
            hard_max_items: None,
            requires_images: false,
            repeat: RepeatConfig::default(),
            required_section_slots: None,
        }
    }
}

// ─── Static elements ────────────────────────────────────────────────

/// A template-declared tile with fixed content, bound to a non-body region
/// (a footer note, decorative spacer, and the like).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticElement {
    pub region_id: String,
    pub kind: StaticKind,
    #[serde(default = "default_static_pages")]
    pub pages: PageScope,
}

fn default_static_pages() -> PageScope {
    PageScope::FirstOnly
}

/// What a static element renders as.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StaticKind {
    TextBlock { text: String },
    Spacer,
}

// ─── Template ───────────────────────────────────────────────────────

/// A complete visual template. Immutable for the duration of a generation
/// call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub page: PageSpec,
    pub regions: Vec<RegionSpec>,
    #[serde(default)]
    pub grid: GridSpec,
    #[serde(default)]
    pub budgets: ContentBudgets,
    #[serde(default)]
    pub fillers: FillerConfig,
    #[serde(default)]
    pub policies: PlacementPolicies,
    #[serde(default)]
    pub limits: CapacityLimits,
    #[serde(default)]
    pub statics: Vec<StaticElement>,
}

impl Template {
    /// Resolve region rectangles for one page. Fixed bands stack top to
    /// bottom inside the margins; the body takes whatever is left.
    pub fn resolve_regions(&self, page: &PageSpec, continuation: bool) -> Vec<Region> {
        let content_x = page.margin.left;
        let content_width = page.width - page.margin.horizontal();
        let content_height = page.height - page.margin.vertical();

        let fixed_total: f64 = self
            .regions
            .iter()
            .filter_map(|r| r.band.height_on(continuation))
            .sum();
        let body_height = (content_height - fixed_total).max(0.0);

        let mut y = page.margin.top;
        self.regions
            .iter()
            .map(|spec| {
                let height = spec.band.height_on(continuation).unwrap_or(body_height);
                let region = Region {
                    id: spec.id.clone(),
                    x: content_x,
                    y,
                    width: content_width,
                    height,
                };
                y += height;
                region
            })
            .collect()
    }

    /// Grid rows available in the body on a first page (`continuation =
    /// false`) or a continuation page.
    pub fn body_rows(&self, page: &PageSpec, continuation: bool) -> usize {
        let regions = self.resolve_regions(page, continuation);
        let body = regions
            .iter()
            .find(|r| r.id == BODY_REGION)
            .map(|r| r.height)
            .unwrap_or(0.0);
        self.grid.rows_in(body)
    }

    /// Structural validation. The external template collaborator calls this
    /// once at load time; [`TemplateRegistry::register`] also refuses
    /// templates that fail it.
    pub fn validate(&self) -> Result<(), CartaError> {
        let fail = |msg: String| Err(CartaError::TemplateValidation(msg));

        if self.id.trim().is_empty() {
            return fail("template id must not be empty".into());
        }
        if self.page.width <= self.page.margin.horizontal()
            || self.page.height <= self.page.margin.vertical()
        {
            return fail("page margins leave no content area".into());
        }

        let remainder_count = self
            .regions
            .iter()
            .filter(|r| matches!(r.band, Band::Remainder))
            .count();
        if remainder_count != 1 {
            return fail(format!(
                "expected exactly one remainder region, found {remainder_count}"
            ));
        }
        let body = self
            .regions
            .iter()
            .find(|r| matches!(r.band, Band::Remainder))
            .unwrap();
        if body.id != BODY_REGION {
            return fail(format!(
                "remainder region must be named \"{BODY_REGION}\", found \"{}\"",
                body.id
            ));
        }

        if self.grid.cols == 0 || self.grid.row_height <= 0.0 {
            return fail("grid must have at least one column and a positive row height".into());
        }
        if self.body_rows(&self.page, false) == 0 {
            return fail("body region is too short for a single grid row".into());
        }

        for (name, budget) in [
            ("sectionHeader", &self.budgets.section_header),
            ("itemCard", &self.budgets.item_card),
            ("itemTextRow", &self.budgets.item_text_row),
            ("divider", &self.budgets.divider),
        ] {
            if budget.rows == 0 {
                return fail(format!("{name} budget must span at least one row"));
            }
            if let Some(cols) = budget.cols {
                if cols == 0 || cols > self.grid.cols {
                    return fail(format!(
                        "{name} budget spans {cols} columns on a {}-column grid",
                        self.grid.cols
                    ));
                }
            }
            let allotment = budget.rows as f64 * self.grid.row_height
                + (budget.rows - 1) as f64 * self.grid.gap_y;
            if budget.height > allotment + 0.01 {
                return fail(format!(
                    "{name} budget height {} exceeds its {}-row allotment {}",
                    budget.height, budget.rows, allotment
                ));
            }
        }

        if self.policies.header_keep_with == 0 {
            return fail("headerKeepWith must be at least 1".into());
        }

        for zone in &self.fillers.safe_zones {
            if zone.end_col < zone.start_col || zone.end_col >= self.grid.cols {
                return fail(format!(
                    "safe zone columns {}..={} out of range for a {}-column grid",
                    zone.start_col, zone.end_col, self.grid.cols
                ));
            }
        }
        for variant in &self.fillers.variants {
            if variant.rows == 0 || variant.cols == 0 {
                return fail(format!("filler variant {} has an empty footprint", variant.id));
            }
        }
        if self.fillers.mode == FillerMode::Interspersed {
            if self.grid.cols > 6 {
                return fail("interspersed fillers require a grid of at most 6 columns".into());
            }
            for (name, budget) in [
                ("itemCard", &self.budgets.item_card),
                ("itemTextRow", &self.budgets.item_text_row),
            ] {
                if budget.col_span(self.grid.cols) != 1 {
                    return fail(format!(
                        "interspersed fillers require a single-column {name} budget"
                    ));
                }
            }
        }

        let mut static_regions: Vec<&str> = Vec::new();
        for elem in &self.statics {
            if elem.region_id == BODY_REGION {
                return fail("static elements may not target the body region".into());
            }
            if !self.regions.iter().any(|r| r.id == elem.region_id) {
                return fail(format!(
                    "static element targets unknown region \"{}\"",
                    elem.region_id
                ));
            }
            if static_regions.contains(&elem.region_id.as_str()) {
                return fail(format!(
                    "region \"{}\" holds more than one static element",
                    elem.region_id
                ));
            }
            static_regions.push(&elem.region_id);
        }

        Ok(())
    }
}

// ─── Registry ───────────────────────────────────────────────────────

/// An explicit template cache keyed by id, owned by the caller. The engine
/// never keeps hidden module-level template state.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a template, replacing any previous entry with the
    /// same id.
    pub fn register(&mut self, template: Template) -> Result<(), CartaError> {
        template.validate()?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
