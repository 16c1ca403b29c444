//! # Carta
//!
//! A page-native menu layout engine.
//!
//! Most menu builders lay content out on an infinitely tall canvas and then
//! slice it into pages after the fact. This produces stranded section
//! headers, rows split across page boundaries, and decorative gaps that move
//! every time the menu changes.
//!
//! Carta does the opposite: **the page is the fundamental unit of layout.**
//! The paginator walks the menu with the page boundary as a hard constraint,
//! so every header, item card, and filler is placed knowing exactly how much
//! page is left.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [menu]      — Normalize: ordered sections and items, defaults
//!       ↓
//!   [capacity]  — Gate: can this template hold this menu at all?
//!       ↓
//!   [layout]    — Streaming paginator: tiles into page grids
//!       ↓
//!   [filler]    — Deterministic decorative fill of safe-zone gaps
//!       ↓
//!   [validate]  — Optional audit of the finished document
//! ```
//!
//! The whole pipeline is a pure, synchronous function of
//! `(menu, template, selection)`; two calls with identical inputs produce
//! byte-identical documents, filler positions included.

pub mod capacity;
pub mod document;
pub mod error;
pub mod layout;
pub mod menu;
pub mod template;
pub mod validate;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use capacity::CompatStatus;
use document::LayoutDocument;
use error::CartaError;
use layout::PaginationInput;
use template::{PageSpec, Template, TemplateRegistry};

pub use capacity::CapacityReport;
pub use document::{Layer, Page, PageType, Region, Tile, TileContent};
pub use menu::{Category, EngineMenu, Indicators, Menu, MenuItem, MenuMetadata, Section};
pub use validate::{Violation, ViolationCode};

/// Caller-side rendering choices for one generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selection {
    /// Render every item as a text row regardless of images.
    pub text_only: bool,
    /// Override the template's filler switch; `None` keeps the template
    /// default.
    pub fillers_enabled: Option<bool>,
    /// Per-item overrides forcing the text-row variant.
    pub item_text_only: BTreeSet<String>,
}

/// Everything that varies per generation call beyond the menu and template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    pub selection: Selection,
    /// Substitute page geometry (print-size variants and the like).
    pub page_spec_override: Option<PageSpec>,
    /// Run the invariant validator on the finished document and fail on any
    /// violation. Meant for dev/CI builds.
    pub validate: bool,
}

impl GenerateOptions {
    /// Options with the invariant audit switched on.
    pub fn audited() -> Self {
        GenerateOptions {
            validate: true,
            ..Default::default()
        }
    }
}

/// Generate a layout document for a menu against a template.
///
/// This is the primary entry point. The template is assumed validated (see
/// [`Template::validate`]); the menu is normalized here. The call is pure:
/// no I/O, no global state, and deterministic output for identical inputs.
pub fn generate(
    menu: &Menu,
    template: &Template,
    options: &GenerateOptions,
) -> Result<LayoutDocument, CartaError> {
    let engine_menu = menu::normalize(menu)?;
    debug!(
        sections = engine_menu.sections.len(),
        items = engine_menu.total_items(),
        "menu normalized"
    );

    let report = capacity::evaluate(&engine_menu, template, &options.selection);
    debug!(status = %report.status, maximum = report.maximum, "capacity evaluated");
    if report.status == CompatStatus::Incompatible {
        return Err(CartaError::Compatibility {
            status: report.status,
            message: report.message(),
        });
    }

    let page_spec = options
        .page_spec_override
        .clone()
        .unwrap_or_else(|| template.page.clone());
    let fillers_active = options
        .selection
        .fillers_enabled
        .unwrap_or(template.fillers.enabled);

    let pages = layout::paginate(PaginationInput {
        menu: &engine_menu,
        template,
        selection: &options.selection,
        page_spec: &page_spec,
        max_item_tiles: report.maximum,
        fillers_active,
    })?;

    let mut doc = LayoutDocument {
        template_id: template.id.clone(),
        template_version: template.version.clone(),
        page_spec,
        pages,
    };

    if fillers_active {
        let added = layout::filler::insert_fillers(&mut doc, &engine_menu, template);
        debug!(added, "fillers inserted");
    }

    if options.validate {
        let violations = validate::validate(&doc);
        if !violations.is_empty() {
            return Err(CartaError::InvariantViolation { violations });
        }
    }

    debug!(pages = doc.pages.len(), "layout generated");
    Ok(doc)
}

/// The facade most callers hold: a template registry plus the pipeline.
pub struct LayoutEngine {
    registry: TemplateRegistry,
}

impl LayoutEngine {
    pub fn new(registry: TemplateRegistry) -> Self {
        LayoutEngine { registry }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Generate against a registered template, resolved by id.
    pub fn generate(
        &self,
        menu: &Menu,
        template_id: &str,
        options: &GenerateOptions,
    ) -> Result<LayoutDocument, CartaError> {
        let template = self
            .registry
            .get(template_id)
            .ok_or_else(|| CartaError::UnknownTemplate(template_id.to_string()))?;
        generate(menu, template, options)
    }
}

/// A combined request document for the JSON surface: menu, template, and
/// options in one payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub menu: Menu,
    pub template: Template,
    #[serde(default)]
    pub options: GenerateOptions,
}

/// Generate a layout from a combined JSON request, returning the document
/// as pretty-printed JSON. The template is validated here because this
/// surface stands in for the external template collaborator.
pub fn generate_json(json: &str) -> Result<String, CartaError> {
    let request: GenerateRequest = serde_json::from_str(json)?;
    request.template.validate()?;
    let doc = generate(&request.menu, &request.template, &request.options)?;
    Ok(serde_json::to_string_pretty(&doc)?)
}
