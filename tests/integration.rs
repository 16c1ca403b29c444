//! Integration tests for the Carta layout pipeline.
//!
//! These tests exercise the full path from raw menu + template to layout
//! document. They verify:
//! - Capacity gating and the numbers in its messages
//! - Pagination: page counts, page types, header repetition
//! - Conservation: every item becomes exactly one tile
//! - Orphan avoidance and divider counts
//! - Filler determinism and confinement
//! - Invariant validation of everything the pipeline emits

use std::collections::BTreeSet;

use carta::capacity::{self, CompatStatus};
use carta::error::CartaError;
use carta::template::{
    BalancingMode, Band, Edges, FillerMode, FillerPolicy, FillerVariant, GridSpec, PageScope,
    PageSpec, RegionSpec, RepeatConfig, RowBound, SafeZone, Template, TemplateRegistry, TileBudget,
};
use carta::{
    generate, generate_json, Category, GenerateOptions, Layer, LayoutEngine, Menu, MenuItem,
    MenuMetadata, PageType, Selection, TileContent,
};

// ─── Helpers ────────────────────────────────────────────────────

fn make_item(id: &str, sort_order: i32, with_image: bool) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: format!("Item {id}"),
        description: Some("House favorite".to_string()),
        price: 12.5,
        image_url: with_image.then(|| format!("https://img.example.com/{id}.jpg")),
        sort_order,
        indicators: Default::default(),
    }
}

fn make_items(count: usize) -> Vec<MenuItem> {
    (0..count)
        .map(|i| make_item(&format!("i{i}"), i as i32, i % 2 == 0))
        .collect()
}

fn make_category(id: &str, sort_order: i32, items: Vec<MenuItem>) -> Category {
    Category {
        id: id.to_string(),
        name: format!("Section {id}"),
        sort_order,
        items,
    }
}

fn make_menu(categories: Vec<Category>) -> Menu {
    Menu {
        id: "menu-1".to_string(),
        name: "Dinner".to_string(),
        metadata: MenuMetadata {
            currency: "USD".to_string(),
            venue_name: Some("Test Kitchen".to_string()),
            logo_url: Some("https://img.example.com/logo.png".to_string()),
        },
        categories,
        items: vec![],
    }
}

/// A body-only template: 3 columns, single-row item cards, `body_rows` grid
/// rows on every page.
fn body_template(body_rows: usize) -> Template {
    let body_height = body_rows as f64 * 104.0 - 8.0;
    Template {
        id: "grid-test".to_string(),
        version: "1".to_string(),
        page: PageSpec {
            width: 816.0,
            height: body_height + 96.0,
            margin: Edges::uniform(48.0),
        },
        regions: vec![RegionSpec {
            id: "body".to_string(),
            band: Band::Remainder,
        }],
        grid: GridSpec {
            cols: 3,
            row_height: 96.0,
            gap_x: 8.0,
            gap_y: 8.0,
        },
        budgets: carta::template::ContentBudgets {
            item_card: TileBudget {
                rows: 1,
                cols: Some(1),
                height: 90.0,
            },
            item_text_row: TileBudget {
                rows: 1,
                cols: Some(1),
                height: 40.0,
            },
            section_header: TileBudget {
                rows: 1,
                cols: None,
                height: 36.0,
            },
            ..Default::default()
        },
        fillers: Default::default(),
        policies: Default::default(),
        limits: Default::default(),
        statics: vec![],
    }
}

/// The body template plus title/header/footer regions for sticky tests.
fn banded_template(body_rows: usize) -> Template {
    let mut t = body_template(body_rows);
    let extra = 72.0 + 56.0 + 40.0;
    t.page.height += extra;
    t.regions = vec![
        RegionSpec {
            id: "header".to_string(),
            band: Band::Fixed {
                height: 72.0,
                continuation_height: Some(72.0),
            },
        },
        RegionSpec {
            id: "title".to_string(),
            band: Band::Fixed {
                height: 56.0,
                continuation_height: Some(56.0),
            },
        },
        RegionSpec {
            id: "body".to_string(),
            band: Band::Remainder,
        },
        RegionSpec {
            id: "footer".to_string(),
            band: Band::Fixed {
                height: 40.0,
                continuation_height: None,
            },
        },
    ];
    t
}

fn audited() -> GenerateOptions {
    GenerateOptions::audited()
}

fn header_tiles(doc: &carta::document::LayoutDocument) -> Vec<&carta::Tile> {
    doc.pages
        .iter()
        .flat_map(|p| &p.tiles)
        .filter(|t| matches!(t.content, TileContent::SectionHeader { .. }))
        .collect()
}

fn filler_tiles(doc: &carta::document::LayoutDocument) -> Vec<&carta::Tile> {
    doc.pages
        .iter()
        .flat_map(|p| &p.tiles)
        .filter(|t| matches!(t.content, TileContent::Filler { .. }))
        .collect()
}

// ─── Capacity Gate ──────────────────────────────────────────────

#[test]
fn nine_items_on_nine_slots_single_page() {
    // 4 body rows: one for the header, three base rows of items (9 slots).
    let template = body_template(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(9))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    assert_eq!(doc.pages.len(), 1, "nine items should fit on one page");
    assert_eq!(doc.pages[0].page_type, PageType::Single);
    assert_eq!(doc.item_tile_count(), 9);
}

#[test]
fn twenty_items_with_repeats_all_placed() {
    let mut template = body_template(4);
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 3,
        max_repeats: 10,
    };
    let menu = make_menu(vec![make_category("c1", 1, make_items(20))]);

    let report = capacity::evaluate(
        &carta::menu::normalize(&menu).unwrap(),
        &template,
        &Selection::default(),
    );
    assert!(20 <= report.maximum);

    let doc = generate(&menu, &template, &audited()).unwrap();
    assert_eq!(doc.item_tile_count(), 20, "all twenty items must place");
    assert!(doc.pages.len() > 1);
}

#[test]
fn hard_max_violation_reports_both_numbers() {
    let mut template = body_template(4);
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 12,
        max_repeats: 20,
    };
    template.limits.hard_max_items = Some(50);
    let menu = make_menu(vec![make_category("c1", 1, make_items(60))]);

    let err = generate(&menu, &template, &audited()).unwrap_err();
    match err {
        CartaError::Compatibility { status, message } => {
            assert_eq!(status, CompatStatus::Incompatible);
            assert!(message.contains("50"), "limit missing from: {message}");
            assert!(message.contains("60"), "count missing from: {message}");
        }
        other => panic!("expected Compatibility error, got {other:?}"),
    }
}

#[test]
fn dense_text_template_takes_150_items() {
    // A "tank": 2 text columns, 10 rows per page, generous repeats.
    let mut template = body_template(10);
    template.grid.cols = 2;
    template.limits.hard_max_items = Some(150);
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 25,
        max_repeats: 10,
    };
    let menu = make_menu(vec![make_category("c1", 1, make_items(150))]);
    let options = GenerateOptions {
        selection: Selection {
            text_only: true,
            ..Default::default()
        },
        ..audited()
    };

    let normalized = carta::menu::normalize(&menu).unwrap();
    let report = capacity::evaluate(&normalized, &template, &options.selection);
    assert_eq!(report.status, CompatStatus::Ok, "{}", report.message());

    let doc = generate(&menu, &template, &options).unwrap();
    assert_eq!(doc.item_tile_count(), 150);
}

#[test]
fn too_few_sections_incompatible() {
    let mut template = body_template(4);
    template.limits.min_sections = 3;
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    assert!(matches!(
        generate(&menu, &template, &audited()),
        Err(CartaError::Compatibility { .. })
    ));
}

// ─── Pagination ─────────────────────────────────────────────────

#[test]
fn page_types_first_continuation_final() {
    let mut template = body_template(4);
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 9,
        max_repeats: 5,
    };
    let menu = make_menu(vec![make_category("c1", 1, make_items(22))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    assert!(doc.pages.len() >= 3, "expected 3+ pages, got {}", doc.pages.len());
    assert_eq!(doc.pages[0].page_type, PageType::First);
    assert_eq!(doc.pages.last().unwrap().page_type, PageType::Final);
    for page in &doc.pages[1..doc.pages.len() - 1] {
        assert_eq!(page.page_type, PageType::Continuation);
    }
}

#[test]
fn continuation_headers_flagged() {
    let mut template = body_template(4);
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 9,
        max_repeats: 5,
    };
    let menu = make_menu(vec![make_category("c1", 1, make_items(15))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let headers = header_tiles(&doc);
    let originals = headers
        .iter()
        .filter(|t| matches!(t.content, TileContent::SectionHeader { continuation: false, .. }))
        .count();
    let repeats = headers
        .iter()
        .filter(|t| matches!(t.content, TileContent::SectionHeader { continuation: true, .. }))
        .count();
    assert_eq!(originals, 1);
    assert_eq!(repeats, doc.pages.len() - 1, "one repeat per continuation page");
}

#[test]
fn one_header_per_nonempty_section() {
    let template = body_template(8);
    let menu = make_menu(vec![
        make_category("c1", 1, make_items(2)),
        make_category("c2", 2, vec![]),
        make_category("c3", 3, make_items(3)),
    ]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let headers = header_tiles(&doc);
    assert_eq!(headers.len(), 2, "empty sections get no header");
}

#[test]
fn dividers_between_sections() {
    let mut template = body_template(10);
    template.policies.divider_between_sections = true;
    let menu = make_menu(vec![
        make_category("c1", 1, make_items(2)),
        make_category("c2", 2, make_items(2)),
        make_category("c3", 3, make_items(2)),
    ]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let dividers = doc
        .pages
        .iter()
        .flat_map(|p| &p.tiles)
        .filter(|t| matches!(t.content, TileContent::DecorativeDivider))
        .count();
    assert_eq!(dividers, 2, "N sections produce N-1 dividers");
}

#[test]
fn header_never_stranded_at_page_bottom() {
    // Section A fills most of the first page; section B's header must move
    // to the next page together with its items.
    let mut template = body_template(4);
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 9,
        max_repeats: 5,
    };
    template.policies.header_keep_with = 2;
    let menu = make_menu(vec![
        make_category("c1", 1, make_items(8)),
        make_category("c2", 2, make_items(3)),
    ]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    for page in &doc.pages {
        for tile in &page.tiles {
            if let TileContent::SectionHeader { section_id, .. } = &tile.content {
                let items_below = page
                    .tiles
                    .iter()
                    .filter(|t| {
                        t.content.is_item()
                            && t.content.section_id() == Some(section_id.as_str())
                            && t.y > tile.y
                    })
                    .count();
                assert!(
                    items_below >= 1,
                    "header {} stranded on page {}",
                    tile.id,
                    page.page_index
                );
            }
        }
    }
}

#[test]
fn implicit_section_for_flat_menus() {
    let template = body_template(4);
    let mut menu = make_menu(vec![]);
    menu.items = make_items(3);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let headers = header_tiles(&doc);
    assert_eq!(headers.len(), 1);
    match &headers[0].content {
        TileContent::SectionHeader { label, .. } => assert_eq!(label, "Menu"),
        _ => unreachable!(),
    }
}

#[test]
fn text_only_selection_emits_text_rows() {
    let template = body_template(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(5))]);
    let options = GenerateOptions {
        selection: Selection {
            text_only: true,
            ..Default::default()
        },
        ..audited()
    };
    let doc = generate(&menu, &template, &options).unwrap();
    assert!(doc
        .pages
        .iter()
        .flat_map(|p| &p.tiles)
        .all(|t| !matches!(t.content, TileContent::ItemCard { .. })));
    assert_eq!(doc.item_tile_count(), 5);
}

#[test]
fn per_item_override_mixes_variants() {
    let template = body_template(6);
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let mut item_text_only = BTreeSet::new();
    item_text_only.insert("i1".to_string());
    let options = GenerateOptions {
        selection: Selection {
            item_text_only,
            ..Default::default()
        },
        ..audited()
    };
    let doc = generate(&menu, &template, &options).unwrap();
    let text_rows = doc
        .pages
        .iter()
        .flat_map(|p| &p.tiles)
        .filter(|t| matches!(t.content, TileContent::ItemTextRow { .. }))
        .count();
    assert_eq!(text_rows, 1);
    assert_eq!(doc.item_tile_count(), 4);
}

#[test]
fn missing_image_keeps_card_geometry() {
    let template = body_template(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(2))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let cards: Vec<_> = doc
        .pages
        .iter()
        .flat_map(|p| &p.tiles)
        .filter(|t| matches!(t.content, TileContent::ItemCard { .. }))
        .collect();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].width, cards[1].width);
    assert_eq!(cards[0].height, cards[1].height);
    let show_images: Vec<bool> = cards
        .iter()
        .map(|t| match &t.content {
            TileContent::ItemCard { show_image, .. } => *show_image,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(show_images, vec![true, false]);
}

// ─── Sticky elements & regions ──────────────────────────────────

#[test]
fn title_and_logo_on_first_page() {
    let template = banded_template(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(3))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let first = &doc.pages[0];
    assert!(first
        .tiles
        .iter()
        .any(|t| matches!(t.content, TileContent::Title { .. })));
    assert!(first
        .tiles
        .iter()
        .any(|t| matches!(t.content, TileContent::Logo { .. })));
}

#[test]
fn sticky_title_cloned_onto_continuations() {
    let mut template = banded_template(4);
    template.policies.sticky_title = PageScope::All;
    template.policies.sticky_logo = PageScope::FirstOnly;
    template.limits.repeat = RepeatConfig {
        slots_per_repeat: 9,
        max_repeats: 5,
    };
    let menu = make_menu(vec![make_category("c1", 1, make_items(14))]);
    let doc = generate(&menu, &template, &audited()).unwrap();
    assert!(doc.pages.len() >= 2);

    let second = &doc.pages[1];
    let title_clone = second
        .tiles
        .iter()
        .find(|t| matches!(t.content, TileContent::Title { .. }))
        .expect("continuation page should carry the title");
    assert_eq!(title_clone.id, "title-p1", "clone gets a new identity");
    assert!(
        !second
            .tiles
            .iter()
            .any(|t| matches!(t.content, TileContent::Logo { .. })),
        "logo is first-page only"
    );
}

#[test]
fn item_tiles_only_in_body_region() {
    let template = banded_template(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(6))]);
    let doc = generate(&menu, &template, &audited()).unwrap();
    for page in &doc.pages {
        for tile in &page.tiles {
            if tile.content.is_item() {
                assert_eq!(tile.region_id, "body");
            }
        }
    }
}

// ─── Balancing ──────────────────────────────────────────────────

#[test]
fn center_balancing_shifts_final_partial_row() {
    let mut template = body_template(4);
    template.policies.last_row_balancing = BalancingMode::Center;
    // 4 items on a 3-column grid: last row holds one item, centered.
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let last_item = doc.pages[0]
        .tiles
        .iter()
        .find(|t| t.id == "item-i3")
        .unwrap();
    assert_eq!(last_item.grid_col, 1, "single trailing item centers in column 1");
}

#[test]
fn balancing_skipped_when_fillers_enabled() {
    let mut template = body_template(4);
    template.policies.last_row_balancing = BalancingMode::Center;
    template.fillers.enabled = true;
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let last_item = doc.pages[0]
        .tiles
        .iter()
        .find(|t| t.id == "item-i3")
        .unwrap();
    assert_eq!(last_item.grid_col, 0, "fillers claim the gap instead of centering");
    assert!(!filler_tiles(&doc).is_empty());
}

// ─── Fillers ────────────────────────────────────────────────────

fn filler_template() -> Template {
    let mut template = body_template(4);
    template.fillers.enabled = true;
    template.fillers.safe_zones = vec![SafeZone {
        start_row: RowBound::Row(0),
        end_row: RowBound::Last,
        start_col: 0,
        end_col: 2,
    }];
    template.fillers.variants = vec![
        FillerVariant {
            id: "leaf".to_string(),
            rows: 1,
            cols: 1,
        },
        FillerVariant {
            id: "block".to_string(),
            rows: 1,
            cols: 1,
        },
    ];
    template
}

#[test]
fn fillers_claim_only_empty_cells() {
    let template = filler_template();
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    // Audited: the validator proves fillers never overlap content.
    let doc = generate(&menu, &template, &audited()).unwrap();

    let fillers = filler_tiles(&doc);
    assert!(!fillers.is_empty());
    for filler in &fillers {
        assert_eq!(filler.layer, Layer::Background);
    }
}

#[test]
fn sequential_policy_round_robins_variants() {
    let template = filler_template();
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let variants: Vec<String> = filler_tiles(&doc)
        .iter()
        .map(|t| match &t.content {
            TileContent::Filler { variant } => variant.clone(),
            _ => unreachable!(),
        })
        .collect();
    assert!(variants.len() >= 2);
    assert_eq!(variants[0], "leaf");
    assert_eq!(variants[1], "block");
}

#[test]
fn generation_is_byte_deterministic() {
    let mut template = filler_template();
    template.fillers.policy = FillerPolicy::RandomSeeded;
    let menu = make_menu(vec![
        make_category("c1", 1, make_items(5)),
        make_category("c2", 2, make_items(4)),
    ]);

    let a = generate(&menu, &template, &audited()).unwrap();
    let b = generate(&menu, &template, &audited()).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap(),
        "identical inputs must reproduce the document byte for byte"
    );
}

#[test]
fn interspersed_fillers_stay_inside_section_rows() {
    let mut template = filler_template();
    template.fillers.mode = FillerMode::Interspersed;
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    for page in &doc.pages {
        let item_rows: BTreeSet<usize> = page
            .tiles
            .iter()
            .filter(|t| t.content.is_item())
            .map(|t| t.grid_row)
            .collect();
        for tile in &page.tiles {
            if matches!(tile.content, TileContent::Filler { .. }) {
                assert!(
                    item_rows.contains(&tile.grid_row),
                    "filler at row {} outside section rows {:?}",
                    tile.grid_row,
                    item_rows
                );
            }
        }
    }
}

#[test]
fn interspersed_mode_spreads_items_across_rows() {
    let mut template = filler_template();
    template.fillers.mode = FillerMode::Interspersed;
    // 4 items on 3 columns: flow mode would pack 3 + 1; the interspersed
    // plan spreads them 2 + 2.
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let mut per_row: std::collections::BTreeMap<usize, usize> = Default::default();
    for tile in doc.pages[0].tiles.iter().filter(|t| t.content.is_item()) {
        *per_row.entry(tile.grid_row).or_default() += 1;
    }
    let counts: Vec<usize> = per_row.values().copied().collect();
    assert_eq!(counts, vec![2, 2]);
}

#[test]
fn default_variant_used_when_template_declares_none() {
    let mut template = body_template(4);
    template.fillers.enabled = true;
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let doc = generate(&menu, &template, &audited()).unwrap();

    let fillers = filler_tiles(&doc);
    assert!(!fillers.is_empty());
    for tile in fillers {
        match &tile.content {
            TileContent::Filler { variant } => assert_eq!(variant, "half-opacity-block"),
            _ => unreachable!(),
        }
    }
}

#[test]
fn selection_can_disable_template_fillers() {
    let template = filler_template();
    let menu = make_menu(vec![make_category("c1", 1, make_items(4))]);
    let options = GenerateOptions {
        selection: Selection {
            fillers_enabled: Some(false),
            ..Default::default()
        },
        ..audited()
    };
    let doc = generate(&menu, &template, &options).unwrap();
    assert!(filler_tiles(&doc).is_empty());
}

// ─── Errors & facade ────────────────────────────────────────────

#[test]
fn malformed_menu_rejected_before_placement() {
    let template = body_template(4);
    let mut menu = make_menu(vec![make_category("c1", 1, make_items(2))]);
    menu.categories[0].items[0].price = -4.0;
    assert!(matches!(
        generate(&menu, &template, &audited()),
        Err(CartaError::MenuValidation(_))
    ));
}

#[test]
fn oversized_item_footprint_is_a_generation_error() {
    let mut template = body_template(4);
    // An item taller than any page body can ever be.
    template.budgets.item_card = TileBudget {
        rows: 9,
        cols: Some(1),
        height: 90.0,
    };
    let menu = make_menu(vec![make_category("c1", 1, make_items(2))]);
    assert!(matches!(
        generate(&menu, &template, &audited()),
        Err(CartaError::Generation(_))
    ));
}

#[test]
fn missing_section_slots_is_a_generation_error() {
    let mut template = body_template(4);
    template.limits.required_section_slots = Some(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(2))]);
    assert!(matches!(
        generate(&menu, &template, &audited()),
        Err(CartaError::Generation(_))
    ));
}

#[test]
fn engine_resolves_templates_by_id() {
    let mut registry = TemplateRegistry::new();
    registry.register(body_template(4)).unwrap();
    let engine = LayoutEngine::new(registry);
    let menu = make_menu(vec![make_category("c1", 1, make_items(3))]);

    let doc = engine.generate(&menu, "grid-test", &audited()).unwrap();
    assert_eq!(doc.template_id, "grid-test");

    assert!(matches!(
        engine.generate(&menu, "nope", &audited()),
        Err(CartaError::UnknownTemplate(_))
    ));
}

#[test]
fn json_surface_round_trips() {
    let template = body_template(4);
    let menu = make_menu(vec![make_category("c1", 1, make_items(3))]);
    let request = serde_json::json!({
        "menu": menu,
        "template": template,
        "options": { "validate": true }
    });
    let output = generate_json(&request.to_string()).unwrap();
    let doc: carta::document::LayoutDocument = serde_json::from_str(&output).unwrap();
    assert_eq!(doc.item_tile_count(), 3);
}

#[test]
fn json_parse_failure_carries_hint() {
    let err = generate_json("{ not json").unwrap_err();
    match err {
        CartaError::Parse { hint, .. } => assert!(!hint.is_empty()),
        other => panic!("expected Parse error, got {other:?}"),
    }
}
