//! # Compatibility & Capacity Evaluator
//!
//! Decides whether a template can hold a menu at all, and how comfortably.
//! This is the single authority for pass/fail: the paginator trusts the
//! verdict and never re-derives capacity. Calling the paginator on an
//! INCOMPATIBLE result is a programming error.
//!
//! Capacity is slot arithmetic, not simulation:
//!
//! ```text
//! comfortable = baseItemSlots + floor(0.6 * repeatItemSlots)
//! maximum     = baseItemSlots + repeatItemSlots
//! ```
//!
//! where `baseItemSlots` counts item-shaped slots on a first/single page and
//! `repeatItemSlots` is the declared per-repeat slot count times the maximum
//! repeat count.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::menu::EngineMenu;
use crate::template::{Template, DEFAULT_HARD_MAX_ITEMS};
use crate::Selection;

/// Advisory verdict for a (menu, template) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatStatus {
    Ok,
    Warning,
    Incompatible,
}

impl fmt::Display for CompatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatStatus::Ok => write!(f, "OK"),
            CompatStatus::Warning => write!(f, "WARNING"),
            CompatStatus::Incompatible => write!(f, "INCOMPATIBLE"),
        }
    }
}

/// The evaluator's full answer: verdict, human-readable reasons, and the
/// numbers they were derived from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityReport {
    pub status: CompatStatus,
    /// The incompatibility reason, or accumulated warnings.
    pub messages: Vec<String>,
    pub total_items: usize,
    pub section_count: usize,
    pub image_fraction: f64,
    pub base_item_slots: usize,
    pub repeat_item_slots: usize,
    pub comfortable: usize,
    pub maximum: usize,
    /// The effective item ceiling: the declared `hardMaxItems` (or the
    /// global default), clamped to `maximum` so a non-INCOMPATIBLE verdict
    /// guarantees every item can actually be placed.
    pub hard_limit: usize,
}

impl CapacityReport {
    pub fn message(&self) -> String {
        self.messages.join("; ")
    }
}

/// Item slots the template exposes on a first/single page, using the same
/// footprint the placer will use for this selection.
pub fn base_item_slots(template: &Template, selection: &Selection) -> usize {
    let budget = if selection.text_only {
        &template.budgets.item_text_row
    } else {
        &template.budgets.item_card
    };
    let per_row = template.grid.cols / budget.col_span(template.grid.cols);
    if per_row == 0 || budget.rows == 0 {
        return 0;
    }
    let mut rows = template.body_rows(&template.page, false);
    if template.policies.reserve_footer_row {
        rows = rows.saturating_sub(1);
    }
    (rows / budget.rows) * per_row
}

/// Evaluate menu-against-template capacity. Decision rules run in order and
/// the first INCOMPATIBLE match wins; warnings only accumulate when no rule
/// rejects.
pub fn evaluate(menu: &EngineMenu, template: &Template, selection: &Selection) -> CapacityReport {
    let total_items = menu.total_items();
    let section_count = menu.sections.len();
    let image_fraction = menu.image_fraction();

    let base = base_item_slots(template, selection);
    let repeat = template.limits.repeat.slots_per_repeat * template.limits.repeat.max_repeats;
    let comfortable = base + (0.6 * repeat as f64).floor() as usize;
    let maximum = base + repeat;
    let declared_max = template
        .limits
        .hard_max_items
        .unwrap_or(DEFAULT_HARD_MAX_ITEMS);
    // A zero maximum means the template itself is broken (no item slots at
    // all); that is the paginator's structural error to report, not a
    // capacity verdict against the menu.
    let hard_limit = if maximum == 0 {
        declared_max
    } else {
        declared_max.min(maximum)
    };

    let mut report = CapacityReport {
        status: CompatStatus::Ok,
        messages: vec![],
        total_items,
        section_count,
        image_fraction,
        base_item_slots: base,
        repeat_item_slots: repeat,
        comfortable,
        maximum,
        hard_limit,
    };

    let limits = &template.limits;
    if section_count < limits.min_sections {
        report.status = CompatStatus::Incompatible;
        report.messages.push(format!(
            "menu has {section_count} sections but template requires at least {}",
            limits.min_sections
        ));
        return report;
    }
    if let Some(max_sections) = limits.max_sections {
        if section_count > max_sections {
            report.status = CompatStatus::Incompatible;
            report.messages.push(format!(
                "menu has {section_count} sections but template allows at most {max_sections}"
            ));
            return report;
        }
    }
    if total_items < limits.min_items {
        report.status = CompatStatus::Incompatible;
        report.messages.push(format!(
            "menu has {total_items} items but template requires at least {}",
            limits.min_items
        ));
        return report;
    }
    if total_items > hard_limit {
        report.status = CompatStatus::Incompatible;
        report.messages.push(format!(
            "menu has {total_items} items but template allows at most {hard_limit}"
        ));
        return report;
    }

    if limits.requires_images && image_fraction < 0.5 {
        report.messages.push(format!(
            "template expects item images but only {:.0}% of items have one",
            image_fraction * 100.0
        ));
    }
    if total_items > comfortable {
        report.messages.push(format!(
            "menu has {total_items} items, above the comfortable capacity of {comfortable}"
        ));
    }
    if !report.messages.is_empty() {
        report.status = CompatStatus::Warning;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{normalize, Category, Menu, MenuItem, MenuMetadata};
    use crate::template::{
        Band, CapacityLimits, ContentBudgets, FillerConfig, GridSpec, PageSpec,
        PlacementPolicies, RegionSpec, RepeatConfig, Template, TileBudget,
    };

    fn item(id: usize, with_image: bool) -> MenuItem {
        MenuItem {
            id: format!("i{id}"),
            name: format!("Item {id}"),
            description: None,
            price: 10.0,
            image_url: with_image.then(|| format!("https://img/{id}.jpg")),
            sort_order: id as i32,
            indicators: Default::default(),
        }
    }

    fn menu_with_items(count: usize, with_images: usize) -> EngineMenu {
        let items = (0..count).map(|i| item(i, i < with_images)).collect();
        let menu = Menu {
            id: "m1".to_string(),
            name: "Dinner".to_string(),
            metadata: MenuMetadata::default(),
            categories: vec![Category {
                id: "c1".to_string(),
                name: "Mains".to_string(),
                sort_order: 0,
                items,
            }],
            items: vec![],
        };
        normalize(&menu).unwrap()
    }

    /// 3 columns, 9 one-row item slots on the first page.
    fn nine_slot_template() -> Template {
        Template {
            id: "nine".to_string(),
            version: "1".to_string(),
            page: PageSpec {
                width: 816.0,
                height: 48.0 + 3.0 * 104.0 - 8.0 + 48.0,
                margin: crate::template::Edges::uniform(48.0),
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
            budgets: ContentBudgets {
                item_card: TileBudget {
                    rows: 1,
                    cols: Some(1),
                    height: 90.0,
                },
                ..Default::default()
            },
            fillers: FillerConfig::default(),
            policies: PlacementPolicies::default(),
            limits: CapacityLimits::default(),
            statics: vec![],
        }
    }

    #[test]
    fn base_slots_from_grid_geometry() {
        let t = nine_slot_template();
        assert_eq!(base_item_slots(&t, &Selection::default()), 9);
    }

    #[test]
    fn nine_items_fit_comfortably() {
        let t = nine_slot_template();
        let report = evaluate(&menu_with_items(9, 0), &t, &Selection::default());
        assert_eq!(report.status, CompatStatus::Ok);
        assert_eq!(report.comfortable, 9);
        assert_eq!(report.maximum, 9);
    }

    #[test]
    fn repeat_slots_extend_capacity() {
        let mut t = nine_slot_template();
        t.limits.repeat = RepeatConfig {
            slots_per_repeat: 3,
            max_repeats: 10,
        };
        let report = evaluate(&menu_with_items(20, 0), &t, &Selection::default());
        assert_eq!(report.maximum, 39);
        assert_eq!(report.comfortable, 9 + 18);
        assert_eq!(report.status, CompatStatus::Ok);
    }

    #[test]
    fn over_comfortable_warns() {
        let mut t = nine_slot_template();
        t.limits.repeat = RepeatConfig {
            slots_per_repeat: 3,
            max_repeats: 10,
        };
        let report = evaluate(&menu_with_items(30, 0), &t, &Selection::default());
        assert_eq!(report.status, CompatStatus::Warning);
        assert!(report.message().contains("comfortable"));
    }

    #[test]
    fn hard_max_rejection_names_both_numbers() {
        let mut t = nine_slot_template();
        t.limits.repeat = RepeatConfig {
            slots_per_repeat: 10,
            max_repeats: 20,
        };
        t.limits.hard_max_items = Some(50);
        let report = evaluate(&menu_with_items(60, 0), &t, &Selection::default());
        assert_eq!(report.status, CompatStatus::Incompatible);
        let msg = report.message();
        assert!(msg.contains("50"), "message should name the limit: {msg}");
        assert!(msg.contains("60"), "message should name the count: {msg}");
    }

    #[test]
    fn too_few_items_incompatible() {
        let mut t = nine_slot_template();
        t.limits.min_items = 5;
        let report = evaluate(&menu_with_items(2, 0), &t, &Selection::default());
        assert_eq!(report.status, CompatStatus::Incompatible);
    }

    #[test]
    fn section_bounds_checked_first() {
        let mut t = nine_slot_template();
        t.limits.min_sections = 2;
        t.limits.min_items = 100;
        let report = evaluate(&menu_with_items(2, 0), &t, &Selection::default());
        // Section rule fires before the item rule.
        assert!(report.message().contains("sections"));
    }

    #[test]
    fn missing_images_warn() {
        let mut t = nine_slot_template();
        t.limits.requires_images = true;
        let report = evaluate(&menu_with_items(9, 2), &t, &Selection::default());
        assert_eq!(report.status, CompatStatus::Warning);
        assert!(report.message().contains("images"));
    }

    #[test]
    fn text_only_selection_changes_slot_math() {
        let mut t = nine_slot_template();
        // Text rows are 1x1 like the cards here, but on a taller body they
        // pack differently; shrink the card to 2 rows to see the difference.
        t.budgets.item_card.rows = 2;
        t.budgets.item_card.height = 190.0;
        let card_slots = base_item_slots(&t, &Selection::default());
        let text_slots = base_item_slots(
            &t,
            &Selection {
                text_only: true,
                ..Default::default()
            },
        );
        assert_eq!(card_slots, 3);
        assert_eq!(text_slots, 9);
    }
}
