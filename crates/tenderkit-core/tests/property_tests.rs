//! # Property-Based Tests
//!
//! Invariants of the composition model under arbitrary edit sequences, and
//! cross-format agreement of the export renderer.

use chrono::{TimeZone, Utc};
use proptest::collection::vec;
use proptest::prelude::*;
use tenderkit_core::{
    Catalog, Category, CategoryId, Composition, ExportFormat, ReorderEngine, Renderer, SectorId,
    SubIndex, Subcriterion, decode_entries, import_canonical, verify_consistency,
};

// =============================================================================
// STRATEGIES
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Toggle(usize, usize),
    MoveCategory(usize, usize),
    MoveSub(usize, usize, usize),
    Remove(usize),
    Clear,
    Arrange(Vec<usize>),
}

fn cat(n: usize) -> CategoryId {
    CategoryId::new(format!("C{}", n))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (1usize..7, 0usize..5).prop_map(|(c, i)| Op::Toggle(c, i)),
        2 => (1usize..7, 0usize..9).prop_map(|(c, p)| Op::MoveCategory(c, p)),
        2 => (1usize..7, 0usize..5, 0usize..7).prop_map(|(c, i, p)| Op::MoveSub(c, i, p)),
        1 => (1usize..7).prop_map(Op::Remove),
        1 => Just(Op::Clear),
        1 => vec(1usize..7, 0..4).prop_map(Op::Arrange),
    ]
}

fn apply(composition: &mut Composition, op: &Op) -> bool {
    match op {
        Op::Toggle(c, i) => {
            ReorderEngine::toggle_subcriterion(composition, &cat(*c), SubIndex(*i)).is_ok()
        }
        Op::MoveCategory(c, p) => ReorderEngine::move_category(composition, &cat(*c), *p).is_ok(),
        Op::MoveSub(c, i, p) => {
            ReorderEngine::move_subcriterion(composition, &cat(*c), SubIndex(*i), *p).is_ok()
        }
        Op::Remove(c) => ReorderEngine::remove_category(composition, &cat(*c)).is_ok(),
        Op::Clear => {
            ReorderEngine::clear_all(composition);
            true
        }
        Op::Arrange(ids) => {
            let priority: Vec<CategoryId> = ids.iter().map(|c| cat(*c)).collect();
            ReorderEngine::arrange_by_priority(composition, &priority);
            true
        }
    }
}

/// Text every format can carry exactly: printable ASCII, tabs, newlines
/// and a few characters from the WinAnsi upper range.
fn text() -> impl Strategy<Value = String> {
    "[ -~\\t\\n’€é–“”Ü]{0,90}"
}

fn catalog_strategy() -> impl Strategy<Value = Vec<(String, Vec<(String, String)>)>> {
    vec((text(), vec((text(), text()), 1..5)), 1..6)
}

fn build_catalog(shape: &[(String, Vec<(String, String)>)]) -> Catalog {
    let categories = shape
        .iter()
        .enumerate()
        .map(|(n, (title, subs))| Category {
            id: cat(n + 1),
            title: title.clone(),
            subcriteria: subs
                .iter()
                .map(|(label, description)| Subcriterion {
                    label: label.clone(),
                    description: description.clone(),
                })
                .collect(),
        })
        .collect();
    Catalog::from_parts(SectorId::new("general"), categories, Vec::new()).expect("catalog")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Any edit sequence keeps the structural invariants; a refused edit
    /// changes nothing.
    #[test]
    fn edits_preserve_invariants(ops in vec(op(), 0..60)) {
        let mut composition = Composition::new(SectorId::new("general"));
        for op in &ops {
            let before = composition.clone();
            if !apply(&mut composition, op) {
                prop_assert_eq!(&composition, &before);
            }
            prop_assert!(composition.validate().is_ok(), "after {:?}", op);
        }
    }

    /// Moving to the current position is a no-op, and repeating a move
    /// changes nothing further.
    #[test]
    fn moves_are_idempotent(ops in vec(op(), 1..30), c in 1usize..7, p in 0usize..9) {
        let mut composition = Composition::new(SectorId::new("general"));
        for op in &ops {
            apply(&mut composition, op);
        }

        if let Some(position) = composition.category_order().iter().position(|id| *id == cat(c)) {
            let before = composition.clone();
            ReorderEngine::move_category(&mut composition, &cat(c), position).expect("move");
            prop_assert_eq!(&composition, &before);

            ReorderEngine::move_category(&mut composition, &cat(c), p).expect("move");
            let once = composition.clone();
            ReorderEngine::move_category(&mut composition, &cat(c), p).expect("move");
            prop_assert_eq!(&composition, &once);
        }
    }

    /// Toggling the same reference twice restores the selection, except
    /// that a category re-created by the second toggle moves to the end.
    #[test]
    fn double_toggle_restores_selection(ops in vec(op(), 0..30), c in 1usize..7, i in 0usize..5) {
        let mut composition = Composition::new(SectorId::new("general"));
        for op in &ops {
            apply(&mut composition, op);
        }
        let before = composition.clone();
        ReorderEngine::toggle_subcriterion(&mut composition, &cat(c), SubIndex(i)).expect("toggle");
        ReorderEngine::toggle_subcriterion(&mut composition, &cat(c), SubIndex(i)).expect("toggle");

        let mut expected = before.selection().clone();
        let mut actual = composition.selection().clone();
        // The reference itself may have moved to the end of its category.
        for refs in expected.values_mut().chain(actual.values_mut()) {
            refs.sort();
        }
        prop_assert_eq!(actual, expected);
    }

    /// All four formats decode to the same ordered triples as the
    /// traversal, and the canonical form re-imports to the same document.
    #[test]
    fn formats_agree(shape in catalog_strategy(), ops in vec(op(), 0..40)) {
        let catalog = build_catalog(&shape);
        let mut composition = Composition::new(SectorId::new("general"));
        for op in &ops {
            apply(&mut composition, op);
        }

        let at = Utc.with_ymd_and_hms(2025, 11, 20, 10, 0, 0).single().expect("date");
        let renderer = Renderer::new(&catalog);
        let document = renderer.document(&composition, at);
        let expected = document.entries();

        for format in ExportFormat::ALL {
            let artifact = renderer.render_at(&composition, format, at).expect("render");
            let decoded = decode_entries(format, &artifact.bytes).expect("decode");
            prop_assert_eq!(&decoded, &expected, "format {}", format);
        }

        let json = renderer.render_at(&composition, ExportFormat::Json, at).expect("render");
        let imported = import_canonical(&json.bytes).expect("import");
        prop_assert_eq!(&imported.sections, &document.sections);
        prop_assert!(verify_consistency(&imported).is_consistent());
    }
}
