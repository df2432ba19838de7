//! Property tests for search and ranking.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]

use proptest::prelude::*;
use strata_solver::{find_paths, Path, RankedPathSet, SearchOptions, Solver};
use strata_types::{SymbolError, SymbolSink, TypeContext, TypeContextBuilder, TypeId};

/// Build a context with one binding `rec` of a struct whose fields have the
/// given types (`true` = string, `false` = number), named `f0`, `f1`, ...
fn record_context(fields: &[bool]) -> TypeContext {
    let source = |sink: &mut SymbolSink<'_>| -> Result<(), SymbolError> {
        let registry = sink.registry();
        let rec = registry.declare_struct("Rec");
        for (i, is_string) in fields.iter().enumerate() {
            let ty = if *is_string {
                TypeId::STRING
            } else {
                TypeId::NUMBER
            };
            registry.add_field(rec, &format!("f{i}"), ty);
        }
        sink.bind("rec", rec)
    };
    TypeContextBuilder::new(&source).build().unwrap()
}

proptest! {
    #[test]
    fn string_fields_in_declaration_order(fields in prop::collection::vec(any::<bool>(), 0..12)) {
        let ctx = record_context(&fields);
        let found: Vec<String> = find_paths(&ctx, TypeId::STRING, 2)
            .iter()
            .map(ToString::to_string)
            .collect();
        let expected: Vec<String> = fields
            .iter()
            .enumerate()
            .filter(|(_, is_string)| **is_string)
            .map(|(i, _)| format!("rec.f{i}"))
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn search_is_deterministic(
        fields in prop::collection::vec(any::<bool>(), 0..12),
        depth in 0u32..4,
    ) {
        let ctx = record_context(&fields);
        let options = SearchOptions::with_max_depth(depth);
        let a = Solver::new(&ctx).search(TypeId::STRING, &options).unwrap();
        let b = Solver::new(&ctx).search(TypeId::STRING, &options).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn ranking_is_idempotent(fields in prop::collection::vec(any::<bool>(), 0..12)) {
        let ctx = record_context(&fields);
        let ranked = find_paths(&ctx, TypeId::STRING, 2);
        let again = RankedPathSet::rank(ranked.iter().cloned());
        prop_assert_eq!(&ranked, &again);
        prop_assert!(ranked
            .iter()
            .zip(ranked.iter().skip(1))
            .all(|(a, b)| a.length() <= b.length()));
    }

    #[test]
    fn every_path_fits_its_target(fields in prop::collection::vec(any::<bool>(), 0..12)) {
        let ctx = record_context(&fields);
        let ranked = find_paths(&ctx, TypeId::STRING, 3);
        prop_assert!(ranked.iter().all(|p: &Path| ctx.registry().fits(p.ty(), p.target())));
    }
}
