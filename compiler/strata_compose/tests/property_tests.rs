//! Property tests for composition and scoring.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]

use proptest::prelude::*;
use strata_compose::{compose, Constraint, ConstraintSet, ScoreBlend, ScoringFn, Tier};
use strata_solver::find_paths;
use strata_types::{SymbolError, SymbolSink, TypeContext, TypeContextBuilder, TypeId};

fn record_context(fields: usize) -> TypeContext {
    let source = |sink: &mut SymbolSink<'_>| -> Result<(), SymbolError> {
        let registry = sink.registry();
        let rec = registry.declare_struct("Rec");
        for i in 0..fields {
            registry.add_field(rec, &format!("f{i}"), TypeId::STRING);
        }
        sink.bind("rec", rec)
    };
    TypeContextBuilder::new(&source).build().unwrap()
}

fn tier() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::Syntactic),
        Just(Tier::Type),
        Just(Tier::Semantic),
        Just(Tier::Contextual),
    ]
}

proptest! {
    #[test]
    fn soft_weights_keep_every_path(
        fields in 1usize..10,
        weights in prop::collection::vec(0.0f64..=1.0, 0..10),
        blend in 0.0f64..=1.0,
    ) {
        let ctx = record_context(fields);
        let paths = find_paths(&ctx, TypeId::STRING, 2);
        let mut set = ConstraintSet::new()
            .with(Constraint::type_paths("expr", TypeId::STRING, paths.clone()));
        let hard = compose(&set, ctx.registry()).unwrap();
        for (i, weight) in weights.iter().enumerate() {
            set.push(Constraint::contextual(format!("rec.f{i}"), *weight));
        }
        let soft = compose(&set, ctx.registry()).unwrap();

        prop_assert_eq!(hard.lark(), soft.lark());
        let reranked = soft.paths("expr").unwrap();
        prop_assert_eq!(reranked.len(), paths.len());
        prop_assert!(paths.keys().all(|k| reranked.contains_key(k)));

        let scoring = ScoringFn::new(ScoreBlend::new(blend));
        prop_assert!(paths.iter().all(|p| (0.0..=1.0).contains(&scoring.score(p))));
    }

    #[test]
    fn relaxation_terminates_and_keeps_syntax(tiers in prop::collection::vec(tier(), 0..12)) {
        let mut set: ConstraintSet = tiers
            .iter()
            .map(|tier| match tier {
                Tier::Syntactic => Constraint::syntactic(strata_grammar::template::expression()),
                Tier::Type => Constraint::type_paths("expr", TypeId::STRING, Default::default()),
                Tier::Semantic => Constraint::examples(Vec::new()),
                Tier::Contextual => Constraint::contextual("x", 0.5),
            })
            .collect();
        let had_syntax = set.template().is_some();

        let mut dropped = Vec::new();
        while let Some(tier) = set.relax() {
            prop_assert!(tier != Tier::Syntactic);
            prop_assert!(!dropped.contains(&tier));
            dropped.push(tier);
        }
        prop_assert!(dropped.len() <= 3);
        prop_assert_eq!(set.template().is_some(), had_syntax);
        prop_assert_eq!(set.len(), tiers.iter().filter(|t| **t == Tier::Syntactic).count());
    }
}
