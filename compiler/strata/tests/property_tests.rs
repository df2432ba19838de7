//! Engine-level properties: identity first, prefix property through the
//! grammar cache, and cache determinism.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "tests panic on failure")]

use proptest::prelude::*;
use strata::{
    template, Engine, EngineConfig, Grammar, Recognition, SymbolError, SymbolSink, TypeId,
};
use strata_grammar::{Symbol, Terminal};
use strata_types::{Param, Signature};

/// `fields` extra string fields on `Account`, plus `extra` string bindings.
fn symbols(fields: usize, extra: usize) -> impl Fn(&mut SymbolSink<'_>) -> Result<(), SymbolError> {
    move |sink| {
        let names: Vec<String> = (0..fields).map(|i| format!("f{i}")).collect();
        let field_defs: Vec<(&str, TypeId)> =
            names.iter().map(|n| (n.as_str(), TypeId::STRING)).collect();
        let account = sink.registry().define_struct(
            "Account",
            &field_defs,
            vec![(
                "label",
                Signature::new(vec![Param::new("prefix", TypeId::STRING)], TypeId::STRING),
            )],
        );
        sink.bind("account", account)?;
        sink.bind("count", TypeId::NUMBER)?;
        for i in 0..extra {
            sink.bind(&format!("s{i}"), TypeId::STRING)?;
        }
        sink.function(
            "describe",
            Signature::new(vec![Param::new("n", TypeId::NUMBER)], TypeId::STRING),
        );
        Ok(())
    }
}

fn derive_sentence(
    grammar: &Grammar,
    rule: &str,
    choices: &mut impl Iterator<Item = usize>,
    out: &mut Vec<String>,
) {
    let rule = grammar.rule(rule).unwrap();
    let pick = choices.next().unwrap_or(0) % rule.alternatives.len();
    for sym in &rule.alternatives[pick] {
        match sym {
            Symbol::Terminal(Terminal::Literal(text)) => out.push(text.clone()),
            Symbol::Rule(name) => derive_sentence(grammar, name, choices, out),
            Symbol::Terminal(Terminal::Regex(_)) | Symbol::Hole(_) => {
                panic!("unexpected symbol {sym:?}")
            }
        }
    }
}

proptest! {
    #[test]
    fn identity_path_ranks_first(fields in 0usize..5, extra in 1usize..4, depth in 1u32..4) {
        let engine = Engine::new(EngineConfig { max_depth: depth, ..EngineConfig::default() });
        let ctx = engine.context(&symbols(fields, extra)).unwrap();

        let paths = engine.find_paths(&ctx, TypeId::STRING).unwrap();
        let first = paths.first().unwrap();
        prop_assert!(first.is_identity());
        prop_assert_eq!(first.length(), 0);
    }

    #[test]
    fn cached_grammars_keep_the_prefix_property(
        fields in 0usize..4,
        depth in 1u32..3,
        choices in prop::collection::vec(0usize..16, 0..32),
    ) {
        let engine = Engine::new(EngineConfig { max_depth: depth, ..EngineConfig::default() });
        let ctx = engine.context(&symbols(fields, 1)).unwrap();
        let paths = engine.find_paths(&ctx, TypeId::STRING).unwrap();
        let template = template::typescript_return();

        // Second compile is served from the cache.
        engine.compile(&paths, &template, ctx.registry()).unwrap();
        let grammar = engine.compile(&paths, &template, ctx.registry()).unwrap();
        prop_assert_eq!(engine.stats().grammars.hits, 1);

        let mut sentence = Vec::new();
        derive_sentence(&grammar, grammar.start(), &mut choices.into_iter(), &mut sentence);
        for cut in 0..sentence.len() {
            let partial = grammar.recognize(&sentence[..cut]).unwrap();
            prop_assert!(
                matches!(partial, Recognition::Prefix | Recognition::Complete),
                "prefix {:?} rejected: {:?}", &sentence[..cut], partial
            );
        }
        prop_assert_eq!(grammar.recognize(&sentence).unwrap(), Recognition::Complete);
    }

    #[test]
    fn cold_and_cached_grammars_are_byte_identical(fields in 0usize..5, depth in 0u32..3) {
        let ctx_engine = Engine::default();
        let ctx = ctx_engine.context(&symbols(fields, 1)).unwrap();
        let paths = strata_solver::find_paths(&ctx, TypeId::STRING, depth);
        let template = template::python_return();

        let engine = Engine::default();
        let cold = engine.compile(&paths, &template, ctx.registry()).unwrap().to_lark();
        let warm = engine.compile(&paths, &template, ctx.registry()).unwrap().to_lark();
        let fresh = strata_grammar::compile(&paths, &template, ctx.registry()).unwrap().to_lark();

        prop_assert_eq!(&cold, &warm);
        prop_assert_eq!(&cold, &fresh);
    }
}
