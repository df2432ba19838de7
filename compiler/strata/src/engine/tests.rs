use super::*;
use crate::{InMemoryWeights, Tier};
use pretty_assertions::assert_eq;
use strata_compose::TierSet;
use strata_repair::testing::{FnValidator, ScriptedDecoder};
use strata_repair::{Decoded, RepairStatus, ValidatorKind};
use strata_types::{SymbolError, SymbolSink};

fn symbols(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
    let user = sink.registry().define_struct(
        "User",
        &[("id", TypeId::STRING), ("name", TypeId::STRING)],
        Vec::new(),
    );
    sink.bind("user", user)?;
    sink.bind("sep", TypeId::STRING)
}

fn engine() -> Engine {
    Engine::new(EngineConfig {
        max_depth: 2,
        ..EngineConfig::default()
    })
}

fn rendered(paths: &RankedPathSet) -> Vec<String> {
    paths.iter().map(ToString::to_string).collect()
}

#[test]
fn repeated_search_hits_the_cache() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();

    let cold = engine.find_paths(&ctx, TypeId::STRING).unwrap();
    let warm = engine.find_paths(&ctx, TypeId::STRING).unwrap();

    assert_eq!(cold, warm);
    assert_eq!(rendered(&warm), vec!["sep", "user.id", "user.name"]);
    let stats = engine.stats().paths;
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[test]
fn weight_store_reranks_results() {
    let store = Arc::new(InMemoryWeights::new());
    let scope = WeightScope::new("ts", "s1");
    store.update_weight(&scope.key("user.name"), 1.0);
    let engine = engine().with_store(store, scope);
    let ctx = engine.context(&symbols).unwrap();

    let paths = engine.find_paths(&ctx, TypeId::STRING).unwrap();
    assert_eq!(rendered(&paths), vec!["sep", "user.name", "user.id"]);
}

#[test]
fn uninhabited_target_is_reported_on_request() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();

    assert!(engine.find_paths(&ctx, TypeId::BOOLEAN).unwrap().is_empty());
    let err = engine.require_paths(&ctx, TypeId::BOOLEAN).unwrap_err();
    assert!(matches!(err, SynthesisError::NoInhabitant(_)));
    assert!(!err.is_fatal());
}

#[test]
fn compile_goes_through_the_grammar_cache() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();
    let paths = engine.find_paths(&ctx, TypeId::STRING).unwrap();
    let template = template::typescript_return();

    let first = engine.compile(&paths, &template, ctx.registry()).unwrap();
    let second = engine.compile(&paths, &template, ctx.registry()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.stats().grammars.hits, 1);
}

#[test]
fn request_builds_every_tier() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();
    let request = SynthesisRequest::new(&ctx, TypeId::STRING)
        .with_template(template::typescript_return())
        .with_example(TestCase::new("id", "u1", "\"u1\""))
        .with_weight("user.name", 0.8);

    let set = engine.constraints(&request).unwrap();
    assert_eq!(
        set.tiers(),
        TierSet::SYNTACTIC | TierSet::TYPE | TierSet::SEMANTIC | TierSet::CONTEXTUAL
    );
    assert_eq!(set.holes(), vec!["expr"]);
    assert_eq!(request.hole(), Some("expr"));
}

#[test]
fn synthesize_passes_clean_code() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();
    let paths = engine.find_paths(&ctx, TypeId::STRING).unwrap();
    let id = paths.iter().find(|p| p.to_string() == "user.id").unwrap().clone();
    let decoder =
        ScriptedDecoder::new().then(Decoded::new("return user.id;").with_provenance("expr", id));
    let validators: Vec<Arc<dyn Validator>> =
        vec![Arc::new(FnValidator::passing("tsc", ValidatorKind::Type))];

    let request =
        SynthesisRequest::new(&ctx, TypeId::STRING).with_template(template::typescript_return());
    let outcome = engine.synthesize(&request, &decoder, &validators).unwrap();

    assert_eq!(outcome.status, RepairStatus::Passed);
    assert_eq!(outcome.code.as_deref(), Some("return user.id;"));
    assert_eq!(
        decoder.seen()[0].holes[0].1,
        vec!["sep".to_owned(), "user.id".to_owned(), "user.name".to_owned()]
    );
}

#[test]
fn uninhabited_request_relaxes_to_an_open_hole() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();
    let decoder = ScriptedDecoder::new().then(Decoded::new("true"));

    let request = SynthesisRequest::new(&ctx, TypeId::BOOLEAN);
    let outcome = engine.synthesize(&request, &decoder, &[]).unwrap();

    assert!(outcome.is_passed());
    assert_eq!(outcome.attempts[0].relaxed, vec![Tier::Type]);
    assert!(decoder.seen()[0].holes.is_empty());
}

#[test]
fn clearing_drops_both_caches() {
    let engine = engine();
    let ctx = engine.context(&symbols).unwrap();
    let paths = engine.find_paths(&ctx, TypeId::STRING).unwrap();
    engine
        .compile(&paths, &template::expression(), ctx.registry())
        .unwrap();

    engine.clear_caches();
    let stats = engine.stats();
    assert_eq!((stats.paths.entries, stats.grammars.entries), (0, 0));
    assert!(stats.to_string().starts_with("paths: 0 entries"));
}
