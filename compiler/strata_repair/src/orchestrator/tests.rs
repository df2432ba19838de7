use std::sync::atomic::{self, AtomicUsize};

use super::*;
use crate::testing::{FnValidator, ScriptedDecoder};
use crate::SolverSearch;
use pretty_assertions::assert_eq;
use strata_compose::{Constraint, InMemoryWeights, PatternWeightStore, TierSet, WeightScope};
use strata_diagnostic::{lint, syntax_error, test_failure, type_mismatch, TestCase};
use strata_grammar::template;
use strata_solver::{find_paths, Path, RankedPathSet};
use strata_types::{SymbolError, SymbolSink, TypeContext, TypeContextBuilder, TypeId};

fn symbols(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
    let user = sink.registry().define_struct(
        "User",
        &[("id", TypeId::STRING), ("name", TypeId::STRING)],
        Vec::new(),
    );
    sink.bind("user", user)?;
    sink.bind("sep", TypeId::STRING)?;
    sink.bind("n", TypeId::NUMBER)
}

fn context() -> TypeContext {
    TypeContextBuilder::new(&symbols).build().unwrap()
}

fn strings(ctx: &TypeContext) -> RankedPathSet {
    find_paths(ctx, TypeId::STRING, 1)
}

fn path(ctx: &TypeContext, rendered: &str) -> Path {
    strings(ctx)
        .iter()
        .find(|p| p.to_string() == rendered)
        .unwrap()
        .clone()
}

/// `return <expr>;` decoded through `rendered`.
fn returning(ctx: &TypeContext, rendered: &str) -> Decoded {
    Decoded::new(format!("return {rendered};")).with_provenance("expr", path(ctx, rendered))
}

fn returns_string(ctx: &TypeContext) -> ConstraintSet {
    ConstraintSet::new()
        .with(Constraint::syntactic(template::typescript_return()))
        .with(Constraint::type_paths("expr", TypeId::STRING, strings(ctx)))
}

/// Reports a type error whenever the code mentions `sep`.
fn no_sep() -> Arc<dyn Validator> {
    Arc::new(FnValidator::new("tsc", ValidatorKind::Type, |req| {
        let mut found = Diagnostics::new();
        if req.code.contains("sep") {
            found.push(type_mismatch("expr", "string", "number"));
        }
        found
    }))
}

fn passing(kind: ValidatorKind) -> Arc<dyn Validator> {
    Arc::new(FnValidator::passing(kind.as_str(), kind))
}

#[test]
fn clean_code_passes_first_attempt() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new().then(returning(&ctx, "user.name"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validators([passing(ValidatorKind::Syntax), no_sep()])
        .run(returns_string(&ctx))
        .unwrap();

    assert!(outcome.is_passed());
    assert_eq!(outcome.code.as_deref(), Some("return user.name;"));
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.best, Some(0));
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(
        outcome.trace.to_string(),
        "1:generated -> 1:validating -> 1:passed"
    );
    assert!(decoder.seen()[0].lark.contains("\"user\" \".\" \"name\""));
}

#[test]
fn type_error_excludes_the_offered_set() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new()
        .then(returning(&ctx, "sep"))
        .then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(no_sep())
        .with_config(RepairConfig {
            max_depth: 1,
            ..RepairConfig::default()
        })
        .run(returns_string(&ctx))
        .unwrap();

    assert_eq!(outcome.status, RepairStatus::Passed);
    let seen = decoder.seen();
    assert_eq!(seen.len(), 2);
    // Nothing at depth 1 survives, so the emptied Type tier is relaxed.
    assert!(seen[1].holes.is_empty());
    assert!(!seen[1].lark.contains("\"sep\""));
    assert_eq!(outcome.attempts[1].relaxed, vec![Tier::Type]);
}

#[test]
fn used_exclusion_narrows_and_repairs() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new()
        .then(returning(&ctx, "sep"))
        .then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(no_sep())
        .with_config(RepairConfig {
            max_depth: 1,
            exclusion: Exclusion::Used,
            ..RepairConfig::default()
        })
        .run(returns_string(&ctx))
        .unwrap();

    assert_eq!(outcome.status, RepairStatus::Passed);
    assert_eq!(outcome.code.as_deref(), Some("return user.id;"));
    assert_eq!(outcome.best, Some(1));

    let seen = decoder.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[1].holes,
        vec![(
            "expr".to_owned(),
            vec!["user.id".to_owned(), "user.name".to_owned()]
        )]
    );
    assert!(!seen[1].lark.contains("\"sep\""));
    assert_eq!(
        outcome.trace.to_string(),
        "1:generated -> 1:validating -> 1:failed(type) -> 1:refining -> \
         2:regenerating -> 2:generated -> 2:validating -> 2:passed"
    );
    // First attempt's type error is kept in the merged diagnostics.
    assert_eq!(outcome.diagnostics.of_category(Category::Type).count(), 1);
}

#[test]
fn exhausted_returns_best_attempt() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new()
        .then(returning(&ctx, "sep"))
        .then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);
    let tests = Arc::new(FnValidator::new("jest", ValidatorKind::Semantic, |req| {
        let mut found = Diagnostics::new();
        if req.code.contains("user") {
            found.push(test_failure(TestCase::new("name", "u1", "\"Ann\"")));
            found.push(test_failure(TestCase::new("upper", "u1", "\"ANN\"")));
        }
        found
    }));

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validators([no_sep(), tests as Arc<dyn Validator>])
        .with_config(RepairConfig {
            max_attempts: 2,
            max_depth: 1,
            ..RepairConfig::default()
        })
        .run(returns_string(&ctx))
        .unwrap();

    assert_eq!(outcome.status, RepairStatus::Exhausted);
    // One hard error beats two.
    assert_eq!(outcome.best, Some(0));
    assert_eq!(outcome.code.as_deref(), Some("return sep;"));
    assert_eq!(outcome.provenance[0].path.to_string(), "sep");
    assert_eq!(outcome.diagnostics.len(), 3);
    assert_eq!(outcome.trace.current(), Some(RepairState::Exhausted));
    assert!(outcome
        .trace
        .to_string()
        .ends_with("2:failed(test) -> 2:exhausted"));
}

#[test]
fn syntax_errors_skip_remaining_validators() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new().then(Decoded::new("return user.;"));
    let search = SolverSearch::new(&ctx);
    let type_calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&type_calls);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(Arc::new(FnValidator::new("tsc", ValidatorKind::Type, move |_| {
            counted.fetch_add(1, atomic::Ordering::SeqCst);
            Diagnostics::new()
        })))
        .with_validator(Arc::new(FnValidator::new("parse", ValidatorKind::Syntax, |_| {
            let mut found = Diagnostics::new();
            found.push(syntax_error("expected identifier after `.`"));
            found
        })))
        .with_config(RepairConfig {
            max_attempts: 1,
            ..RepairConfig::default()
        })
        .run(returns_string(&ctx))
        .unwrap();

    assert_eq!(outcome.status, RepairStatus::Exhausted);
    assert_eq!(type_calls.load(atomic::Ordering::SeqCst), 0);
    let categories: Vec<_> = outcome.diagnostics.iter().map(|d| d.category).collect();
    assert_eq!(categories, vec![Category::Syntax]);
    // Exhausted still hands back the code.
    assert_eq!(outcome.code.as_deref(), Some("return user.;"));
}

#[test]
fn lint_warnings_do_not_fail_the_attempt() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new().then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(Arc::new(FnValidator::new("eslint", ValidatorKind::Lint, |_| {
            let mut found = Diagnostics::new();
            found.push(lint("prefer optional chaining"));
            found
        })))
        .run(returns_string(&ctx))
        .unwrap();

    assert!(outcome.is_passed());
    assert_eq!(outcome.diagnostics.summary().warnings, 1);
    let best = outcome.best_attempt().unwrap();
    assert!(best.score > 0.0);
}

#[test]
fn conflicting_tiers_are_relaxed() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new().then(Decoded::new("\"42\""));
    let search = SolverSearch::new(&ctx);
    let set = ConstraintSet::new()
        .with(Constraint::syntactic(template::string_literal()))
        .with(Constraint::type_paths(
            "value",
            TypeId::NUMBER,
            find_paths(&ctx, TypeId::NUMBER, 1),
        ));

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .run(set)
        .unwrap();

    assert!(outcome.is_passed());
    assert_eq!(outcome.attempts[0].relaxed, vec![Tier::Type]);
    assert_eq!(outcome.constraints.tiers(), TierSet::SYNTACTIC);
}

#[test]
fn cancellation_stops_between_attempts() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new()
        .then(returning(&ctx, "sep"))
        .then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);
    let interrupt = Interrupt::new();
    interrupt.cancel();

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(no_sep())
        .with_interrupt(&interrupt)
        .run(returns_string(&ctx))
        .unwrap();

    assert_eq!(outcome.status, RepairStatus::Cancelled);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(decoder.seen().len(), 1);
    assert_eq!(outcome.code.as_deref(), Some("return sep;"));
    assert!(outcome.trace.to_string().ends_with("1:failed(type) -> 1:cancelled"));
}

#[test]
fn late_decode_is_a_timeout() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new()
        .then_after(Duration::from_millis(200), returning(&ctx, "sep"))
        .then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_config(RepairConfig {
            decode_timeout: Duration::from_millis(50),
            ..RepairConfig::default()
        })
        .run(returns_string(&ctx))
        .unwrap();

    assert!(outcome.is_passed());
    let first = &outcome.attempts[0];
    assert_eq!(first.code, None);
    let categories: Vec<_> = first.diagnostics.iter().map(|d| d.category).collect();
    assert_eq!(categories, vec![Category::DecodeTimeout]);
    assert!(outcome
        .trace
        .to_string()
        .starts_with("1:failed(decode-timeout) -> 1:refining -> 2:regenerating"));
}

#[test]
fn decoder_failure_is_an_error() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder =
        ScriptedDecoder::new().then_err(DecodeError::Failed("connection reset".to_owned()));
    let search = SolverSearch::new(&ctx);

    let err = Orchestrator::new(&composer, &decoder, &search)
        .run(returns_string(&ctx))
        .unwrap_err();
    assert_eq!(
        err,
        RepairError::Decode(DecodeError::Failed("connection reset".to_owned()))
    );
}

#[test]
fn outcomes_feed_the_weight_store() {
    let ctx = context();
    let store = Arc::new(InMemoryWeights::new());
    let scope = WeightScope::new("ts", "s1");
    let composer = Composer::new(ctx.registry()).with_store(store.clone(), scope.clone());
    let decoder = ScriptedDecoder::new()
        .then(returning(&ctx, "sep"))
        .then(returning(&ctx, "user.id"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(no_sep())
        .run(returns_string(&ctx))
        .unwrap();

    assert!(outcome.is_passed());
    assert_eq!(store.get_weight(&scope.key("sep")), Some(0.0));
    assert_eq!(store.get_weight(&scope.key("user.id")), Some(1.0));
    assert_eq!(store.get_weight(&scope.key("user.name")), None);
}

#[test]
fn zero_attempts_still_runs_once() {
    let ctx = context();
    let composer = Composer::new(ctx.registry());
    let decoder = ScriptedDecoder::new().then(returning(&ctx, "sep"));
    let search = SolverSearch::new(&ctx);

    let outcome = Orchestrator::new(&composer, &decoder, &search)
        .with_validator(no_sep())
        .with_config(RepairConfig {
            max_attempts: 0,
            ..RepairConfig::default()
        })
        .run(returns_string(&ctx))
        .unwrap();

    assert_eq!(outcome.status, RepairStatus::Exhausted);
    assert_eq!(outcome.attempts.len(), 1);
}

#[test]
fn attempt_rank_prefers_code_then_fewer_errors() {
    let with_code = |hard: usize, warnings: usize, score: f64| AttemptRank {
        has_code: true,
        summary: Summary { hard, warnings },
        score,
    };
    let none = AttemptRank {
        has_code: false,
        summary: Summary::default(),
        score: 1.0,
    };
    assert_eq!(with_code(3, 0, 0.0).compare(&none), Ordering::Less);
    assert_eq!(with_code(1, 5, 0.0).compare(&with_code(2, 0, 1.0)), Ordering::Less);
    assert_eq!(with_code(1, 0, 0.0).compare(&with_code(1, 1, 0.0)), Ordering::Less);
    assert_eq!(with_code(1, 1, 0.9).compare(&with_code(1, 1, 0.1)), Ordering::Less);
}
