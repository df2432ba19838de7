use super::*;
use crate::Provenance;
use pretty_assertions::assert_eq;
use strata_compose::Constraint;
use strata_diagnostic::{lint, test_failure, type_mismatch, Diagnostic, TestCase};
use strata_solver::find_paths;
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

fn context() -> TypeContext {
    strata_types::TypeContextBuilder::new(&symbols).build().unwrap()
}

fn strings(ctx: &TypeContext) -> RankedPathSet {
    find_paths(ctx, TypeId::STRING, 1)
}

fn used(ctx: &TypeContext, rendered: &str) -> Provenance {
    let path = strings(ctx)
        .iter()
        .find(|p| p.to_string() == rendered)
        .unwrap()
        .clone();
    Provenance {
        hole: "expr".to_owned(),
        path,
    }
}

fn offered(set: &ConstraintSet, hole: &str) -> Vec<String> {
    set.for_hole(hole)
        .flat_map(|t| t.paths.iter().map(ToString::to_string))
        .collect()
}

fn diagnostics(items: impl IntoIterator<Item = Diagnostic>) -> Diagnostics {
    let mut out = Diagnostics::new();
    out.extend(items);
    out
}

fn type_error() -> Diagnostics {
    diagnostics([type_mismatch("expr", "string", "number")])
}

#[test]
fn type_error_excludes_everything_offered() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1);
    let all = strings(&ctx);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, all.clone()));

    let edits = refiner
        .refine(
            &mut set,
            &type_error(),
            &[used(&ctx, "sep")],
            &[("expr".to_owned(), all)],
        )
        .unwrap();

    assert_eq!(edits[0].to_string(), "narrowed `expr`: 3 excluded, 0 remaining");
    assert_eq!(refiner.excluded("expr"), 3);
    assert!(offered(&set, "expr").is_empty());
}

#[test]
fn offered_set_defaults_to_the_current_constraint() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1);
    let narrowed = strings(&ctx).retain(|p| p.to_string() != "sep");
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, narrowed));

    refiner.refine(&mut set, &type_error(), &[], &[]).unwrap();

    // Only what the hole held is excluded, so `sep` comes back.
    assert_eq!(refiner.excluded("expr"), 2);
    assert_eq!(offered(&set, "expr"), vec!["sep"]);
}

#[test]
fn used_exclusion_drops_only_the_path_used() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1).with_exclusion(Exclusion::Used);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, strings(&ctx)));

    let edits = refiner
        .refine(&mut set, &type_error(), &[used(&ctx, "sep")], &[])
        .unwrap();

    assert_eq!(
        edits,
        vec![Edit::NarrowedType {
            hole: "expr".to_owned(),
            excluded: 1,
            remaining: 2,
        }]
    );
    assert_eq!(offered(&set, "expr"), vec!["user.id", "user.name"]);
}

#[test]
fn exclusions_accumulate_across_attempts() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1).with_exclusion(Exclusion::Used);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, strings(&ctx)));

    refiner
        .refine(&mut set, &type_error(), &[used(&ctx, "sep")], &[])
        .unwrap();
    refiner
        .refine(&mut set, &type_error(), &[used(&ctx, "user.id")], &[])
        .unwrap();

    assert_eq!(refiner.excluded("expr"), 2);
    assert_eq!(offered(&set, "expr"), vec!["user.name"]);
}

#[test]
fn used_exclusion_without_provenance_excludes_the_offered_set() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1).with_exclusion(Exclusion::Used);
    let all = strings(&ctx);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, all.clone()));

    let edits = refiner
        .refine(&mut set, &type_error(), &[], &[("expr".to_owned(), all)])
        .unwrap();

    assert_eq!(edits[0].to_string(), "narrowed `expr`: 3 excluded, 0 remaining");
    assert!(offered(&set, "expr").is_empty());
}

#[test]
fn failing_test_becomes_example() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1);
    let mut set = ConstraintSet::new();
    let case = TestCase::new("name", "{ id: 1 }", "\"Ann\"").with_actual("\"1\"");

    let edits = refiner
        .refine(&mut set, &diagnostics([test_failure(case.clone())]), &[], &[])
        .unwrap();

    assert_eq!(
        edits,
        vec![Edit::AddedExample {
            name: "name".to_owned()
        }]
    );
    assert_eq!(set.semantic().next().unwrap().examples, vec![case]);
}

#[test]
fn lint_needs_no_edit() {
    let ctx = context();
    let search = SolverSearch::new(&ctx);
    let mut refiner = Refiner::new(&search, 1);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, strings(&ctx)));
    let before = set.clone();

    let edits = refiner
        .refine(&mut set, &diagnostics([lint("prefer const")]), &[used(&ctx, "sep")], &[])
        .unwrap();

    assert!(edits.is_empty());
    assert_eq!(set, before);
}

#[test]
fn cancelled_search_propagates() {
    let cancelled = |_: TypeId, _: &SearchOptions| -> Result<RankedPathSet, SolveError> {
        Err(SolveError::Cancelled)
    };
    let ctx = context();
    let mut refiner = Refiner::new(&cancelled, 1);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, strings(&ctx)));

    let result = refiner.refine(&mut set, &type_error(), &[used(&ctx, "sep")], &[]);
    assert_eq!(result, Err(SolveError::Cancelled));
}

#[test]
fn failed_search_keeps_the_constraint() {
    let failing = |target: TypeId, _: &SearchOptions| -> Result<RankedPathSet, SolveError> {
        Err(SolveError::UnknownTarget(target))
    };
    let ctx = context();
    let mut refiner = Refiner::new(&failing, 1);
    let mut set =
        ConstraintSet::new().with(Constraint::type_paths("expr", TypeId::STRING, strings(&ctx)));

    let edits = refiner
        .refine(&mut set, &type_error(), &[used(&ctx, "sep")], &[])
        .unwrap();

    assert!(edits.is_empty());
    assert_eq!(offered(&set, "expr").len(), 3);
}
