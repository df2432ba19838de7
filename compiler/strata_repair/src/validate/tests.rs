use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use super::*;
use crate::testing::FnValidator;
use pretty_assertions::assert_eq;
use strata_diagnostic::{lint, syntax_error, Category};

fn request(code: &str) -> Arc<ValidationRequest> {
    Arc::new(ValidationRequest {
        code: code.to_owned(),
        provenance: Vec::new(),
        constraints: ConstraintSet::new(),
    })
}

fn reporting(name: &'static str, delay: Duration) -> Arc<dyn Validator> {
    Arc::new(FnValidator::new(name, ValidatorKind::Lint, move |_| {
        std::thread::sleep(delay);
        let mut found = Diagnostics::new();
        found.push(lint(name));
        found
    }))
}

#[test]
fn results_merge_in_validator_order() {
    // The first validator finishes last.
    let validators = vec![
        reporting("slow", Duration::from_millis(50)),
        reporting("fast", Duration::ZERO),
    ];
    let merged = run_validators(&validators, &request("x"), Duration::from_secs(5));

    let messages: Vec<_> = merged.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["slow", "fast"]);
}

#[test]
fn overrunning_validator_becomes_timeout_diagnostic() {
    let validators: Vec<Arc<dyn Validator>> = vec![
        reporting("quick", Duration::ZERO),
        Arc::new(FnValidator::sleeping(
            "stuck",
            ValidatorKind::Type,
            Duration::from_secs(2),
        )),
    ];
    let started = Instant::now();
    let merged = run_validators(&validators, &request("x"), Duration::from_millis(100));

    assert!(started.elapsed() < Duration::from_secs(2));
    let categories: Vec<_> = merged.iter().map(|d| d.category).collect();
    assert_eq!(categories, vec![Category::Lint, Category::ValidationTimeout]);
    assert!(merged.has_hard());
}

#[test]
fn panicking_validator_is_a_crash_not_a_timeout() {
    let validators: Vec<Arc<dyn Validator>> = vec![
        Arc::new(FnValidator::new("boom", ValidatorKind::Type, |_| -> Diagnostics {
            panic!("checker exploded")
        })),
        reporting("quick", Duration::ZERO),
    ];
    let started = Instant::now();
    let merged = run_validators(&validators, &request("x"), Duration::from_secs(2));

    assert!(started.elapsed() < Duration::from_secs(1));
    let categories: Vec<_> = merged.iter().map(|d| d.category).collect();
    assert_eq!(categories, vec![Category::ValidatorCrash, Category::Lint]);
    assert_eq!(
        merged.iter().next().unwrap().message,
        "validator `boom` panicked: checker exploded"
    );
}

#[test]
fn timeout_waits_for_the_deadline() {
    let validators: Vec<Arc<dyn Validator>> = vec![Arc::new(FnValidator::sleeping(
        "stuck",
        ValidatorKind::Type,
        Duration::from_millis(500),
    ))];
    let started = Instant::now();
    let merged = run_validators(&validators, &request("x"), Duration::from_millis(100));

    assert!(started.elapsed() >= Duration::from_millis(100));
    let categories: Vec<_> = merged.iter().map(|d| d.category).collect();
    assert_eq!(categories, vec![Category::ValidationTimeout]);
}

#[test]
fn validators_run_concurrently() {
    let validators: Vec<Arc<dyn Validator>> = (0..4)
        .map(|_| reporting("nap", Duration::from_millis(200)))
        .collect();
    let started = Instant::now();
    let merged = run_validators(&validators, &request("x"), Duration::from_secs(5));

    // Identical diagnostics collapse into one.
    assert_eq!(merged.len(), 1);
    if rayon::current_num_threads() >= 4 {
        assert!(started.elapsed() < Duration::from_millis(800));
    }
}

#[test]
fn every_validator_sees_the_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let validators: Vec<Arc<dyn Validator>> = (0..3)
        .map(|i| {
            let calls = Arc::clone(&calls);
            Arc::new(FnValidator::new(format!("v{i}"), ValidatorKind::Syntax, move |req| {
                calls.fetch_add(1, Ordering::SeqCst);
                let mut found = Diagnostics::new();
                if req.code.contains(';') {
                    found.push(syntax_error("stray semicolon"));
                }
                found
            })) as Arc<dyn Validator>
        })
        .collect();
    let merged = run_validators(&validators, &request("a;"), Duration::from_secs(5));

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(merged.of_category(Category::Syntax).count(), 1);
}

#[test]
fn no_validators_no_diagnostics() {
    let merged = run_validators(&[], &request("x"), Duration::from_millis(10));
    assert!(merged.is_empty());
}
