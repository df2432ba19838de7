use super::*;
use pretty_assertions::assert_eq;
use strata_types::{Param, SymbolError, SymbolSink, TypeContextBuilder};

fn symbols(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
    let user = sink.registry().define_struct(
        "User",
        &[("id", TypeId::STRING), ("age", TypeId::NUMBER)],
        vec![(
            "format",
            Signature::new(vec![Param::new("pattern", TypeId::STRING)], TypeId::STRING),
        )],
    );
    sink.bind("user", user)?;
    sink.bind("label", TypeId::STRING)?;
    sink.function(
        "greet",
        Signature::new(vec![Param::new("who", user)], TypeId::STRING),
    );
    sink.constructor(
        "User",
        Signature::new(vec![Param::new("id", TypeId::STRING)], user),
    );
    Ok(())
}

fn context() -> TypeContext {
    TypeContextBuilder::new(&symbols).build().unwrap()
}

fn user_ty(ctx: &TypeContext) -> TypeId {
    ctx.binding("user").unwrap().ty
}

fn ident(name: &str) -> Step {
    Step::Identity {
        binding: name.into(),
    }
}

fn arg(ctx: &TypeContext, param: &str, binding: &str) -> Argument {
    let ty = ctx.binding(binding).unwrap().ty;
    let candidate = Path::new([ident(binding)], ty, ctx).unwrap();
    Argument {
        param: param.into(),
        ty,
        candidates: RankedPathSet::rank([candidate]),
    }
}

#[test]
fn identity_has_zero_length() {
    let ctx = context();
    let path = Path::new([ident("label")], TypeId::STRING, &ctx).unwrap();
    assert!(path.is_identity());
    assert_eq!(path.length(), 0);
    assert_eq!(path.fitness(), Fitness::Exact);
    assert_eq!(path.to_string(), "label");
}

#[test]
fn property_access_replays_to_field_type() {
    let ctx = context();
    let path = Path::new(
        [ident("user"), Step::PropertyAccess { name: "id".into() }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap();
    assert_eq!(path.ty(), TypeId::STRING);
    assert_eq!(path.length(), 1);
    assert_eq!(path.to_string(), "user.id");
}

#[test]
fn wrong_field_type_is_rejected() {
    let ctx = context();
    let err = Path::new(
        [ident("user"), Step::PropertyAccess { name: "age".into() }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PathError::TypeMismatch {
            found: TypeId::NUMBER,
            target: TypeId::STRING,
        }
    );
}

#[test]
fn widening_into_union_is_accepted() {
    let mut registry = TypeRegistry::new();
    let optional = registry.union([TypeId::STRING, TypeId::NULL]);
    let ctx = TypeContextBuilder::new(&|sink: &mut SymbolSink<'_>| {
        sink.bind("name", TypeId::STRING)
    })
    .with_registry(registry)
    .build()
    .unwrap();
    let path = Path::new([ident("name")], optional, &ctx).unwrap();
    assert_eq!(path.fitness(), Fitness::Widening);
    assert_eq!(path.target(), optional);
}

#[test]
fn call_length_includes_best_argument() {
    let ctx = context();
    let nested = Path::new(
        [ident("user"), Step::PropertyAccess { name: "id".into() }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap();
    let args = vec![Argument {
        param: "pattern".into(),
        ty: TypeId::STRING,
        candidates: RankedPathSet::rank([nested]),
    }];
    let path = Path::new(
        [ident("user"), Step::MethodCall { name: "format".into(), args }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap();
    assert_eq!(path.length(), 2);
    assert_eq!(path.to_string(), "user.format(user.id)");
    assert_eq!(path.pattern_id(), "user.format(_)");
}

#[test]
fn application_and_constructor_render() {
    let ctx = context();
    let user = user_ty(&ctx);
    let greet = Path::new(
        [Step::FunctionApplication {
            name: "greet".into(),
            args: vec![arg(&ctx, "who", "user")],
        }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap();
    assert_eq!(greet.to_string(), "greet(user)");
    assert_eq!(greet.length(), 1);

    let built = Path::new(
        [Step::Constructor {
            ty: user,
            name: "User".into(),
            args: vec![arg(&ctx, "id", "label")],
        }],
        user,
        &ctx,
    )
    .unwrap();
    assert_eq!(built.to_string(), "new User(label)");
    assert_eq!(built.pattern_id(), "new User(_)");
}

#[test]
fn arity_is_checked() {
    let ctx = context();
    let err = Path::new(
        [Step::FunctionApplication {
            name: "greet".into(),
            args: Vec::new(),
        }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PathError::ArityMismatch {
            callee: "greet".into(),
            expected: 1,
            found: 0,
        }
    );
}

#[test]
fn argument_candidates_must_fit_parameter() {
    let ctx = context();
    let err = Path::new(
        [Step::FunctionApplication {
            name: "greet".into(),
            args: vec![arg(&ctx, "who", "label")],
        }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap_err();
    assert!(matches!(err, PathError::ArgumentMismatch { .. }));
}

#[test]
fn member_step_cannot_start_a_path() {
    let ctx = context();
    let err = Path::new(
        [Step::PropertyAccess { name: "id".into() }],
        TypeId::STRING,
        &ctx,
    )
    .unwrap_err();
    assert_eq!(err, PathError::RootExpected { index: 0 });
}

#[test]
fn root_step_cannot_follow_another() {
    let ctx = context();
    let err = Path::new([ident("user"), ident("label")], TypeId::STRING, &ctx).unwrap_err();
    assert_eq!(err, PathError::MemberExpected { index: 1 });
}

#[test]
fn empty_and_unknown_are_rejected() {
    let ctx = context();
    assert_eq!(
        Path::new(Vec::new(), TypeId::STRING, &ctx).unwrap_err(),
        PathError::Empty
    );
    assert_eq!(
        Path::new([ident("nobody")], TypeId::STRING, &ctx).unwrap_err(),
        PathError::UnknownBinding("nobody".into())
    );
}

#[test]
fn key_ignores_target() {
    let mut registry = TypeRegistry::new();
    let optional = registry.union([TypeId::STRING, TypeId::NULL]);
    let ctx = TypeContextBuilder::new(&|sink: &mut SymbolSink<'_>| {
        sink.bind("name", TypeId::STRING)
    })
    .with_registry(registry)
    .build()
    .unwrap();
    let exact = Path::new([ident("name")], TypeId::STRING, &ctx).unwrap();
    let widened = Path::new([ident("name")], optional, &ctx).unwrap();
    assert_eq!(exact.key(), widened.key());
    assert_ne!(exact, widened);
}

#[test]
fn extend_appends_checked_step() {
    let ctx = context();
    let user = user_ty(&ctx);
    let base = Path::new([ident("user")], user, &ctx).unwrap();
    let extended = base
        .extend(Step::PropertyAccess { name: "id".into() }, TypeId::STRING, &ctx)
        .unwrap();
    assert_eq!(extended.steps().len(), 2);
    assert!(base
        .extend(Step::PropertyAccess { name: "missing".into() }, TypeId::STRING, &ctx)
        .is_err());
}

fn overloaded(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
    let point = sink.registry().declare_struct("Point");
    sink.bind("n", TypeId::NUMBER)?;
    sink.bind("on", TypeId::BOOLEAN)?;
    sink.function(
        "show",
        Signature::new(vec![Param::new("value", TypeId::NUMBER)], TypeId::STRING),
    );
    sink.function(
        "show",
        Signature::new(vec![Param::new("flag", TypeId::BOOLEAN)], TypeId::STRING),
    );
    sink.constructor(
        "Point",
        Signature::new(vec![Param::new("x", TypeId::NUMBER)], point),
    );
    sink.constructor(
        "Point",
        Signature::new(vec![Param::new("visible", TypeId::BOOLEAN)], point),
    );
    Ok(())
}

#[test]
fn every_overload_replays() {
    let ctx = TypeContextBuilder::new(&overloaded).build().unwrap();
    let point = ctx.functions()[2].sig.ret;

    let strings: Vec<String> = crate::find_paths(&ctx, TypeId::STRING, 1)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(strings, vec!["show(n)", "show(on)"]);

    let points: Vec<String> = crate::find_paths(&ctx, point, 1)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(points, vec!["new Point(n)", "new Point(on)"]);
}
