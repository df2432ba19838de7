use super::*;
use crate::Param;
use pretty_assertions::assert_eq;

fn user_symbols(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
    let user = sink.registry().define_struct(
        "User",
        &[("id", TypeId::STRING), ("age", TypeId::NUMBER)],
        vec![("toString", Signature::returning(TypeId::STRING))],
    );
    sink.bind("user", user)?;
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

fn with_extra_binding(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
    user_symbols(sink)?;
    sink.bind("count", TypeId::NUMBER)
}

struct Python;

impl SymbolSource for Python {
    fn language(&self) -> &str {
        "python"
    }

    fn collect(&self, sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
        sink.bind("name", TypeId::STRING)?;
        sink.style(StyleSummary {
            language: "ignored".into(),
            indent: "\t".into(),
            naming: NamingConvention::SnakeCase,
        });
        Ok(())
    }
}

#[test]
fn builds_from_source() {
    let ctx = TypeContextBuilder::new(&user_symbols)
        .build()
        .expect("valid symbols");

    assert_eq!(ctx.bindings().len(), 1);
    assert_eq!(ctx.functions().len(), 2);
    let user = ctx.binding("user").map(|b| b.ty).expect("user bound");
    assert_eq!(ctx.registry().display(user), "User");
    assert_eq!(
        ctx.constructor_of(user).map(|f| f.name.as_str()),
        Some("User")
    );
    assert_eq!(ctx.function("greet").map(|f| f.kind), Some(FunctionKind::Free));
}

#[test]
fn language_comes_from_source() {
    let ctx = TypeContextBuilder::new(&Python).build().expect("valid");
    assert_eq!(ctx.style().language, "python");
    assert_eq!(ctx.style().indent, "\t");
    assert_eq!(ctx.style().naming, NamingConvention::SnakeCase);
}

#[test]
fn fingerprint_is_stable_for_same_symbols() {
    let a = TypeContextBuilder::new(&user_symbols).build().expect("valid");
    let b = TypeContextBuilder::new(&user_symbols).build().expect("valid");
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn fingerprint_changes_with_new_symbols() {
    let a = TypeContextBuilder::new(&user_symbols).build().expect("valid");
    let b = TypeContextBuilder::new(&with_extra_binding)
        .build()
        .expect("valid");
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn duplicate_binding_is_rejected() {
    fn twice(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
        sink.bind("x", TypeId::STRING)?;
        sink.bind("x", TypeId::NUMBER)
    }

    let err = TypeContextBuilder::new(&twice).build().unwrap_err();
    assert_eq!(err, SymbolError::DuplicateBinding("x".into()));
}

#[test]
fn dangling_type_id_is_rejected() {
    fn dangling(sink: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
        sink.bind("ghost", TypeId::from_raw(4096))
    }

    let err = TypeContextBuilder::new(&dangling).build().unwrap_err();
    assert!(matches!(err, SymbolError::UnknownType { ref symbol, .. } if symbol == "ghost"));
}

#[test]
fn prepopulated_registry_is_kept() {
    let mut registry = TypeRegistry::new();
    let int = registry.primitive("int");

    fn none(_: &mut SymbolSink<'_>) -> Result<(), SymbolError> {
        Ok(())
    }

    let ctx = TypeContextBuilder::new(&none)
        .with_registry(registry)
        .build()
        .expect("valid");
    assert_eq!(ctx.registry().display(int), "int");
}
