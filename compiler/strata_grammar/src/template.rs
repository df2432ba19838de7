//! Grammar templates and the built-in template library.
//!
//! A template is a grammar skeleton in which some positions are named holes.
//! The Syntactic constraint tier supplies the template; the Type tier's
//! paths are compiled into each hole.

use strata_types::{TypeId, TypeRegistry};

use crate::{Rule, Symbol};

/// How a constructor call is written in the target language.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConstructorStyle {
    /// `new User(args)`
    #[default]
    New,
    /// `User(args)`
    Call,
    /// `User::new(args)`
    PathNew,
}

/// What a hole accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HoleKind {
    /// Any expression path. `accepts` restricts the target type by its
    /// rendered name; `None` accepts every type.
    Expression { accepts: Option<Vec<String>> },

    /// A literal of one primitive type, matching `pattern`. Paths producing
    /// that type are accepted alongside the literal.
    Literal { ty_name: String, pattern: String },
}

/// A named hole and what it accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HoleSpec {
    pub name: String,
    pub kind: HoleKind,
}

impl HoleSpec {
    pub fn expression(name: impl Into<String>) -> Self {
        HoleSpec {
            name: name.into(),
            kind: HoleKind::Expression { accepts: None },
        }
    }

    pub fn literal(
        name: impl Into<String>,
        ty_name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        HoleSpec {
            name: name.into(),
            kind: HoleKind::Literal {
                ty_name: ty_name.into(),
                pattern: pattern.into(),
            },
        }
    }

    /// Check whether a value of `target` may fill this hole.
    ///
    /// On failure returns a description of what the hole accepts.
    pub fn accepts(&self, target: TypeId, registry: &TypeRegistry) -> Result<(), String> {
        let target_name = registry.display(target);
        match &self.kind {
            HoleKind::Expression { accepts: None } => Ok(()),
            HoleKind::Expression {
                accepts: Some(names),
            } => {
                if names.iter().any(|n| *n == target_name) {
                    Ok(())
                } else {
                    Err(names.join(" | "))
                }
            }
            HoleKind::Literal { ty_name, .. } => {
                if *ty_name == target_name {
                    Ok(())
                } else {
                    Err(format!("{ty_name} literals"))
                }
            }
        }
    }
}

/// Grammar skeleton with holes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GrammarTemplate {
    /// Stable identifier, part of grammar cache keys.
    pub id: String,
    /// Bumped whenever the rules change, part of grammar cache keys.
    pub version: u32,
    pub start: String,
    pub rules: Vec<Rule>,
    pub holes: Vec<HoleSpec>,
    pub ignore: Vec<String>,
    pub constructor_style: ConstructorStyle,
}

impl GrammarTemplate {
    pub fn hole(&self, name: &str) -> Option<&HoleSpec> {
        self.holes.iter().find(|h| h.name == name)
    }

    /// The hole [`compile`](crate::compile) fills: the first declared.
    pub fn primary_hole(&self) -> Option<&HoleSpec> {
        self.holes.first()
    }
}

// === Built-in library ===

const WHITESPACE: &str = r"[ \t\r\n]+";

fn single_hole(
    id: &str,
    version: u32,
    body: Vec<Symbol>,
    hole: HoleSpec,
    style: ConstructorStyle,
) -> GrammarTemplate {
    GrammarTemplate {
        id: id.to_owned(),
        version,
        start: "start".to_owned(),
        rules: vec![Rule::new("start", vec![body])],
        holes: vec![hole],
        ignore: vec![WHITESPACE.to_owned()],
        constructor_style: style,
    }
}

/// A bare expression.
pub fn expression() -> GrammarTemplate {
    single_hole(
        "expression",
        1,
        vec![Symbol::hole("expr")],
        HoleSpec::expression("expr"),
        ConstructorStyle::New,
    )
}

/// `return <expr>;` in TypeScript.
pub fn typescript_return() -> GrammarTemplate {
    single_hole(
        "typescript.return",
        1,
        vec![Symbol::lit("return"), Symbol::hole("expr"), Symbol::lit(";")],
        HoleSpec::expression("expr"),
        ConstructorStyle::New,
    )
}

/// `return <expr>;` in JavaScript.
pub fn javascript_return() -> GrammarTemplate {
    GrammarTemplate {
        id: "javascript.return".to_owned(),
        ..typescript_return()
    }
}

/// `return <expr>` in Python.
pub fn python_return() -> GrammarTemplate {
    single_hole(
        "python.return",
        1,
        vec![Symbol::lit("return"), Symbol::hole("expr")],
        HoleSpec::expression("expr"),
        ConstructorStyle::Call,
    )
}

/// Tail expression of a Rust block: `{ <expr> }`.
pub fn rust_tail() -> GrammarTemplate {
    single_hole(
        "rust.tail",
        1,
        vec![Symbol::lit("{"), Symbol::hole("expr"), Symbol::lit("}")],
        HoleSpec::expression("expr"),
        ConstructorStyle::PathNew,
    )
}

/// A double-quoted string literal, or an expression producing a string.
pub fn string_literal() -> GrammarTemplate {
    single_hole(
        "string.literal",
        1,
        vec![Symbol::hole("value")],
        HoleSpec::literal("value", "string", r#""[^"\\]*""#),
        ConstructorStyle::New,
    )
}

/// Look up a built-in template by id.
pub fn by_id(id: &str) -> Option<GrammarTemplate> {
    match id {
        "expression" => Some(expression()),
        "typescript.return" => Some(typescript_return()),
        "javascript.return" => Some(javascript_return()),
        "python.return" => Some(python_return()),
        "rust.tail" => Some(rust_tail()),
        "string.literal" => Some(string_literal()),
        _ => None,
    }
}

/// Return-position template for a language, falling back to [`expression`].
pub fn for_language(language: &str) -> GrammarTemplate {
    match language {
        "typescript" => typescript_return(),
        "javascript" => javascript_return(),
        "python" => python_return(),
        "rust" => rust_tail(),
        _ => expression(),
    }
}
