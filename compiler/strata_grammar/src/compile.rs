//! Path sets to grammar rules.

use rustc_hash::FxHashMap;
use strata_solver::{Argument, Path, PathKey, RankedPathSet, Step};
use strata_stack::with_stack;
use strata_types::{TypeId, TypeRegistry};

use crate::template::{ConstructorStyle, GrammarTemplate, HoleKind, HoleSpec};
use crate::{
    CompileError, ConstraintConflict, Grammar, GrammarCompilationError, InvalidGrammar, Rule,
    Symbol,
};

/// Paths for one named hole.
#[derive(Copy, Clone, Debug)]
pub struct HoleFill<'a> {
    pub hole: &'a str,
    pub paths: &'a RankedPathSet,
    /// Type the hole must produce. Checked against the hole even when
    /// `paths` is empty.
    pub target: Option<TypeId>,
}

impl<'a> HoleFill<'a> {
    pub fn new(hole: &'a str, paths: &'a RankedPathSet) -> Self {
        HoleFill {
            hole,
            paths,
            target: None,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: TypeId) -> Self {
        self.target = Some(target);
        self
    }

    /// Every type this fill asks its hole to accept: the declared target
    /// and the target of each path, deduplicated.
    pub fn targets(&self) -> Vec<TypeId> {
        let mut targets = distinct_targets(self.paths);
        if let Some(target) = self.target {
            if !targets.contains(&target) {
                targets.push(target);
                targets.sort_unstable();
            }
        }
        targets
    }
}

/// Compile `paths` into the template's primary hole.
///
/// The registry is only used to render type names for hole compatibility.
pub fn compile(
    paths: &RankedPathSet,
    template: &GrammarTemplate,
    registry: &TypeRegistry,
) -> Result<Grammar, CompileError> {
    let fills: Vec<HoleFill<'_>> = template
        .primary_hole()
        .map(|hole| HoleFill::new(&hole.name, paths))
        .into_iter()
        .collect();
    compile_holes(&fills, template, registry)
}

/// Compile several holes at once.
///
/// Fills naming the same hole are intersected. Every expression hole of the
/// template must end up with at least one path; literal holes may be left
/// unfilled and then accept only their literal. A fill's declared target
/// must suit its hole even when the fill brings no paths.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(template = %template.id, holes = fills.len())
)]
pub fn compile_holes(
    fills: &[HoleFill<'_>],
    template: &GrammarTemplate,
    registry: &TypeRegistry,
) -> Result<Grammar, CompileError> {
    let merged = merge_fills(fills, template)?;

    let mut builder = Builder {
        style: template.constructor_style,
        rules: Vec::new(),
        shared: FxHashMap::default(),
        next_arg: 0,
    };
    let mut hole_rules: FxHashMap<&str, String> = FxHashMap::default();

    for slot in &template.holes {
        let fill = merged.iter().find(|fill| fill.hole == slot.name);

        // Declared targets first: an uninhabited target still has to fit.
        if let Some(fill) = fill {
            for &target in &fill.targets {
                check_accepts(slot, target, registry)?;
            }
        }

        let literal = match &slot.kind {
            HoleKind::Literal { pattern, .. } => Some(pattern.as_str()),
            HoleKind::Expression { .. } => None,
        };
        let paths = match (fill.map(|fill| &fill.paths), literal) {
            (Some(paths), _) if !paths.is_empty() => paths.clone(),
            (_, Some(_)) => RankedPathSet::empty(),
            (_, None) => {
                return Err(ConstraintConflict::EmptyHole {
                    hole: slot.name.clone(),
                }
                .into())
            }
        };

        for target in distinct_targets(&paths) {
            check_accepts(slot, target, registry)?;
        }

        let rule_name = format!("hole_{}", rule_ident(&slot.name));
        let at = builder.rules.len();
        let mut alternatives = paths
            .iter()
            .map(|path| builder.path(path))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|kind| invalid(template, fills, kind))?;
        if let Some(pattern) = literal {
            alternatives.push(vec![Symbol::regex(pattern)]);
        }
        builder
            .rules
            .insert(at, Rule::new(rule_name.clone(), alternatives));
        hole_rules.insert(slot.name.as_str(), rule_name);
    }

    let mut rules: Vec<Rule> = template
        .rules
        .iter()
        .map(|rule| substitute(rule, &hole_rules))
        .collect();
    rules.append(&mut builder.rules);

    let grammar = Grammar::new(template.start.clone(), rules, template.ignore.clone())
        .map_err(|kind| invalid(template, fills, kind))?;

    tracing::debug!(rules = grammar.rules().len(), "compiled grammar");
    Ok(grammar)
}

/// Fills of one hole after merging.
struct MergedFill<'a> {
    hole: &'a str,
    paths: RankedPathSet,
    /// Declared targets of every fill naming the hole.
    targets: Vec<TypeId>,
}

/// Group fills by hole, intersecting repeated holes, in first-seen order.
fn merge_fills<'a>(
    fills: &[HoleFill<'a>],
    template: &GrammarTemplate,
) -> Result<Vec<MergedFill<'a>>, ConstraintConflict> {
    let mut merged: Vec<MergedFill<'a>> = Vec::new();
    for fill in fills {
        if template.hole(fill.hole).is_none() {
            return Err(ConstraintConflict::UnknownHole {
                template: template.id.clone(),
                hole: fill.hole.to_owned(),
            });
        }
        let at = match merged.iter().position(|m| m.hole == fill.hole) {
            Some(at) => {
                merged[at].paths = merged[at].paths.intersect(fill.paths);
                at
            }
            None => {
                merged.push(MergedFill {
                    hole: fill.hole,
                    paths: fill.paths.clone(),
                    targets: Vec::new(),
                });
                merged.len() - 1
            }
        };
        let entry = &mut merged[at];
        if let Some(target) = fill.target {
            if !entry.targets.contains(&target) {
                entry.targets.push(target);
            }
        }
    }
    Ok(merged)
}

fn check_accepts(
    slot: &HoleSpec,
    target: TypeId,
    registry: &TypeRegistry,
) -> Result<(), ConstraintConflict> {
    slot.accepts(target, registry)
        .map_err(|accepts| ConstraintConflict::IncompatibleHole {
            hole: slot.name.clone(),
            accepts,
            target: registry.display(target),
        })
}

fn distinct_targets(paths: &RankedPathSet) -> Vec<TypeId> {
    let mut targets: Vec<TypeId> = paths.iter().map(Path::target).collect();
    targets.sort_unstable();
    targets.dedup();
    targets
}

fn substitute(rule: &Rule, hole_rules: &FxHashMap<&str, String>) -> Rule {
    let alternatives = rule
        .alternatives
        .iter()
        .map(|alt| {
            alt.iter()
                .map(|sym| match sym {
                    Symbol::Hole(hole) => match hole_rules.get(hole.as_str()) {
                        Some(name) => Symbol::Rule(name.clone()),
                        None => sym.clone(),
                    },
                    Symbol::Terminal(_) | Symbol::Rule(_) => sym.clone(),
                })
                .collect()
        })
        .collect();
    Rule::new(rule.name.clone(), alternatives)
}

fn invalid(
    template: &GrammarTemplate,
    fills: &[HoleFill<'_>],
    kind: InvalidGrammar,
) -> CompileError {
    let paths = fills
        .iter()
        .flat_map(|fill| fill.paths.iter().map(ToString::to_string))
        .collect();
    let err = GrammarCompilationError {
        template: template.id.clone(),
        kind,
        paths,
    };
    tracing::error!(error = %err, "grammar failed verification");
    err.into()
}

/// Lark rule names are lowercase identifiers.
fn rule_ident(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

// === Rule builder ===

struct Builder {
    style: ConstructorStyle,
    /// Generated rules in emission order.
    rules: Vec<Rule>,
    /// Candidate-set identity to the rule already emitted for it.
    shared: FxHashMap<Vec<PathKey>, String>,
    next_arg: u32,
}

impl Builder {
    /// One alternative: the path's surface tokens.
    fn path(&mut self, path: &Path) -> Result<Vec<Symbol>, InvalidGrammar> {
        let mut out = Vec::new();
        for step in path.steps() {
            match step {
                Step::Identity { binding } => out.push(Symbol::lit(binding.as_str())),
                Step::PropertyAccess { name } => {
                    out.push(Symbol::lit("."));
                    out.push(Symbol::lit(name.as_str()));
                }
                Step::MethodCall { name, args } => {
                    out.push(Symbol::lit("."));
                    out.push(Symbol::lit(name.as_str()));
                    self.call_args(name, args, &mut out)?;
                }
                Step::FunctionApplication { name, args } => {
                    out.push(Symbol::lit(name.as_str()));
                    self.call_args(name, args, &mut out)?;
                }
                Step::Constructor { name, args, .. } => {
                    match self.style {
                        ConstructorStyle::New => {
                            out.push(Symbol::lit("new"));
                            out.push(Symbol::lit(name.as_str()));
                        }
                        ConstructorStyle::Call => out.push(Symbol::lit(name.as_str())),
                        ConstructorStyle::PathNew => {
                            out.push(Symbol::lit(name.as_str()));
                            out.push(Symbol::lit("::"));
                            out.push(Symbol::lit("new"));
                        }
                    }
                    self.call_args(name, args, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    /// `"(" arg ("," arg)* ")"`
    fn call_args(
        &mut self,
        callee: &str,
        args: &[Argument],
        out: &mut Vec<Symbol>,
    ) -> Result<(), InvalidGrammar> {
        out.push(Symbol::lit("("));
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(Symbol::lit(","));
            }
            let rule = self.argument_rule(callee, arg)?;
            out.push(Symbol::Rule(rule));
        }
        out.push(Symbol::lit(")"));
        Ok(())
    }

    /// Rule for an argument's candidates; identical candidate sets share one.
    fn argument_rule(&mut self, callee: &str, arg: &Argument) -> Result<String, InvalidGrammar> {
        if arg.candidates.is_empty() {
            return Err(InvalidGrammar::EmptyArgument {
                callee: callee.to_owned(),
                param: arg.param.clone(),
            });
        }

        let key: Vec<PathKey> = arg.candidates.keys().collect();
        if let Some(name) = self.shared.get(&key) {
            return Ok(name.clone());
        }

        let name = format!("arg_{}", self.next_arg);
        self.next_arg += 1;
        let alternatives = with_stack(|| {
            arg.candidates
                .iter()
                .map(|candidate| self.path(candidate))
                .collect::<Result<Vec<_>, _>>()
        })?;
        self.shared.insert(key, name.clone());
        self.rules.push(Rule::new(name.clone(), alternatives));
        Ok(name)
    }
}
