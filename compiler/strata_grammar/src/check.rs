//! Prefix-property verification.
//!
//! A grammar has the prefix property when every partial derivation that can
//! be reached from the start rule can be completed. For a grammar without
//! holes and without undefined references this reduces to: every reachable
//! rule is productive (derives some all-terminal string). Unreachable rules
//! are dropped afterwards so the emitted grammar contains no dead rules.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Grammar, InvalidGrammar, Symbol};

pub(crate) fn verify(grammar: Grammar) -> Result<Grammar, InvalidGrammar> {
    let (start, rules, ignore) = grammar.into_parts();

    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, rule) in rules.iter().enumerate() {
        if index.insert(rule.name.as_str(), i).is_some() {
            return Err(InvalidGrammar::DuplicateRule {
                rule: rule.name.clone(),
            });
        }
    }
    let Some(&start_index) = index.get(start.as_str()) else {
        return Err(InvalidGrammar::MissingStart(start));
    };

    let reachable = reachable(&rules, &index, start_index)?;
    let productive = productive(&rules, &index);

    for &i in &reachable {
        if !productive[i] {
            return Err(InvalidGrammar::Unproductive {
                rule: rules[i].name.clone(),
            });
        }
    }

    let live: FxHashSet<usize> = reachable.into_iter().collect();
    let dropped = rules.len() - live.len();
    let kept = rules
        .into_iter()
        .enumerate()
        .filter(|(i, _)| live.contains(i))
        .map(|(_, rule)| rule)
        .collect();
    if dropped > 0 {
        tracing::trace!(dropped, "eliminated unreachable rules");
    }

    Ok(Grammar::from_parts(start, kept, ignore))
}

/// Rules reachable from `start`, checking references and holes on the way.
fn reachable(
    rules: &[crate::Rule],
    index: &FxHashMap<&str, usize>,
    start: usize,
) -> Result<Vec<usize>, InvalidGrammar> {
    let mut seen = vec![false; rules.len()];
    let mut order = Vec::new();
    let mut stack = vec![start];
    seen[start] = true;

    while let Some(i) = stack.pop() {
        order.push(i);
        let rule = &rules[i];
        for sym in rule.alternatives.iter().flatten() {
            match sym {
                Symbol::Terminal(_) => {}
                Symbol::Hole(hole) => {
                    return Err(InvalidGrammar::UnfilledHole {
                        rule: rule.name.clone(),
                        hole: hole.clone(),
                    });
                }
                Symbol::Rule(name) => {
                    let Some(&target) = index.get(name.as_str()) else {
                        return Err(InvalidGrammar::UndefinedRule {
                            rule: name.clone(),
                            referenced_by: rule.name.clone(),
                        });
                    };
                    if !seen[target] {
                        seen[target] = true;
                        stack.push(target);
                    }
                }
            }
        }
    }

    order.sort_unstable();
    Ok(order)
}

/// Least fixpoint: a rule is productive once one of its alternatives consists
/// only of terminals and productive rules.
fn productive(rules: &[crate::Rule], index: &FxHashMap<&str, usize>) -> Vec<bool> {
    let mut productive = vec![false; rules.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (i, rule) in rules.iter().enumerate() {
            if productive[i] {
                continue;
            }
            let derives = rule.alternatives.iter().any(|alt| {
                alt.iter().all(|sym| match sym {
                    Symbol::Terminal(_) => true,
                    Symbol::Rule(name) => index.get(name.as_str()).is_some_and(|&j| productive[j]),
                    Symbol::Hole(_) => false,
                })
            });
            if derives {
                productive[i] = true;
                changed = true;
            }
        }
    }
    productive
}
