//! Next-symbol search
//!
//! Given the symbols the interpreter is currently at, find the leaf symbols
//! that can come next and keep those matching the transition about to be
//! taken. The search walks the symbol tree with a worklist and gives up after
//! a fixed number of steps, so a malformed table cannot stall the debugger.

use super::{SymbolId, SymbolKind, SymbolTable};
use crate::atn::{IntervalSet, Transition, MIN_USER_TOKEN_TYPE};
use rustc_hash::FxHashSet;
use tracing::trace;

const VISIT_BUDGET: usize = 4096;

/// Which leaves survive the search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolFilter {
    /// Rule references to the named rule
    Rule(String),
    /// Terminals whose token type is in the set
    Tokens(IntervalSet),
}

impl SymbolFilter {
    /// Filter for a matching transition; not-set and wildcard labels are
    /// resolved against `1..=max_token_type`
    pub fn for_match(transition: &Transition, max_token_type: i32) -> Option<Self> {
        transition
            .match_set(MIN_USER_TOKEN_TYPE, max_token_type)
            .map(SymbolFilter::Tokens)
    }

    pub fn accepts(&self, kind: &SymbolKind) -> bool {
        match (self, kind) {
            (SymbolFilter::Rule(name), SymbolKind::RuleReference { rule }) => name == rule,
            (SymbolFilter::Tokens(set), SymbolKind::Terminal { token_type }) => {
                set.contains(*token_type)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Step {
    /// Leaves that can start this symbol
    First(SymbolId),
    /// Leaves that can follow this symbol
    After(SymbolId),
}

/// Leaves that can follow any of `current` and pass `filter`
///
/// A rule symbol in `current` stands for the start of its body.
pub fn next_symbols(
    table: &dyn SymbolTable,
    current: &[SymbolId],
    filter: &SymbolFilter,
) -> Vec<SymbolId> {
    let mut worklist: Vec<Step> = current
        .iter()
        .rev()
        .map(|&symbol| match table.kind(symbol) {
            SymbolKind::Rule => Step::First(symbol),
            _ => Step::After(symbol),
        })
        .collect();

    let mut visited = FxHashSet::default();
    let mut admitted = FxHashSet::default();
    let mut result = Vec::new();
    let mut budget = VISIT_BUDGET;

    while let Some(step) = worklist.pop() {
        if budget == 0 {
            trace!("next-symbol search ran out of budget");
            break;
        }
        budget -= 1;
        if !visited.insert(step) {
            continue;
        }

        match step {
            Step::First(symbol) => {
                let kind = table.kind(symbol);
                if kind.is_leaf() {
                    if filter.accepts(kind) && admitted.insert(symbol) {
                        result.push(symbol);
                    }
                    continue;
                }
                expand_first(table, symbol, &mut worklist);
            }
            Step::After(symbol) => expand_after(table, symbol, &mut worklist),
        }
    }

    result
}

/// Queue the starts of `symbol`'s children in reverse so they pop in order
fn expand_first(table: &dyn SymbolTable, symbol: SymbolId, worklist: &mut Vec<Step>) {
    let children = table.children(symbol);
    let mut steps = Vec::new();

    match table.kind(symbol) {
        SymbolKind::Rule | SymbolKind::Block => {
            steps.extend(children.iter().map(|&child| Step::First(child)));
        }
        _ => {
            // a sequence: continue past children that may match nothing
            let mut all_skippable = true;
            for &child in children {
                steps.push(Step::First(child));
                if !table.kind(child).is_skippable() {
                    all_skippable = false;
                    break;
                }
            }
            if all_skippable {
                steps.push(Step::After(symbol));
            }
        }
    }

    worklist.extend(steps.into_iter().rev());
}

fn expand_after(table: &dyn SymbolTable, symbol: SymbolId, worklist: &mut Vec<Step>) {
    match table.kind(symbol) {
        SymbolKind::Rule => {}
        SymbolKind::Alternative => {
            // the other alternatives are not successors; leave the block
            if let Some(parent) = table.parent(symbol) {
                worklist.push(Step::After(parent));
            }
        }
        _ => {
            if let Some(sibling) = table.next_sibling(symbol) {
                if table.kind(sibling).is_skippable() {
                    worklist.push(Step::After(sibling));
                }
                worklist.push(Step::First(sibling));
            } else if let Some(parent) = table.parent(symbol) {
                worklist.push(Step::After(parent));
                if table.kind(parent).is_loop() {
                    worklist.push(Step::First(parent));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::GrammarSymbols;

    /// `a : B C? D+ b ;`
    fn sample() -> (GrammarSymbols, [SymbolId; 5]) {
        let mut table = GrammarSymbols::new("T.g4");
        let rule = table.add_rule("a");
        let alt = table.alternative(rule);
        let b = table.terminal(alt, "B", 1);
        let optional = table.optional(alt);
        let c = table.terminal(optional, "C", 2);
        let plus = table.one_or_more(alt);
        let d = table.terminal(plus, "D", 3);
        let call = table.rule_reference(alt, "b");
        (table, [rule, b, c, d, call])
    }

    #[test]
    fn test_rule_start_gives_first_leaves() {
        let (table, [rule, b, ..]) = sample();
        let next = next_symbols(&table, &[rule], &SymbolFilter::Tokens(IntervalSet::of(1)));
        assert_eq!(next, vec![b]);
    }

    #[test]
    fn test_optional_sibling_is_skipped() {
        let (table, [_, b, c, d, _]) = sample();
        let filter = SymbolFilter::Tokens(IntervalSet::of_range(1, 3));
        assert_eq!(next_symbols(&table, &[b], &filter), vec![c, d]);
    }

    #[test]
    fn test_one_or_more_repeats_and_continues() {
        let (table, [_, _, _, d, call]) = sample();
        let tokens = SymbolFilter::Tokens(IntervalSet::of(3));
        assert_eq!(next_symbols(&table, &[d], &tokens), vec![d]);

        let rule = SymbolFilter::Rule("b".to_string());
        assert_eq!(next_symbols(&table, &[d], &rule), vec![call]);
    }

    #[test]
    fn test_alternatives_fan_out() {
        let mut table = GrammarSymbols::new("T.g4");
        let rule = table.add_rule("x");
        let first = table.alternative(rule);
        let a = table.terminal(first, "A", 1);
        let second = table.alternative(rule);
        let b = table.terminal(second, "B", 2);

        let filter = SymbolFilter::Tokens(IntervalSet::of_range(1, 2));
        assert_eq!(next_symbols(&table, &[rule], &filter), vec![a, b]);
        // the end of one alternative does not lead into another
        assert!(next_symbols(&table, &[a], &filter).is_empty());
    }
}
