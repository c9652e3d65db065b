//! In-memory symbol table

use super::{SymbolId, SymbolKind, SymbolTable};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct SymbolEntry {
    kind: SymbolKind,
    name: String,
    parent: Option<SymbolId>,
    children: Vec<SymbolId>,
}

/// Arena of grammar symbols for one source file
#[derive(Debug, Clone, Default)]
pub struct GrammarSymbols {
    source_name: String,
    symbols: Vec<SymbolEntry>,
    rules: FxHashMap<String, SymbolId>,
}

impl GrammarSymbols {
    pub fn new(source_name: impl Into<String>) -> Self {
        GrammarSymbols {
            source_name: source_name.into(),
            symbols: Vec::new(),
            rules: FxHashMap::default(),
        }
    }

    /// A table with one empty rule symbol per name
    pub fn with_rules<S: AsRef<str>>(source_name: impl Into<String>, rule_names: &[S]) -> Self {
        let mut table = GrammarSymbols::new(source_name);
        for name in rule_names {
            table.add_rule(name.as_ref());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn push(&mut self, kind: SymbolKind, name: String, parent: Option<SymbolId>) -> SymbolId {
        let id = self.symbols.len();
        self.symbols.push(SymbolEntry {
            kind,
            name,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.symbols[parent].children.push(id);
        }
        id
    }

    pub fn add_rule(&mut self, name: &str) -> SymbolId {
        let id = self.push(SymbolKind::Rule, name.to_string(), None);
        self.rules.insert(name.to_string(), id);
        id
    }

    pub fn add_child(&mut self, parent: SymbolId, kind: SymbolKind, name: &str) -> SymbolId {
        self.push(kind, name.to_string(), Some(parent))
    }

    pub fn alternative(&mut self, parent: SymbolId) -> SymbolId {
        self.add_child(parent, SymbolKind::Alternative, "")
    }

    pub fn block(&mut self, parent: SymbolId) -> SymbolId {
        self.add_child(parent, SymbolKind::Block, "")
    }

    pub fn optional(&mut self, parent: SymbolId) -> SymbolId {
        self.add_child(parent, SymbolKind::Optional, "")
    }

    pub fn zero_or_more(&mut self, parent: SymbolId) -> SymbolId {
        self.add_child(parent, SymbolKind::ZeroOrMore, "")
    }

    pub fn one_or_more(&mut self, parent: SymbolId) -> SymbolId {
        self.add_child(parent, SymbolKind::OneOrMore, "")
    }

    pub fn terminal(&mut self, parent: SymbolId, name: &str, token_type: i32) -> SymbolId {
        self.add_child(parent, SymbolKind::Terminal { token_type }, name)
    }

    pub fn rule_reference(&mut self, parent: SymbolId, rule: &str) -> SymbolId {
        self.add_child(
            parent,
            SymbolKind::RuleReference {
                rule: rule.to_string(),
            },
            rule,
        )
    }
}

impl SymbolTable for GrammarSymbols {
    fn resolve(&self, name: &str) -> Option<SymbolId> {
        self.rules.get(name).copied()
    }

    fn kind(&self, id: SymbolId) -> &SymbolKind {
        &self.symbols[id].kind
    }

    fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id].name
    }

    fn parent(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbols[id].parent
    }

    fn children(&self, id: SymbolId) -> &[SymbolId] {
        &self.symbols[id].children
    }

    fn source_name(&self, _id: SymbolId) -> Option<&str> {
        (!self.source_name.is_empty()).then_some(self.source_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_navigation() {
        let mut table = GrammarSymbols::new("T.g4");
        let rule = table.add_rule("a");
        let alt = table.alternative(rule);
        let b = table.terminal(alt, "B", 1);
        let c = table.terminal(alt, "C", 2);

        assert_eq!(table.resolve("a"), Some(rule));
        assert_eq!(table.next_sibling(b), Some(c));
        assert_eq!(table.next(b), Some(c));
        assert_eq!(table.next_sibling(c), None);
        assert_eq!(table.next(c), Some(alt));
        assert_eq!(table.source_name(b), Some("T.g4"));
    }
}
