//! Symbol Bridge between the interpreter and a grammar symbol table
//!
//! The debugger asks "which grammar symbols can come next" while stepping. It
//! does not parse grammar text itself; instead it talks to a [`SymbolTable`]:
//! - [`SymbolTable`]: the queries the debugger needs from a symbol table
//! - [`GrammarSymbols`]: an in-memory arena implementation with a builder API
//! - [`next_symbols`]: the bounded worklist search for follow-up symbols
//!
//! # Symbol Shape
//!
//! A rule symbol's children are its alternatives. Alternatives and the
//! repetition wrappers hold sequences of elements; blocks hold alternatives.
//! Leaves are terminals and rule references.

pub mod next;
pub mod table;

pub use next::{next_symbols, SymbolFilter};
pub use table::GrammarSymbols;

pub type SymbolId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Rule,
    Alternative,
    Block,
    Optional,
    ZeroOrMore,
    OneOrMore,
    Terminal { token_type: i32 },
    RuleReference { rule: String },
}

impl SymbolKind {
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            SymbolKind::Terminal { .. } | SymbolKind::RuleReference { .. }
        )
    }

    /// Wrappers that may match nothing
    pub fn is_skippable(&self) -> bool {
        matches!(self, SymbolKind::Optional | SymbolKind::ZeroOrMore)
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, SymbolKind::ZeroOrMore | SymbolKind::OneOrMore)
    }
}

/// Read access to a grammar symbol table
pub trait SymbolTable {
    /// The rule symbol named `name`
    fn resolve(&self, name: &str) -> Option<SymbolId>;

    fn kind(&self, id: SymbolId) -> &SymbolKind;

    fn name(&self, id: SymbolId) -> &str;

    fn parent(&self, id: SymbolId) -> Option<SymbolId>;

    fn children(&self, id: SymbolId) -> &[SymbolId];

    /// Source file the symbol was declared in
    fn source_name(&self, id: SymbolId) -> Option<&str>;

    fn next_sibling(&self, id: SymbolId) -> Option<SymbolId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&child| child == id)?;
        siblings.get(position + 1).copied()
    }

    /// The next sibling, or the enclosing symbol when `id` is the last child
    fn next(&self, id: SymbolId) -> Option<SymbolId> {
        self.next_sibling(id).or_else(|| self.parent(id))
    }
}
