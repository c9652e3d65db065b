//! Parse tree built while stepping
//!
//! Nodes live in an arena and refer to each other by index. Rule nodes own
//! an ordered child list; terminal and error nodes point at tokens in the
//! session's token stream.

use super::errors::RecognitionFailure;
use super::tokens::TokenStream;
use crate::grammar::GrammarInfo;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNode {
    pub rule_index: usize,
    pub parent: Option<NodeId>,
    /// State that invoked this rule, `None` for the root
    pub invoking_state: Option<usize>,
    pub children: Vec<NodeId>,
    pub start_token: usize,
    /// Last token matched inside the rule, once it has finished
    pub stop_token: Option<usize>,
    pub failure: Option<RecognitionFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Rule(RuleNode),
    Terminal { parent: NodeId, token: usize },
    /// A token consumed during error recovery
    Error { parent: NodeId, token: usize },
}

impl ParseNode {
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            ParseNode::Rule(rule) => rule.parent,
            ParseNode::Terminal { parent, .. } | ParseNode::Error { parent, .. } => Some(*parent),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    root: Option<NodeId>,
}

impl ParseTree {
    pub fn new() -> Self {
        ParseTree::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The most recent parentless rule node
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id]
    }

    pub fn rule(&self, id: NodeId) -> Option<&RuleNode> {
        match &self.nodes[id] {
            ParseNode::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn rule_mut(&mut self, id: NodeId) -> Option<&mut RuleNode> {
        match &mut self.nodes[id] {
            ParseNode::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.rule(id).map_or(&[][..], |rule| rule.children.as_slice())
    }

    /// Create a rule node; it is not attached to `parent` until
    /// [`ParseTree::attach`] is called
    ///
    /// A node without a parent becomes the root.
    pub fn add_rule(
        &mut self,
        rule_index: usize,
        parent: Option<NodeId>,
        invoking_state: Option<usize>,
        start_token: usize,
    ) -> NodeId {
        let id = self.push(ParseNode::Rule(RuleNode {
            rule_index,
            parent,
            invoking_state,
            children: Vec::new(),
            start_token,
            stop_token: None,
            failure: None,
        }));
        if parent.is_none() {
            self.root = Some(id);
        }
        id
    }

    pub fn add_terminal(&mut self, parent: NodeId, token: usize) -> NodeId {
        let id = self.push(ParseNode::Terminal { parent, token });
        self.attach(parent, id);
        id
    }

    pub fn add_error(&mut self, parent: NodeId, token: usize) -> NodeId {
        let id = self.push(ParseNode::Error { parent, token });
        self.attach(parent, id);
        id
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(rule) = self.rule_mut(parent) {
            rule.children.push(child);
        }
    }

    /// Move `child` under a new `parent` as its only child
    ///
    /// Used when a left-recursive rule wraps what it has parsed so far in a
    /// fresh invocation.
    pub fn reparent(&mut self, child: NodeId, parent: NodeId) {
        if self.root == Some(child) {
            self.root = Some(parent);
        }
        let old_parent = self.nodes[child].parent();
        if let Some(old) = old_parent {
            if let Some(rule) = self.rule_mut(old) {
                rule.children.retain(|&c| c != child);
            }
        }
        if let Some(rule) = self.rule_mut(child) {
            rule.parent = Some(parent);
        }
        self.attach(parent, child);
    }

    fn push(&mut self, node: ParseNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// LISP-style rendering, as in `(a B (b C))`
    pub fn to_string_tree(&self, tokens: &TokenStream, grammar: &GrammarInfo) -> String {
        match self.root() {
            Some(root) => self.render(root, tokens, grammar),
            None => String::new(),
        }
    }

    fn render(&self, id: NodeId, tokens: &TokenStream, grammar: &GrammarInfo) -> String {
        match &self.nodes[id] {
            ParseNode::Terminal { token, .. } => tokens.get(*token).text.clone(),
            ParseNode::Error { token, .. } => tokens.get(*token).text.clone(),
            ParseNode::Rule(rule) => {
                let name = grammar.rule_name(rule.rule_index);
                if rule.children.is_empty() {
                    return name.to_string();
                }
                let children: Vec<String> = rule
                    .children
                    .iter()
                    .map(|&child| self.render(child, tokens, grammar))
                    .collect();
                format!("({} {})", name, children.join(" "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Vocabulary;
    use crate::interpreter::tokens::{Token, DEFAULT_CHANNEL};

    fn token(index: usize, text: &str) -> Token {
        Token {
            token_type: 1,
            channel: DEFAULT_CHANNEL,
            start: index,
            stop: index + 1,
            line: 1,
            column: index,
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_render_and_reparent() {
        let tokens = TokenStream::new(vec![token(0, "1"), token(1, "+"), token(2, "2")]);
        let grammar = GrammarInfo::without_source(&["e"], Vocabulary::default());

        let mut tree = ParseTree::new();
        let root = tree.add_rule(0, None, None, 0);
        let inner = tree.add_rule(0, Some(root), Some(3), 0);
        tree.attach(root, inner);
        tree.add_terminal(inner, 0);
        assert_eq!(tree.to_string_tree(&tokens, &grammar), "(e (e 1))");

        // wrap the inner node in a new invocation
        let wrapper = tree.add_rule(0, Some(root), Some(3), 0);
        tree.reparent(inner, wrapper);
        tree.attach(root, wrapper);
        assert_eq!(tree.root(), Some(root));
        tree.add_terminal(wrapper, 1);
        tree.add_terminal(wrapper, 2);
        assert_eq!(tree.to_string_tree(&tokens, &grammar), "(e (e (e 1) + 2))");
        assert_eq!(tree.children(root), &[wrapper]);
    }
}
