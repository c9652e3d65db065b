//! Grammar metadata: names, vocabulary and rule source ranges
//!
//! The interpreter only sees numbers (rule indices, token types, states). This
//! module maps them back to what the grammar author wrote, and records where
//! each rule is declared so breakpoints set on a source line can be bound.

use crate::atn::EOF;
use rustc_hash::FxHashMap;

/// Token display names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    literal_names: Vec<Option<String>>,
    symbolic_names: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn new(literal_names: Vec<Option<String>>, symbolic_names: Vec<Option<String>>) -> Self {
        Vocabulary {
            literal_names,
            symbolic_names,
        }
    }

    /// Vocabulary with symbolic names only, indexed by token type
    pub fn from_symbolic<S: AsRef<str>>(names: &[S]) -> Self {
        Vocabulary {
            literal_names: Vec::new(),
            symbolic_names: names
                .iter()
                .map(|name| {
                    let name = name.as_ref();
                    (!name.is_empty()).then(|| name.to_string())
                })
                .collect(),
        }
    }

    pub fn max_token_type(&self) -> i32 {
        self.literal_names.len().max(self.symbolic_names.len()) as i32 - 1
    }

    pub fn literal_name(&self, token_type: i32) -> Option<&str> {
        usize::try_from(token_type)
            .ok()
            .and_then(|index| self.literal_names.get(index))
            .and_then(|name| name.as_deref())
    }

    pub fn symbolic_name(&self, token_type: i32) -> Option<&str> {
        if token_type == EOF {
            return Some("EOF");
        }
        usize::try_from(token_type)
            .ok()
            .and_then(|index| self.symbolic_names.get(index))
            .and_then(|name| name.as_deref())
    }

    /// Literal name if there is one, else the symbolic name, else the number
    pub fn display_name(&self, token_type: i32) -> String {
        if token_type == EOF {
            return "<EOF>".to_string();
        }
        self.literal_name(token_type)
            .or_else(|| self.symbolic_name(token_type))
            .map(str::to_string)
            .unwrap_or_else(|| token_type.to_string())
    }

    /// Token type whose symbolic name is `name`
    pub fn token_type(&self, name: &str) -> Option<i32> {
        self.symbolic_names
            .iter()
            .position(|symbolic| symbolic.as_deref() == Some(name))
            .map(|index| index as i32)
    }
}

/// Line (1-based) and column (0-based) in a grammar source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub fn contains_line(&self, line: usize) -> bool {
        self.start.line <= line && line <= self.end.line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub name: String,
    /// Line holding the rule's name
    pub declaration_line: usize,
    /// Whole rule including leading comments, used for breakpoint snapping
    pub range: SourceRange,
}

#[derive(Debug, Clone, Default)]
pub struct GrammarInfo {
    /// Source file name the rules are declared in
    pub source_name: String,
    pub rules: Vec<RuleInfo>,
    pub vocabulary: Vocabulary,
    pub channel_names: Vec<String>,
    pub mode_names: Vec<String>,
    rule_lookup: FxHashMap<String, usize>,
}

impl GrammarInfo {
    pub fn new(source_name: impl Into<String>, rules: Vec<RuleInfo>, vocabulary: Vocabulary) -> Self {
        let rule_lookup = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (rule.name.clone(), index))
            .collect();
        GrammarInfo {
            source_name: source_name.into(),
            rules,
            vocabulary,
            channel_names: Vec::new(),
            mode_names: Vec::new(),
            rule_lookup,
        }
    }

    /// Metadata for rules that have no known source position
    pub fn without_source<S: AsRef<str>>(rule_names: &[S], vocabulary: Vocabulary) -> Self {
        let rules = rule_names
            .iter()
            .map(|name| RuleInfo {
                name: name.as_ref().to_string(),
                declaration_line: 0,
                range: SourceRange::default(),
            })
            .collect();
        GrammarInfo::new("", rules, vocabulary)
    }

    /// Metadata with rule positions located in the grammar `source` text
    pub fn from_source<S: AsRef<str>>(
        source_name: impl Into<String>,
        source: &str,
        rule_names: &[S],
        vocabulary: Vocabulary,
    ) -> Self {
        GrammarInfo::new(source_name, locate_rules(source, rule_names), vocabulary)
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rule_lookup.get(name).copied()
    }

    pub fn rule_name(&self, index: usize) -> &str {
        self.rules.get(index).map_or("<invalid>", |rule| rule.name.as_str())
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.name.clone()).collect()
    }

    /// Rule declared on exactly this line
    pub fn rule_declared_at(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        self.rules
            .iter()
            .position(|rule| rule.declaration_line == line)
    }

    /// Rule whose source range covers this line
    pub fn rule_containing(&self, line: usize) -> Option<usize> {
        self.rules
            .iter()
            .position(|rule| rule.declaration_line > 0 && rule.range.contains_line(line))
    }
}

/// Find each rule's declaration in grammar text
///
/// A declaration is a line starting (after optional `fragment`) with the rule
/// name followed by `:`, either on the same line or the next one. The range
/// starts at the comment block directly above the declaration and ends at the
/// line that closes the rule with `;`. Rules that cannot be found get line 0.
pub fn locate_rules<S: AsRef<str>>(source: &str, rule_names: &[S]) -> Vec<RuleInfo> {
    let lines: Vec<&str> = source.lines().collect();

    rule_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let Some(index) = find_declaration(&lines, name) else {
                return RuleInfo {
                    name: name.to_string(),
                    declaration_line: 0,
                    range: SourceRange::default(),
                };
            };

            let mut first = index;
            while first > 0 && is_comment_line(lines[first - 1]) {
                first -= 1;
            }
            let last = (index..lines.len())
                .find(|&i| closes_rule(lines[i]))
                .unwrap_or(lines.len().saturating_sub(1));

            RuleInfo {
                name: name.to_string(),
                declaration_line: index + 1,
                range: SourceRange {
                    start: SourcePosition {
                        line: first + 1,
                        column: 0,
                    },
                    end: SourcePosition {
                        line: last + 1,
                        column: lines.get(last).map_or(0, |line| line.len()),
                    },
                },
            }
        })
        .collect()
}

fn find_declaration(lines: &[&str], name: &str) -> Option<usize> {
    lines.iter().enumerate().find_map(|(index, line)| {
        let mut text = line.trim_start();
        if let Some(rest) = text.strip_prefix("fragment") {
            if rest.starts_with(char::is_whitespace) {
                text = rest.trim_start();
            }
        }
        let rest = text.strip_prefix(name)?;
        if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            return None;
        }

        let rest = rest.trim_start();
        let colon_follows = rest.starts_with(':')
            || (rest.is_empty()
                && lines
                    .get(index + 1)
                    .is_some_and(|next| next.trim_start().starts_with(':')));
        colon_follows.then_some(index)
    })
}

fn is_comment_line(line: &str) -> bool {
    let text = line.trim_start();
    text.starts_with("//") || text.starts_with("/*") || text.starts_with('*')
}

fn closes_rule(line: &str) -> bool {
    let code = line.split("//").next().unwrap_or("");
    code.trim_end().ends_with(';')
}
