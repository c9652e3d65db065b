// Small hand-built grammars shared by the integration tests
#![allow(dead_code)]

use atnstep::atn::{
    Atn, BlockFlavor, DecisionInfo, GrammarKind, IntervalSet, LexerAction, StateKind, StateType,
    Transition,
};
use atnstep::grammar::{GrammarInfo, Vocabulary};
use atnstep::interpreter::{Debugger, DebuggerConfig};
use atnstep::loader::{load_words, serialize, LoaderOptions};
use atnstep::symbols::GrammarSymbols;
use std::sync::Arc;

/// An ATN under construction, shaped the way ANTLR lays rules out
pub struct Sketch {
    pub atn: Atn,
}

impl Sketch {
    pub fn parser(max_token_type: i32) -> Self {
        Sketch {
            atn: Atn::new(GrammarKind::Parser, max_token_type),
        }
    }

    pub fn lexer(max_token_type: i32) -> Self {
        Sketch {
            atn: Atn::new(GrammarKind::Lexer, max_token_type),
        }
    }

    /// Add the next rule; returns its start and stop states
    pub fn rule(&mut self) -> (usize, usize) {
        let rule = self.atn.rule_to_start_state.len();
        let start = self
            .atn
            .add_state(StateKind::from_type(StateType::RuleStart), Some(rule));
        let stop = self.atn.add_state(StateKind::RuleStop, Some(rule));
        if let StateKind::RuleStart { stop_state, .. } = &mut self.atn.state_mut(start).kind {
            *stop_state = Some(stop);
        }
        self.atn.rule_to_start_state.push(start);
        self.atn.rule_to_stop_state.push(stop);
        (start, stop)
    }

    /// Add a left-recursive rule
    pub fn precedence_rule(&mut self) -> (usize, usize) {
        let (start, stop) = self.rule();
        if let StateKind::RuleStart {
            precedence_rule, ..
        } = &mut self.atn.state_mut(start).kind
        {
            *precedence_rule = true;
        }
        (start, stop)
    }

    /// Add a lexer rule producing `token_type`
    pub fn token_rule(&mut self, token_type: i32) -> (usize, usize) {
        self.atn.rule_to_token_type.push(token_type);
        self.rule()
    }

    pub fn basic(&mut self, rule: usize) -> usize {
        self.atn.add_state(StateKind::Basic, Some(rule))
    }

    pub fn edge(&mut self, from: usize, transition: Transition) {
        self.atn.state_mut(from).add_transition(transition);
    }

    pub fn epsilon(&mut self, from: usize, to: usize) {
        self.edge(from, Transition::epsilon(to));
    }

    /// Match `labels` one after another from `from`; returns the last state
    pub fn atoms(&mut self, rule: usize, from: usize, labels: &[i32]) -> usize {
        let mut current = from;
        for &label in labels {
            let next = self.basic(rule);
            self.edge(current, Transition::atom(next, label));
            current = next;
        }
        current
    }

    /// Call `callee` from `from`; returns the follow state
    pub fn call(&mut self, rule: usize, from: usize, callee: usize, precedence: i32) -> usize {
        let follow = self.basic(rule);
        let target = self.atn.rule_to_start_state[callee];
        self.edge(from, Transition::rule(target, callee, precedence, follow));
        follow
    }

    /// A block with one entry state per alternative, registered as a decision
    ///
    /// Returns the block start, the block end and the alternative entries.
    pub fn block(&mut self, rule: usize, alts: usize) -> (usize, usize, Vec<usize>) {
        let start = self.atn.add_state(
            StateKind::BlockStart {
                flavor: BlockFlavor::Basic,
                end_state: None,
                decision: DecisionInfo::default(),
            },
            Some(rule),
        );
        let end = self
            .atn
            .add_state(StateKind::BlockEnd { start_state: None }, Some(rule));
        if let StateKind::BlockStart { end_state, .. } = &mut self.atn.state_mut(start).kind {
            *end_state = Some(end);
        }
        self.atn.define_decision_state(start);

        let entries = (0..alts)
            .map(|_| {
                let entry = self.basic(rule);
                self.epsilon(start, entry);
                entry
            })
            .collect();
        (start, end, entries)
    }

    /// `(label)+` from `from`; returns the state after the loop
    pub fn plus_loop(&mut self, rule: usize, from: usize, label: Transition) -> usize {
        let block = self.atn.add_state(
            StateKind::BlockStart {
                flavor: BlockFlavor::Plus { loopback: None },
                end_state: None,
                decision: DecisionInfo::default(),
            },
            Some(rule),
        );
        let body = self.basic(rule);
        let end = self
            .atn
            .add_state(StateKind::BlockEnd { start_state: None }, Some(rule));
        let loopback = self.atn.add_state(
            StateKind::PlusLoopBack {
                decision: DecisionInfo::default(),
            },
            Some(rule),
        );
        let loop_end = self.atn.add_state(
            StateKind::LoopEnd {
                loopback: Some(loopback),
            },
            Some(rule),
        );
        let after = self.basic(rule);
        if let StateKind::BlockStart { end_state, .. } = &mut self.atn.state_mut(block).kind {
            *end_state = Some(end);
        }

        self.epsilon(from, block);
        self.epsilon(block, body);
        self.edge(body, label.retargeted(end));
        self.epsilon(end, loopback);
        self.epsilon(loopback, block);
        self.epsilon(loopback, loop_end);
        self.epsilon(loop_end, after);

        self.atn.define_decision_state(block);
        self.atn.define_decision_state(loopback);
        after
    }

    /// A lexer mode whose tokens start state tries `rules` in order
    pub fn mode(&mut self, rules: &[usize]) -> usize {
        let start = self.atn.add_state(
            StateKind::TokensStart {
                decision: DecisionInfo::default(),
            },
            None,
        );
        for &rule in rules {
            let target = self.atn.rule_to_start_state[rule];
            self.epsilon(start, target);
        }
        self.atn.define_decision_state(start);
        self.atn.mode_to_start_state.push(start);
        start
    }

    /// Lexer rule matching one character
    pub fn char_rule(&mut self, token_type: i32, c: char) -> usize {
        let rule = self.atn.rule_to_start_state.len();
        let (start, stop) = self.token_rule(token_type);
        let first = self.basic(rule);
        self.epsilon(start, first);
        let last = self.atoms(rule, first, &[c as i32]);
        self.epsilon(last, stop);
        rule
    }

    /// Lexer rule matching one character and then running `action`
    pub fn char_rule_with_action(&mut self, token_type: i32, c: char, action: LexerAction) -> usize {
        let rule = self.atn.rule_to_start_state.len();
        let (start, stop) = self.token_rule(token_type);
        let first = self.basic(rule);
        self.epsilon(start, first);
        let matched = self.atoms(rule, first, &[c as i32]);

        let slot = self.atn.lexer_actions.len();
        self.atn.lexer_actions.push(action);
        let acted = self.basic(rule);
        self.edge(
            matched,
            Transition::Action {
                target: acted,
                rule_index: rule,
                action_index: Some(slot),
                ctx_dependent: false,
            },
        );
        self.epsilon(acted, stop);
        rule
    }

    /// Lexer rule matching one or more characters in `first..=last`
    pub fn range_rule(&mut self, token_type: i32, first: char, last: char) -> usize {
        let rule = self.atn.rule_to_start_state.len();
        let (start, stop) = self.token_rule(token_type);
        let label = Transition::set(0, IntervalSet::of_range(first as i32, last as i32));
        let after = self.plus_loop(rule, start, label);
        self.epsilon(after, stop);
        rule
    }

    /// Lexer rule matching one character from `set`
    pub fn set_rule(&mut self, token_type: i32, set: IntervalSet) -> usize {
        let rule = self.atn.rule_to_start_state.len();
        let (start, stop) = self.token_rule(token_type);
        let first = self.basic(rule);
        self.epsilon(start, first);
        let matched = self.basic(rule);
        self.edge(first, Transition::set(matched, set));
        self.epsilon(matched, stop);
        rule
    }

    pub fn words(&self) -> Vec<u16> {
        serialize(&self.atn).expect("sketch serializes")
    }

    /// Serialize and load back through the full loader pipeline
    pub fn load(&self) -> Atn {
        self.load_with(&LoaderOptions::default())
    }

    pub fn load_with(&self, options: &LoaderOptions) -> Atn {
        load_words(&self.words(), options).expect("sketch loads")
    }
}

/// Lexer: B, C, D as single letters, spaces skipped
pub fn letters_lexer() -> Atn {
    let mut sketch = Sketch::lexer(4);
    let b = sketch.char_rule(1, 'B');
    let c = sketch.char_rule(2, 'C');
    let d = sketch.char_rule(3, 'D');
    let ws = sketch.char_rule_with_action(4, ' ', LexerAction::Skip);
    sketch.mode(&[b, c, d, ws]);
    sketch.load()
}

pub fn letters_vocabulary() -> Vocabulary {
    Vocabulary::from_symbolic(&["", "B", "C", "D", "WS"])
}

/// `a : B C ;`
pub fn pair_parser() -> Atn {
    let mut sketch = Sketch::parser(4);
    let (start, stop) = sketch.rule();
    let first = sketch.basic(0);
    sketch.epsilon(start, first);
    let last = sketch.atoms(0, first, &[1, 2]);
    let end = sketch.basic(0);
    sketch.epsilon(last, end);
    sketch.epsilon(end, stop);
    sketch.load()
}

pub const PAIR_SOURCE: &str = "grammar Pair;\n\na : B C ;\n";

/// ```text
/// s : a a ;
/// a : B C | B D ;
/// ```
pub fn calls_parser() -> Atn {
    let mut sketch = Sketch::parser(4);
    let (s_start, s_stop) = sketch.rule();
    let (a_start, a_stop) = sketch.rule();

    let s_body = sketch.basic(0);
    sketch.epsilon(s_start, s_body);
    let between = sketch.call(0, s_body, 1, 0);
    let after = sketch.call(0, between, 1, 0);
    sketch.epsilon(after, s_stop);

    let (block, block_end, alts) = sketch.block(1, 2);
    sketch.epsilon(a_start, block);
    for (alt, second) in alts.into_iter().zip([2, 3]) {
        let last = sketch.atoms(1, alt, &[1, second]);
        sketch.epsilon(last, block_end);
    }
    sketch.epsilon(block_end, a_stop);
    sketch.load()
}

pub const CALLS_SOURCE: &str = "grammar Calls;\n\
\n\
s : a a ;\n\
\n\
// a pair of letters\n\
a : B C\n\
  | B D\n\
  ;\n";

/// Lexer: INT as `[0-9]+`, PLUS as `+`
pub fn sum_lexer() -> Atn {
    let mut sketch = Sketch::lexer(2);
    let int = sketch.range_rule(1, '0', '9');
    let plus = sketch.char_rule(2, '+');
    sketch.mode(&[int, plus]);
    sketch.load()
}

pub fn sum_vocabulary() -> Vocabulary {
    Vocabulary::new(
        vec![None, None, Some("'+'".to_string())],
        vec![None, Some("INT".to_string()), Some("PLUS".to_string())],
    )
}

/// `e : e '+' e | INT ;` after left-recursion elimination:
///
/// ```text
/// e : INT ({precpred(_ctx, 1)}? '+' e[2])* ;
/// ```
pub fn sum_parser() -> Atn {
    let mut sketch = Sketch::parser(2);
    let (start, stop) = sketch.precedence_rule();

    let primary = sketch.basic(0);
    sketch.epsilon(start, primary);
    let prefix_end = sketch.atoms(0, primary, &[1]);

    let entry = sketch.atn.add_state(
        StateKind::from_type(StateType::StarLoopEntry),
        Some(0),
    );
    let block = sketch.atn.add_state(
        StateKind::BlockStart {
            flavor: BlockFlavor::Star,
            end_state: None,
            decision: DecisionInfo::default(),
        },
        Some(0),
    );
    let block_end = sketch
        .atn
        .add_state(StateKind::BlockEnd { start_state: None }, Some(0));
    let loopback = sketch
        .atn
        .add_state(StateKind::from_type(StateType::StarLoopBack), Some(0));
    let loop_end = sketch.atn.add_state(
        StateKind::LoopEnd {
            loopback: Some(loopback),
        },
        Some(0),
    );
    if let StateKind::BlockStart { end_state, .. } = &mut sketch.atn.state_mut(block).kind {
        *end_state = Some(block_end);
    }

    sketch.epsilon(prefix_end, entry);
    sketch.epsilon(entry, block);
    sketch.epsilon(entry, loop_end);

    let guard = sketch.basic(0);
    sketch.epsilon(block, guard);
    let guarded = sketch.basic(0);
    sketch.edge(
        guard,
        Transition::Precedence {
            target: guarded,
            precedence: 1,
        },
    );
    let operator = sketch.atoms(0, guarded, &[2]);
    let follow = sketch.call(0, operator, 0, 2);
    sketch.epsilon(follow, block_end);
    sketch.epsilon(block_end, loopback);
    sketch.epsilon(loopback, entry);
    sketch.epsilon(loop_end, stop);

    sketch.atn.define_decision_state(entry);
    sketch.atn.define_decision_state(block);
    sketch.load()
}

/// Lexer: IF before ID so keywords win ties, then INT, spaces skipped
pub fn words_lexer() -> Atn {
    let mut sketch = Sketch::lexer(4);

    let (start, stop) = sketch.token_rule(1);
    let first = sketch.basic(0);
    sketch.epsilon(start, first);
    let last = sketch.atoms(0, first, &['i' as i32, 'f' as i32]);
    sketch.epsilon(last, stop);

    let id = sketch.range_rule(2, 'a', 'z');
    let int = sketch.range_rule(3, '0', '9');
    let ws = sketch.char_rule_with_action(4, ' ', LexerAction::Skip);
    sketch.mode(&[0, id, int, ws]);
    sketch.load()
}

/// Lexer with a string mode: `"` pushes it, letters are TEXT, `"` pops it
pub fn string_lexer() -> Atn {
    let mut sketch = Sketch::lexer(3);
    let open = sketch.char_rule_with_action(1, '"', LexerAction::PushMode(1));
    let text = sketch.range_rule(2, 'a', 'z');
    let close = sketch.char_rule_with_action(3, '"', LexerAction::PopMode);
    sketch.mode(&[open]);
    sketch.mode(&[text, close]);
    sketch.load()
}

/// Debugger over `parser` and `lexer` with rule names and optional source
pub fn debugger(
    parser: Atn,
    lexer: Atn,
    rule_names: &[&str],
    vocabulary: Vocabulary,
    source: Option<&str>,
    config: DebuggerConfig,
) -> Debugger {
    let grammar = match source {
        Some(text) => GrammarInfo::from_source("T.g4", text, rule_names, vocabulary),
        None => GrammarInfo::without_source(rule_names, vocabulary),
    };
    let symbols = GrammarSymbols::with_rules(grammar.source_name.clone(), rule_names);
    debugger_with_symbols(parser, lexer, grammar, symbols, config)
}

pub fn debugger_with_symbols(
    parser: Atn,
    lexer: Atn,
    grammar: GrammarInfo,
    symbols: GrammarSymbols,
    config: DebuggerConfig,
) -> Debugger {
    Debugger::new(
        Arc::new(parser),
        Arc::new(lexer),
        Arc::new(grammar),
        Arc::new(symbols),
        config,
    )
    .expect("parser and lexer ATNs")
}
