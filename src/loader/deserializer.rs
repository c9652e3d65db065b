//! Decoding of the serialized word stream into an [`Atn`]
//!
//! # Decode Order
//!
//! version, identifier, grammar kind and max token type, states, non-greedy
//! and precedence flags, rules, modes, interval sets, edges, decisions, lexer
//! actions. Forward references (loop-end loopbacks, block end states) are
//! collected while reading states and resolved once every state exists.
//!
//! After the edge table the decoder derives what the stream leaves implicit:
//! return edges from rule stop states, block start/end pairing, loopback links
//! and precedence decisions.

use super::errors::{FormatError, IntegrityError, LoadError};
use super::format::{
    uuid_from_words, FormatFeatures, NONE_WORD, SERIALIZED_VERSION, WORD_SHIFT,
};
use crate::atn::{
    Atn, BlockFlavor, GrammarKind, IntervalSet, LexerAction, LexerActionType, StateKind,
    StateType, Transition, TransitionKind, EOF,
};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Cursor over the un-shifted words
struct WordReader {
    words: Vec<u16>,
    pos: usize,
}

impl WordReader {
    fn new(raw: &[u16]) -> Self {
        let mut words = raw.to_vec();
        for word in words.iter_mut().skip(1) {
            *word = word.wrapping_sub(WORD_SHIFT);
        }
        WordReader { words, pos: 0 }
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn next(&mut self) -> Result<u16, FormatError> {
        let word = self
            .words
            .get(self.pos)
            .copied()
            .ok_or(FormatError::Truncated { offset: self.pos })?;
        self.pos += 1;
        Ok(word)
    }

    fn next_usize(&mut self) -> Result<usize, FormatError> {
        Ok(self.next()? as usize)
    }

    /// A word where 0xFFFF means "none"
    fn next_optional(&mut self) -> Result<Option<usize>, FormatError> {
        let word = self.next()?;
        Ok((word != NONE_WORD).then_some(word as usize))
    }

    /// A word where 0xFFFF means -1
    fn next_operand(&mut self) -> Result<i32, FormatError> {
        let word = self.next()?;
        Ok(if word == NONE_WORD { -1 } else { word as i32 })
    }

    /// Two words, low half first
    fn next_u32(&mut self) -> Result<u32, FormatError> {
        let low = self.next()? as u32;
        let high = self.next()? as u32;
        Ok(low | (high << 16))
    }

    fn next_uuid(&mut self) -> Result<u128, FormatError> {
        let mut words = [0u16; 8];
        for word in words.iter_mut() {
            *word = self.next()?;
        }
        Ok(uuid_from_words(&words))
    }
}

/// How code points are stored in an interval-set table
#[derive(Debug, Clone, Copy)]
enum SetEncoding {
    Compact,
    Extended,
}

/// Decode a serialized ATN without the verify, bypass and optimize passes
pub(crate) fn deserialize(raw: &[u16]) -> Result<Atn, LoadError> {
    let mut reader = WordReader::new(raw);

    let version = reader.next()?;
    if version != SERIALIZED_VERSION {
        return Err(FormatError::UnsupportedVersion {
            found: version,
            expected: SERIALIZED_VERSION,
        }
        .into());
    }

    let uuid = reader.next_uuid()?;
    let features =
        FormatFeatures::for_identifier(uuid).ok_or(FormatError::UnknownIdentifier(uuid))?;

    let offset = reader.offset();
    let tag = reader.next()?;
    let kind = GrammarKind::from_tag(tag).ok_or(FormatError::InvalidValue {
        what: "grammar kind",
        value: tag as u32,
        offset,
    })?;
    let max_token_type = reader.next()? as i32;
    let mut atn = Atn::new(kind, max_token_type);

    read_states(&mut reader, &mut atn)?;
    read_state_flags(&mut reader, &mut atn)?;
    read_rules(&mut reader, &mut atn, features)?;
    read_modes(&mut reader, &mut atn)?;

    let mut sets = Vec::new();
    read_set_table(&mut reader, &mut sets, SetEncoding::Compact)?;
    if features.extended_sets {
        read_set_table(&mut reader, &mut sets, SetEncoding::Extended)?;
    }

    read_edges(&mut reader, &mut atn, &sets)?;
    let return_edges = synthesize_return_edges(&mut atn);
    link_blocks_and_loops(&mut atn)?;
    read_decisions(&mut reader, &mut atn)?;

    if kind == GrammarKind::Lexer {
        if features.lexer_action_table {
            read_lexer_actions(&mut reader, &mut atn)?;
        } else {
            convert_legacy_actions(&mut atn);
        }
    }

    mark_precedence_decisions(&mut atn);

    debug!(
        kind = %atn.kind,
        states = atn.states.len(),
        rules = atn.rule_count(),
        decisions = atn.number_of_decisions(),
        return_edges,
        "decoded ATN"
    );
    Ok(atn)
}

fn check_state(atn: &Atn, what: &'static str, index: usize) -> Result<usize, IntegrityError> {
    if index < atn.states.len() {
        Ok(index)
    } else {
        Err(IntegrityError::StateOutOfRange {
            what,
            index,
            count: atn.states.len(),
        })
    }
}

fn read_states(reader: &mut WordReader, atn: &mut Atn) -> Result<(), LoadError> {
    let count = reader.next_usize()?;
    let mut pending_loopbacks = Vec::new();
    let mut pending_end_states = Vec::new();

    for _ in 0..count {
        let offset = reader.offset();
        let tag = reader.next()?;
        let state_type = StateType::from_tag(tag).ok_or(FormatError::InvalidValue {
            what: "state type",
            value: tag as u32,
            offset,
        })?;

        // invalid states keep their slot so numbering stays aligned
        if state_type == StateType::Invalid {
            atn.add_state(StateKind::Invalid, None);
            continue;
        }

        let rule_index = reader.next_optional()?;
        let number = atn.add_state(StateKind::from_type(state_type), rule_index);
        match state_type {
            StateType::LoopEnd => pending_loopbacks.push((number, reader.next_usize()?)),
            StateType::BlockStart | StateType::PlusBlockStart | StateType::StarBlockStart => {
                pending_end_states.push((number, reader.next_usize()?))
            }
            _ => {}
        }
    }

    for (state, loopback) in pending_loopbacks {
        let loopback = check_state(atn, "loop end loopback", loopback)?;
        if let StateKind::LoopEnd { loopback: slot } = &mut atn.states[state].kind {
            *slot = Some(loopback);
        }
    }

    for (state, end) in pending_end_states {
        let end = check_state(atn, "block start end state", end)?;
        if let StateKind::BlockStart { end_state, .. } = &mut atn.states[state].kind {
            *end_state = Some(end);
        }
    }

    Ok(())
}

fn read_state_flags(reader: &mut WordReader, atn: &mut Atn) -> Result<(), LoadError> {
    let non_greedy = reader.next_usize()?;
    for _ in 0..non_greedy {
        let state = check_state(atn, "non-greedy list", reader.next_usize()?)?;
        match atn.states[state].kind.decision_mut() {
            Some(info) => info.non_greedy = true,
            None => {
                return Err(IntegrityError::UnexpectedStateKind {
                    state,
                    expected: "decision",
                }
                .into())
            }
        }
    }

    let precedence = reader.next_usize()?;
    for _ in 0..precedence {
        let state = check_state(atn, "precedence rule list", reader.next_usize()?)?;
        match &mut atn.states[state].kind {
            StateKind::RuleStart {
                precedence_rule, ..
            } => *precedence_rule = true,
            _ => {
                return Err(IntegrityError::UnexpectedStateKind {
                    state,
                    expected: "rule start",
                }
                .into())
            }
        }
    }

    Ok(())
}

fn read_rules(
    reader: &mut WordReader,
    atn: &mut Atn,
    features: FormatFeatures,
) -> Result<(), LoadError> {
    let rules = reader.next_usize()?;
    for _ in 0..rules {
        let start = check_state(atn, "rule start", reader.next_usize()?)?;
        if !atn.states[start].is_rule_start() {
            return Err(IntegrityError::UnexpectedStateKind {
                state: start,
                expected: "rule start",
            }
            .into());
        }
        atn.rule_to_start_state.push(start);

        if atn.kind == GrammarKind::Lexer {
            let token_type = reader.next()?;
            atn.rule_to_token_type.push(if token_type == NONE_WORD {
                EOF
            } else {
                token_type as i32
            });

            if !features.lexer_action_table {
                // legacy per-rule action index, superseded by action transitions
                reader.next()?;
            }
        }
    }

    let mut stop_states = vec![None; rules];
    for state in &atn.states {
        if !state.is_rule_stop() {
            continue;
        }
        let rule = state.rule_index.ok_or(IntegrityError::UnexpectedStateKind {
            state: state.number,
            expected: "rule-owned stop",
        })?;
        let slot = stop_states
            .get_mut(rule)
            .ok_or(IntegrityError::RuleOutOfRange {
                state: state.number,
                rule,
                count: rules,
            })?;
        *slot = Some(state.number);
    }

    for (rule, stop) in stop_states.into_iter().enumerate() {
        let stop = stop.ok_or(IntegrityError::MissingStopState { rule })?;
        atn.rule_to_stop_state.push(stop);
        let start = atn.rule_to_start_state[rule];
        if let StateKind::RuleStart { stop_state, .. } = &mut atn.states[start].kind {
            *stop_state = Some(stop);
        }
    }

    Ok(())
}

fn read_modes(reader: &mut WordReader, atn: &mut Atn) -> Result<(), LoadError> {
    let modes = reader.next_usize()?;
    for _ in 0..modes {
        let state = check_state(atn, "mode start", reader.next_usize()?)?;
        if !matches!(atn.states[state].kind, StateKind::TokensStart { .. }) {
            return Err(IntegrityError::UnexpectedStateKind {
                state,
                expected: "tokens start",
            }
            .into());
        }
        atn.mode_to_start_state.push(state);
    }
    Ok(())
}

fn read_set_table(
    reader: &mut WordReader,
    sets: &mut Vec<IntervalSet>,
    encoding: SetEncoding,
) -> Result<(), FormatError> {
    let count = reader.next_usize()?;
    for _ in 0..count {
        let intervals = reader.next_usize()?;
        let mut set = IntervalSet::new();
        if reader.next()? != 0 {
            set.add(EOF);
        }
        for _ in 0..intervals {
            let start = read_code_point(reader, encoding)?;
            let end = read_code_point(reader, encoding)?;
            set.add_range(start, end);
        }
        sets.push(set);
    }
    Ok(())
}

fn read_code_point(reader: &mut WordReader, encoding: SetEncoding) -> Result<i32, FormatError> {
    match encoding {
        SetEncoding::Compact => Ok(reader.next()? as i32),
        SetEncoding::Extended => {
            let offset = reader.offset();
            let value = reader.next_u32()?;
            i32::try_from(value).map_err(|_| FormatError::InvalidValue {
                what: "code point",
                value,
                offset,
            })
        }
    }
}

fn read_edges(
    reader: &mut WordReader,
    atn: &mut Atn,
    sets: &[IntervalSet],
) -> Result<(), LoadError> {
    let edges = reader.next_usize()?;
    for _ in 0..edges {
        let offset = reader.offset();
        let src = check_state(atn, "edge source", reader.next_usize()?)?;
        let trg = check_state(atn, "edge target", reader.next_usize()?)?;
        let tag = reader.next()?;
        let arg1 = reader.next()?;
        let arg2 = reader.next()?;
        let arg3 = reader.next()?;

        let kind = TransitionKind::from_tag(tag).ok_or(FormatError::InvalidValue {
            what: "transition type",
            value: tag as u32,
            offset,
        })?;
        let transition = edge_factory(atn, kind, trg, [arg1, arg2, arg3], sets)?;
        atn.states[src].add_transition(transition);
    }
    Ok(())
}

fn edge_factory(
    atn: &Atn,
    kind: TransitionKind,
    trg: usize,
    [arg1, arg2, arg3]: [u16; 3],
    sets: &[IntervalSet],
) -> Result<Transition, IntegrityError> {
    let set_at = |index: u16| {
        sets.get(index as usize)
            .cloned()
            .ok_or(IntegrityError::SetOutOfRange {
                index: index as usize,
                count: sets.len(),
            })
    };

    Ok(match kind {
        TransitionKind::Epsilon => Transition::epsilon(trg),
        TransitionKind::Range => {
            if arg3 != 0 {
                Transition::range(trg, EOF, arg2 as i32)
            } else {
                Transition::range(trg, arg1 as i32, arg2 as i32)
            }
        }
        TransitionKind::Rule => {
            let rule_start = check_state(atn, "rule transition target", arg1 as usize)?;
            Transition::rule(rule_start, arg2 as usize, arg3 as i32, trg)
        }
        TransitionKind::Predicate => Transition::Predicate {
            target: trg,
            rule_index: arg1 as usize,
            pred_index: arg2 as usize,
            ctx_dependent: arg3 != 0,
        },
        TransitionKind::Precedence => Transition::Precedence {
            target: trg,
            precedence: arg1 as i32,
        },
        TransitionKind::Atom => {
            if arg3 != 0 {
                Transition::atom(trg, EOF)
            } else {
                Transition::atom(trg, arg1 as i32)
            }
        }
        TransitionKind::Action => Transition::Action {
            target: trg,
            rule_index: arg1 as usize,
            action_index: (arg2 != NONE_WORD).then_some(arg2 as usize),
            ctx_dependent: arg3 != 0,
        },
        TransitionKind::Set => Transition::set(trg, set_at(arg1)?),
        TransitionKind::NotSet => Transition::NotSet {
            target: trg,
            set: set_at(arg1)?,
        },
        TransitionKind::Wildcard => Transition::Wildcard { target: trg },
    })
}

/// Add the epsilon edges that return from each called rule to its follow states
///
/// One edge is added per unique (called rule, follow state, outermost marker).
/// The marker is the called rule's index when it is a precedence rule invoked
/// with precedence 0. Calls into a left-factored rule made from a rule that is
/// not left-factored get no return edge. Returns the number of edges added.
pub fn synthesize_return_edges(atn: &mut Atn) -> usize {
    let mut seen = FxHashSet::default();
    let mut edges = Vec::new();

    for state in &atn.states {
        let caller_left_factored = state
            .rule_index
            .is_some_and(|rule| atn.is_left_factored(rule));

        for transition in state.transitions() {
            let Transition::Rule(call) = transition else {
                continue;
            };
            let called = atn
                .states
                .get(call.target)
                .and_then(|start| start.rule_index)
                .unwrap_or(call.rule_index);
            if !caller_left_factored && atn.is_left_factored(called) {
                continue;
            }

            let marker = (atn.is_precedence_rule(called) && call.precedence == 0).then_some(called);
            let key = (called, call.follow_state, marker);
            if seen.insert(key) {
                edges.push(key);
            }
        }
    }

    let mut added = 0;
    for (rule, follow, marker) in edges {
        let Some(&stop) = atn.rule_to_stop_state.get(rule) else {
            continue;
        };
        atn.states[stop].add_transition(Transition::Epsilon {
            target: follow,
            outermost_precedence_return: marker,
        });
        added += 1;
    }
    added
}

fn link_blocks_and_loops(atn: &mut Atn) -> Result<(), IntegrityError> {
    for number in 0..atn.states.len() {
        if let StateKind::BlockStart { end_state, .. } = atn.states[number].kind {
            let end = end_state.ok_or(IntegrityError::MissingEndState { state: number })?;
            match &mut atn.states[end].kind {
                StateKind::BlockEnd { start_state } => {
                    if let Some(first) = *start_state {
                        return Err(IntegrityError::EndStateClaimed {
                            end,
                            first,
                            second: number,
                        });
                    }
                    *start_state = Some(number);
                }
                _ => {
                    return Err(IntegrityError::UnexpectedStateKind {
                        state: end,
                        expected: "block end",
                    })
                }
            }
        }

        let targets: Vec<usize> = atn.states[number]
            .transitions()
            .iter()
            .map(|t| t.target())
            .collect();
        match atn.states[number].kind {
            StateKind::PlusLoopBack { .. } => {
                for target in targets {
                    if let StateKind::BlockStart {
                        flavor: BlockFlavor::Plus { loopback },
                        ..
                    } = &mut atn.states[target].kind
                    {
                        *loopback = Some(number);
                    }
                }
            }
            StateKind::StarLoopBack => {
                for target in targets {
                    if let StateKind::StarLoopEntry { loopback, .. } = &mut atn.states[target].kind
                    {
                        *loopback = Some(number);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_decisions(reader: &mut WordReader, atn: &mut Atn) -> Result<(), LoadError> {
    let decisions = reader.next_usize()?;
    for _ in 0..decisions {
        let state = check_state(atn, "decision list", reader.next_usize()?)?;
        if atn.states[state].kind.decision().is_none() {
            return Err(IntegrityError::UnexpectedStateKind {
                state,
                expected: "decision",
            }
            .into());
        }
        atn.define_decision_state(state)
            .ok_or(IntegrityError::DuplicateDecision { state })?;
    }
    Ok(())
}

fn read_lexer_actions(reader: &mut WordReader, atn: &mut Atn) -> Result<(), LoadError> {
    let count = reader.next_usize()?;
    for _ in 0..count {
        let offset = reader.offset();
        let tag = reader.next()?;
        let action_type = LexerActionType::from_tag(tag).ok_or(FormatError::InvalidValue {
            what: "lexer action type",
            value: tag as u32,
            offset,
        })?;
        let data1 = reader.next_operand()?;
        let data2 = reader.next_operand()?;
        atn.lexer_actions
            .push(LexerAction::from_parts(action_type, data1, data2));
    }
    Ok(())
}

/// Give every legacy action transition its own custom action slot
fn convert_legacy_actions(atn: &mut Atn) {
    for state in atn.states.iter_mut() {
        for transition in state.transitions_mut() {
            let Transition::Action {
                target,
                rule_index,
                action_index,
                ..
            } = *transition
            else {
                continue;
            };
            let slot = atn.lexer_actions.len();
            atn.lexer_actions.push(LexerAction::Custom {
                rule_index: rule_index as i32,
                action_index: action_index.map_or(-1, |index| index as i32),
            });
            *transition = Transition::Action {
                target,
                rule_index,
                action_index: Some(slot),
                ctx_dependent: false,
            };
        }
    }
}

/// Flag the star-loop entries where a precedence rule decides whether to
/// continue its left-recursive loop
pub(crate) fn mark_precedence_decisions(atn: &mut Atn) {
    for number in 0..atn.states.len() {
        let state = &atn.states[number];
        if !matches!(state.kind, StateKind::StarLoopEntry { .. }) {
            continue;
        }
        let in_precedence_rule = state
            .rule_index
            .is_some_and(|rule| atn.is_precedence_rule(rule));
        if in_precedence_rule && loop_exits_to_rule_stop(atn, number) {
            if let StateKind::StarLoopEntry {
                precedence_decision,
                ..
            } = &mut atn.states[number].kind
            {
                *precedence_decision = true;
            }
        }
    }
}

/// True when the last edge of `entry` reaches a loop end whose only way out is
/// an epsilon edge into a rule stop state
pub(crate) fn loop_exits_to_rule_stop(atn: &Atn, entry: usize) -> bool {
    let Some(last) = atn.states[entry].transitions().last() else {
        return false;
    };
    let loop_end = &atn.states[last.target()];
    matches!(loop_end.kind, StateKind::LoopEnd { .. })
        && loop_end.is_epsilon_only()
        && loop_end
            .transitions()
            .first()
            .is_some_and(|t| atn.states[t.target()].is_rule_stop())
}
