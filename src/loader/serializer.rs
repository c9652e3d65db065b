//! Encoding of an [`Atn`] back into the serialized word stream
//!
//! The output follows the same section order the deserializer reads. Rule stop
//! edges are omitted because loading re-synthesizes them, and interval sets are
//! split between the 16-bit and the 32-bit table by their largest member.

use super::errors::SerializeError;
use super::format::{
    uuid_to_words, FormatFeatures, NONE_WORD, SERIALIZED_UUID, SERIALIZED_VERSION, WORD_SHIFT,
};
use crate::atn::{Atn, GrammarKind, IntervalSet, LexerAction, StateKind, Transition, EOF};
use rustc_hash::FxHashMap;

/// Serialize with the newest format identifier
pub fn serialize(atn: &Atn) -> Result<Vec<u16>, SerializeError> {
    serialize_with_identifier(atn, SERIALIZED_UUID)
}

/// Serialize for a specific (possibly older) format identifier
///
/// Older identifiers lack the typed lexer action table and the 32-bit set
/// table; action transitions then carry their action index directly and every
/// set must fit in 16 bits.
pub fn serialize_with_identifier(atn: &Atn, uuid: u128) -> Result<Vec<u16>, SerializeError> {
    let features =
        FormatFeatures::for_identifier(uuid).ok_or(SerializeError::UnknownIdentifier(uuid))?;

    let mut encoder = Encoder::default();
    encoder.data.push(SERIALIZED_VERSION);
    encoder.data.extend(uuid_to_words(uuid));
    encoder.data.push(atn.kind.tag());
    encoder.push(atn.max_token_type as i64, "max token type")?;

    write_states(&mut encoder, atn)?;
    write_rules(&mut encoder, atn, features)?;

    encoder.push_usize(atn.mode_to_start_state.len(), "mode count")?;
    for &start in &atn.mode_to_start_state {
        encoder.push_usize(start, "mode start state")?;
    }

    let sets = collect_sets(atn);
    let (compact, extended): (Vec<&IntervalSet>, Vec<&IntervalSet>) = sets
        .iter()
        .partition(|set| set.max_element().map_or(true, |max| max <= 0xFFFF));
    if !features.extended_sets {
        if let Some(iv) = extended.first().and_then(|set| set.intervals().last()) {
            return Err(SerializeError::SetNeedsExtendedFormat {
                start: iv.start,
                end: iv.end,
            });
        }
    }

    let mut set_indices = FxHashMap::default();
    encoder.push_usize(compact.len(), "set count")?;
    for set in &compact {
        set_indices.insert(*set, set_indices.len());
        write_set(&mut encoder, set, false)?;
    }
    if features.extended_sets {
        encoder.push_usize(extended.len(), "set count")?;
        for set in &extended {
            set_indices.insert(*set, set_indices.len());
            write_set(&mut encoder, set, true)?;
        }
    }

    write_edges(&mut encoder, atn, &set_indices, features)?;

    encoder.push_usize(atn.decision_to_state.len(), "decision count")?;
    for &state in &atn.decision_to_state {
        encoder.push_usize(state, "decision state")?;
    }

    if atn.kind == GrammarKind::Lexer && features.lexer_action_table {
        encoder.push_usize(atn.lexer_actions.len(), "lexer action count")?;
        for action in &atn.lexer_actions {
            encoder.data.push(action.action_type().tag());
            let (data1, data2) = action.operands();
            encoder.push_operand(data1, "lexer action operand")?;
            encoder.push_operand(data2, "lexer action operand")?;
        }
    }

    let mut words = encoder.data;
    for word in words.iter_mut().skip(1) {
        *word = word.wrapping_add(WORD_SHIFT);
    }
    Ok(words)
}

/// Little-endian byte form of a word stream
pub fn to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

#[derive(Default)]
struct Encoder {
    data: Vec<u16>,
}

impl Encoder {
    fn push(&mut self, value: i64, what: &'static str) -> Result<(), SerializeError> {
        let word = u16::try_from(value).map_err(|_| SerializeError::ValueOutOfRange { what, value })?;
        self.data.push(word);
        Ok(())
    }

    fn push_usize(&mut self, value: usize, what: &'static str) -> Result<(), SerializeError> {
        self.push(value as i64, what)
    }

    fn push_optional(&mut self, value: Option<usize>, what: &'static str) -> Result<(), SerializeError> {
        match value {
            Some(value) => self.push_usize(value, what),
            None => {
                self.data.push(NONE_WORD);
                Ok(())
            }
        }
    }

    /// -1 is written as the "none" word
    fn push_operand(&mut self, value: i32, what: &'static str) -> Result<(), SerializeError> {
        if value == -1 {
            self.data.push(NONE_WORD);
            Ok(())
        } else {
            self.push(value as i64, what)
        }
    }

    fn push_u32(&mut self, value: i32, what: &'static str) -> Result<(), SerializeError> {
        let value = u32::try_from(value).map_err(|_| SerializeError::ValueOutOfRange {
            what,
            value: value as i64,
        })?;
        self.data.push(value as u16);
        self.data.push((value >> 16) as u16);
        Ok(())
    }
}

fn write_states(encoder: &mut Encoder, atn: &Atn) -> Result<(), SerializeError> {
    let mut non_greedy = Vec::new();
    let mut precedence = Vec::new();

    encoder.push_usize(atn.states.len(), "state count")?;
    for state in &atn.states {
        encoder.data.push(state.state_type().tag());
        if matches!(state.kind, StateKind::Invalid) {
            continue;
        }
        encoder.push_optional(state.rule_index, "rule index")?;

        match &state.kind {
            StateKind::LoopEnd { loopback } => {
                encoder.push_usize(loopback.unwrap_or(0), "loopback state")?
            }
            StateKind::BlockStart { end_state, .. } => {
                encoder.push_usize(end_state.unwrap_or(0), "block end state")?
            }
            StateKind::RuleStart {
                precedence_rule: true,
                ..
            } => precedence.push(state.number),
            _ => {}
        }
        if state.is_non_greedy() {
            non_greedy.push(state.number);
        }
    }

    encoder.push_usize(non_greedy.len(), "non-greedy count")?;
    for state in non_greedy {
        encoder.push_usize(state, "non-greedy state")?;
    }
    encoder.push_usize(precedence.len(), "precedence rule count")?;
    for state in precedence {
        encoder.push_usize(state, "precedence rule state")?;
    }
    Ok(())
}

fn write_rules(
    encoder: &mut Encoder,
    atn: &Atn,
    features: FormatFeatures,
) -> Result<(), SerializeError> {
    encoder.push_usize(atn.rule_count(), "rule count")?;
    for (rule, &start) in atn.rule_to_start_state.iter().enumerate() {
        encoder.push_usize(start, "rule start state")?;
        if atn.kind == GrammarKind::Lexer {
            let token_type = atn.rule_to_token_type.get(rule).copied().unwrap_or(0);
            if token_type == EOF {
                encoder.data.push(NONE_WORD);
            } else {
                encoder.push(token_type as i64, "rule token type")?;
            }
            if !features.lexer_action_table {
                encoder.data.push(NONE_WORD);
            }
        }
    }
    Ok(())
}

/// Distinct set labels in edge order
fn collect_sets(atn: &Atn) -> Vec<IntervalSet> {
    let mut sets: Vec<IntervalSet> = Vec::new();
    for state in &atn.states {
        if state.is_rule_stop() {
            continue;
        }
        for transition in state.transitions() {
            if let Transition::Set { set, .. } | Transition::NotSet { set, .. } = transition {
                if !sets.contains(set) {
                    sets.push(set.clone());
                }
            }
        }
    }
    sets
}

fn write_set(encoder: &mut Encoder, set: &IntervalSet, extended: bool) -> Result<(), SerializeError> {
    let contains_eof = set.contains(EOF);
    let intervals = set.intervals();
    let count = if contains_eof && intervals[0].end == EOF {
        intervals.len() - 1
    } else {
        intervals.len()
    };

    encoder.push_usize(count, "interval count")?;
    encoder.data.push(u16::from(contains_eof));
    for iv in intervals {
        let start = if iv.start == EOF {
            if iv.end == EOF {
                continue;
            }
            0
        } else {
            iv.start
        };

        if extended {
            encoder.push_u32(start, "interval bound")?;
            encoder.push_u32(iv.end, "interval bound")?;
        } else {
            encoder.push(start as i64, "interval bound")?;
            encoder.push(iv.end as i64, "interval bound")?;
        }
    }
    Ok(())
}

fn write_edges(
    encoder: &mut Encoder,
    atn: &Atn,
    set_indices: &FxHashMap<&IntervalSet, usize>,
    features: FormatFeatures,
) -> Result<(), SerializeError> {
    let edges: Vec<(usize, &Transition)> = atn
        .states
        .iter()
        .filter(|state| !state.is_rule_stop())
        .flat_map(|state| state.transitions().iter().map(move |t| (state.number, t)))
        .collect();

    encoder.push_usize(edges.len(), "edge count")?;
    for (src, transition) in edges {
        let set_index = |set: &IntervalSet| set_indices.get(set).copied().unwrap_or(0);
        let (trg, args): (usize, [i64; 3]) = match transition {
            Transition::Epsilon { target, .. } => (*target, [0, 0, 0]),
            Transition::Range { target, start, end } => {
                if *start == EOF {
                    (*target, [0, *end as i64, 1])
                } else {
                    (*target, [*start as i64, *end as i64, 0])
                }
            }
            Transition::Rule(call) => (
                call.follow_state,
                [
                    call.target as i64,
                    call.rule_index as i64,
                    call.precedence as i64,
                ],
            ),
            Transition::Predicate {
                target,
                rule_index,
                pred_index,
                ctx_dependent,
            } => (
                *target,
                [
                    *rule_index as i64,
                    *pred_index as i64,
                    i64::from(*ctx_dependent),
                ],
            ),
            Transition::Precedence { target, precedence } => {
                (*target, [*precedence as i64, 0, 0])
            }
            Transition::Atom { target, label } => {
                if *label == EOF {
                    (*target, [0, 0, 1])
                } else {
                    (*target, [*label as i64, 0, 0])
                }
            }
            Transition::Action {
                target,
                rule_index,
                action_index,
                ctx_dependent,
            } => {
                let action = match action_index {
                    Some(index) if !features.lexer_action_table && atn.kind == GrammarKind::Lexer => {
                        legacy_action_index(atn, *index)?
                    }
                    Some(index) => *index as i64,
                    None => NONE_WORD as i64,
                };
                (
                    *target,
                    [*rule_index as i64, action, i64::from(*ctx_dependent)],
                )
            }
            Transition::Set { target, set } => (*target, [set_index(set) as i64, 0, 0]),
            Transition::NotSet { target, set } => (*target, [set_index(set) as i64, 0, 0]),
            Transition::Wildcard { target } => (*target, [0, 0, 0]),
        };

        encoder.push_usize(src, "edge source")?;
        encoder.push_usize(trg, "edge target")?;
        encoder.data.push(transition.kind().tag());
        for arg in args {
            encoder.push(arg, "edge argument")?;
        }
    }
    Ok(())
}

/// In formats without an action table, action transitions carry the custom
/// action's own index
fn legacy_action_index(atn: &Atn, slot: usize) -> Result<i64, SerializeError> {
    match atn.lexer_actions.get(slot) {
        Some(LexerAction::Custom { action_index, .. }) => Ok(if *action_index < 0 {
            NONE_WORD as i64
        } else {
            *action_index as i64
        }),
        _ => Err(SerializeError::ActionNeedsActionTable { index: slot }),
    }
}
