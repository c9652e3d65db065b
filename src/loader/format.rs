//! Serialized ATN format constants and feature negotiation
//!
//! A serialized ATN starts with a version word and an 8-word identifier. The
//! identifiers are ordered oldest first; a stream declaring a newer identifier
//! supports every feature introduced at or before it.

pub const SERIALIZED_VERSION: u16 = 3;

/// Word value meaning "none" for rule indices, token types and action operands
pub const NONE_WORD: u16 = 0xFFFF;

/// Every word except the version is stored as `(value + 2) mod 65536`
pub const WORD_SHIFT: u16 = 2;

pub const BASE_SERIALIZED_UUID: u128 = 0x33761B2D_78BB_4A43_8B0B_4F5BEE8AACF3;
pub const ADDED_PRECEDENCE_TRANSITIONS: u128 = 0x1DA0C57D_6C06_438A_9B27_10BCB3CE0F61;
pub const ADDED_LEXER_ACTIONS: u128 = 0xAADB8D7E_AEEF_4415_AD2B_8204D6CF042E;
pub const ADDED_UNICODE_SMP: u128 = 0x59627784_3BE5_417A_B9EB_8131A7286974;

/// Known identifiers, oldest first
pub const SUPPORTED_UUIDS: [u128; 4] = [
    BASE_SERIALIZED_UUID,
    ADDED_PRECEDENCE_TRANSITIONS,
    ADDED_LEXER_ACTIONS,
    ADDED_UNICODE_SMP,
];

/// Identifier written by the serializer
pub const SERIALIZED_UUID: u128 = ADDED_UNICODE_SMP;

/// Optional sections gated by the stream's identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatFeatures {
    /// Typed lexer action table instead of legacy action transitions
    pub lexer_action_table: bool,
    /// Second interval-set table with 32-bit code points
    pub extended_sets: bool,
}

impl FormatFeatures {
    pub fn for_identifier(uuid: u128) -> Option<Self> {
        let position = uuid_position(uuid)?;
        Some(FormatFeatures {
            lexer_action_table: is_feature_supported(ADDED_LEXER_ACTIONS, position),
            extended_sets: is_feature_supported(ADDED_UNICODE_SMP, position),
        })
    }
}

fn uuid_position(uuid: u128) -> Option<usize> {
    SUPPORTED_UUIDS.iter().position(|&known| known == uuid)
}

fn is_feature_supported(feature: u128, actual_position: usize) -> bool {
    uuid_position(feature).is_some_and(|feature_position| feature_position <= actual_position)
}

/// Assemble an identifier from 8 words, least significant first
pub fn uuid_from_words(words: &[u16; 8]) -> u128 {
    words
        .iter()
        .enumerate()
        .fold(0u128, |acc, (i, &word)| acc | (word as u128) << (16 * i))
}

/// Split an identifier into 8 words, least significant first
pub fn uuid_to_words(uuid: u128) -> [u16; 8] {
    let mut words = [0u16; 8];
    for (i, word) in words.iter_mut().enumerate() {
        *word = (uuid >> (16 * i)) as u16;
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BASE_SERIALIZED_UUID, false, false)]
    #[case(ADDED_PRECEDENCE_TRANSITIONS, false, false)]
    #[case(ADDED_LEXER_ACTIONS, true, false)]
    #[case(ADDED_UNICODE_SMP, true, true)]
    fn test_features_by_identifier(
        #[case] uuid: u128,
        #[case] action_table: bool,
        #[case] extended_sets: bool,
    ) {
        let features = FormatFeatures::for_identifier(uuid).expect("known identifier");
        assert_eq!(features.lexer_action_table, action_table);
        assert_eq!(features.extended_sets, extended_sets);
    }

    #[test]
    fn test_unknown_identifier() {
        assert_eq!(FormatFeatures::for_identifier(0x1234), None);
    }

    #[test]
    fn test_uuid_words_least_significant_first() {
        let words = uuid_to_words(ADDED_UNICODE_SMP);
        assert_eq!(words[0], 0x6974);
        assert_eq!(words[7], 0x5962);
        assert_eq!(uuid_from_words(&words), ADDED_UNICODE_SMP);
    }
}
