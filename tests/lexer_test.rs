mod common;

use atnstep::atn::EOF;
use atnstep::interpreter::{tokenize, DebugError, Token};
use common::*;

fn kinds(tokens: &[Token]) -> Vec<(i32, &str)> {
    tokens
        .iter()
        .map(|token| (token.token_type, token.text.as_str()))
        .collect()
}

#[test]
fn test_longest_match_and_rule_order() {
    let atn = words_lexer();
    let (tokens, diagnostics) = tokenize(&atn, "if iff 42").expect("lexer ATN");

    assert!(diagnostics.is_empty());
    assert_eq!(
        kinds(&tokens),
        vec![(1, "if"), (2, "iff"), (3, "42"), (EOF, "<EOF>")]
    );
    let columns: Vec<usize> = tokens.iter().map(|token| token.column).collect();
    assert_eq!(columns, vec![0, 3, 7, 9]);
    let indices: Vec<usize> = tokens.iter().map(|token| token.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_unmatched_character_is_reported_and_skipped() {
    let atn = words_lexer();
    let (tokens, diagnostics) = tokenize(&atn, "if $ 42").expect("lexer ATN");

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "token recognition error at: '$'");
    assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 3));
    assert_eq!(kinds(&tokens), vec![(1, "if"), (3, "42"), (EOF, "<EOF>")]);
}

#[test]
fn test_lines_and_columns_across_newlines() {
    let atn = letters_lexer();
    let (tokens, _) = tokenize(&atn, "B\n C").expect("lexer ATN");

    // the newline itself has no rule
    let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.column)).collect();
    assert_eq!(positions, vec![(1, 0), (2, 1), (2, 2)]);
}

#[test]
fn test_mode_stack() {
    let atn = string_lexer();
    let (tokens, diagnostics) = tokenize(&atn, "\"ab\"").expect("lexer ATN");

    assert!(diagnostics.is_empty());
    assert_eq!(
        kinds(&tokens),
        vec![(1, "\""), (2, "ab"), (3, "\""), (EOF, "<EOF>")]
    );
}

#[test]
fn test_letters_outside_the_mode_are_errors() {
    let atn = string_lexer();
    let (tokens, diagnostics) = tokenize(&atn, "ab").expect("lexer ATN");

    assert_eq!(diagnostics.len(), 2);
    assert_eq!(kinds(&tokens), vec![(EOF, "<EOF>")]);
}

#[test]
fn test_empty_input_is_just_eof() {
    let atn = letters_lexer();
    let (tokens, diagnostics) = tokenize(&atn, "").expect("lexer ATN");
    assert!(diagnostics.is_empty());
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].is_eof());
}

#[test]
fn test_parser_atn_is_rejected() {
    let atn = pair_parser();
    assert!(matches!(
        tokenize(&atn, "BC"),
        Err(DebugError::WrongGrammarKind { .. })
    ));
}
