//! Tokens and the parser's view of the token stream

use crate::atn::EOF;

pub const DEFAULT_CHANNEL: i32 = 0;
pub const HIDDEN_CHANNEL: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: i32,
    pub channel: i32,
    /// Char offset of the first character
    pub start: usize,
    /// Char offset one past the last character
    pub stop: usize,
    pub line: usize,
    pub column: usize,
    /// Position in the token stream
    pub index: usize,
    pub text: String,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.token_type == EOF
    }
}

/// Buffered tokens with a cursor that only stops on the default channel
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenStream {
    /// Wrap lexer output; an EOF token is appended if missing
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |token| !token.is_eof()) {
            let (start, line, column) = tokens
                .last()
                .map_or((0, 1, 0), |last| (last.stop, last.line, last.column + last.text.chars().count()));
            tokens.push(Token {
                token_type: EOF,
                channel: DEFAULT_CHANNEL,
                start,
                stop: start,
                line,
                column,
                index: tokens.len(),
                text: "<EOF>".to_string(),
            });
        }
        let mut stream = TokenStream {
            tokens,
            position: 0,
        };
        stream.position = stream.next_on_channel(0);
        stream
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token at a stream position, clamped to the EOF token
    pub fn get(&self, index: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    /// Index of the current token
    pub fn index(&self) -> usize {
        self.position
    }

    /// Type of the current token
    pub fn la(&self) -> i32 {
        self.get(self.position).token_type
    }

    pub fn current(&self) -> &Token {
        self.get(self.position)
    }

    /// First default-channel token at or after `index`
    pub fn next_on_channel(&self, index: usize) -> usize {
        let last = self.tokens.len() - 1;
        (index..last)
            .find(|&i| self.tokens[i].channel == DEFAULT_CHANNEL)
            .unwrap_or(last)
    }

    /// Move to the next default-channel token; stays put at EOF
    pub fn consume(&mut self) {
        if self.la() != EOF {
            self.position = self.next_on_channel(self.position + 1);
        }
    }

    /// Last default-channel token before the current one
    pub fn previous(&self) -> Option<usize> {
        (0..self.position)
            .rev()
            .find(|&i| self.tokens[i].channel == DEFAULT_CHANNEL)
    }

    /// Concatenated text of the default-channel tokens in `start..=stop`
    pub fn text_between(&self, start: usize, stop: usize) -> String {
        let last = self.tokens.len() - 1;
        (start.min(last)..=stop.min(last))
            .map(|i| &self.tokens[i])
            .filter(|token| !token.is_eof())
            .map(|token| token.text.as_str())
            .collect()
    }
}
