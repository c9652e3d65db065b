//! Reader for ANTLR interpreter-data (`.interp`) files
//!
//! The file lists the vocabulary, rule names, optional channel and mode names,
//! and the serialized ATN as a bracketed list of already-shifted words:
//!
//! ```text
//! token literal names:
//! null
//! '+'
//!
//! token symbolic names:
//! null
//! PLUS
//!
//! rule names:
//! expr
//!
//! atn:
//! [3, 24715, ...]
//! ```

use super::cache::AtnCache;
use super::errors::{InterpDataError, LoadError};
use super::{load_words, LoaderOptions};
use crate::atn::Atn;
use crate::grammar::Vocabulary;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterData {
    pub literal_names: Vec<Option<String>>,
    pub symbolic_names: Vec<Option<String>>,
    pub rule_names: Vec<String>,
    pub channel_names: Vec<String>,
    pub mode_names: Vec<String>,
    pub serialized_atn: Vec<u16>,
}

struct Lines<'a> {
    lines: std::iter::Peekable<std::iter::Enumerate<std::str::Lines<'a>>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Lines {
            lines: text.lines().enumerate().peekable(),
        }
    }

    fn line_number(&mut self) -> usize {
        self.lines.peek().map_or(0, |(number, _)| number + 1)
    }

    fn skip_blank(&mut self) {
        while self
            .lines
            .peek()
            .is_some_and(|(_, line)| line.trim().is_empty())
        {
            self.lines.next();
        }
    }

    fn at_header(&mut self, header: &str) -> bool {
        self.skip_blank();
        self.lines
            .peek()
            .is_some_and(|(_, line)| line.trim() == header)
    }

    /// Consume `header` and the entries up to the next blank line
    fn section(&mut self, header: &'static str) -> Result<Vec<&'a str>, InterpDataError> {
        if !self.at_header(header) {
            return Err(InterpDataError::MissingSection {
                line: self.line_number(),
                expected: header,
            });
        }
        self.lines.next();

        let mut entries = Vec::new();
        while let Some(&(_, line)) = self.lines.peek() {
            let entry = line.trim_end_matches('\r');
            if entry.trim().is_empty() {
                break;
            }
            entries.push(entry);
            self.lines.next();
        }
        Ok(entries)
    }
}

fn optional_name(entry: &str) -> Option<String> {
    (entry != "null").then(|| entry.to_string())
}

impl InterpreterData {
    pub fn parse(text: &str) -> Result<Self, InterpDataError> {
        let mut lines = Lines::new(text);

        let literal_names = lines
            .section("token literal names:")?
            .into_iter()
            .map(optional_name)
            .collect();
        let symbolic_names = lines
            .section("token symbolic names:")?
            .into_iter()
            .map(optional_name)
            .collect();
        let rule_names = lines
            .section("rule names:")?
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut data = InterpreterData {
            literal_names,
            symbolic_names,
            rule_names,
            ..InterpreterData::default()
        };

        if lines.at_header("channel names:") {
            data.channel_names = lines
                .section("channel names:")?
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        if lines.at_header("mode names:") {
            data.mode_names = lines
                .section("mode names:")?
                .into_iter()
                .map(str::to_string)
                .collect();
        }

        if !lines.at_header("atn:") {
            return Err(InterpDataError::MissingAtn);
        }
        let atn_line = lines.line_number() + 1;
        let entries = lines.section("atn:")?;
        let joined = entries.join(" ");
        let body = joined.trim().trim_start_matches('[').trim_end_matches(']');
        for word in body.split(',').map(str::trim).filter(|w| !w.is_empty()) {
            let value = word.parse::<u16>().map_err(|_| InterpDataError::InvalidWord {
                line: atn_line,
                text: word.to_string(),
            })?;
            data.serialized_atn.push(value);
        }
        if data.serialized_atn.is_empty() {
            return Err(InterpDataError::MissingAtn);
        }

        Ok(data)
    }

    pub fn load_atn(&self, options: &LoaderOptions) -> Result<Atn, LoadError> {
        load_words(&self.serialized_atn, options)
    }

    /// Load through `cache`, keyed by the file the data was read from
    pub fn load_cached(&self, cache: &mut AtnCache, key: &str) -> Result<Arc<Atn>, LoadError> {
        cache.get_or_load(key, &self.serialized_atn)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.literal_names.clone(), self.symbolic_names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "token literal names:\nnull\n'+'\nnull\n\n\
token symbolic names:\nnull\nPLUS\nINT\n\n\
rule names:\nexpr\natom\n\n\
atn:\n[3, 24715, 42794]\n";

    #[test]
    fn test_parse_sections() {
        let data = InterpreterData::parse(SAMPLE).expect("valid interp data");
        assert_eq!(
            data.literal_names,
            vec![None, Some("'+'".to_string()), None]
        );
        assert_eq!(data.symbolic_names[2].as_deref(), Some("INT"));
        assert_eq!(data.rule_names, vec!["expr", "atom"]);
        assert!(data.channel_names.is_empty());
        assert_eq!(data.serialized_atn, vec![3, 24715, 42794]);
    }

    #[test]
    fn test_lexer_sections() {
        let text = "token literal names:\nnull\n\ntoken symbolic names:\nnull\nWS\n\n\
rule names:\nWS\n\nchannel names:\nDEFAULT_TOKEN_CHANNEL\nHIDDEN\n\n\
mode names:\nDEFAULT_MODE\n\natn:\n[3, 1]\n";
        let data = InterpreterData::parse(text).expect("valid interp data");
        assert_eq!(data.channel_names, vec!["DEFAULT_TOKEN_CHANNEL", "HIDDEN"]);
        assert_eq!(data.mode_names, vec!["DEFAULT_MODE"]);
    }

    #[test]
    fn test_missing_section() {
        let result = InterpreterData::parse("rule names:\nexpr\n");
        assert!(matches!(
            result,
            Err(InterpDataError::MissingSection {
                expected: "token literal names:",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_word() {
        let text = SAMPLE.replace("42794", "x");
        assert!(matches!(
            InterpreterData::parse(&text),
            Err(InterpDataError::InvalidWord { .. })
        ));
    }
}
