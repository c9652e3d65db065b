//! Loading, optimizing and serializing ATNs
//!
//! [`load_words`] turns a serialized word stream into an [`Atn`]:
//!
//! 1. decode the stream ([`deserializer`])
//! 2. generate rule bypass paths when requested (parser grammars only)
//! 3. verify the structure ([`IntegrityError`] on violation)
//! 4. optimize to a fixpoint and verify again
//! 5. flag tail calls
//!
//! Any error aborts the load; no partially built graph is returned.

mod bypass;
pub mod cache;
mod deserializer;
pub mod errors;
pub mod format;
pub mod interp_file;
pub mod optimizer;
pub mod serializer;
mod tail_calls;
mod verify;

pub use cache::AtnCache;
pub use deserializer::synthesize_return_edges;
pub use errors::{FormatError, IntegrityError, InterpDataError, LoadError, SerializeError};
pub use interp_file::InterpreterData;
pub use optimizer::{optimize, OptimizationReport};
pub use serializer::{serialize, serialize_with_identifier, to_bytes};

use crate::atn::{Atn, GrammarKind};
use tracing::debug;

/// Which optional passes run after decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub verify: bool,
    pub generate_rule_bypass: bool,
    pub optimize: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            verify: true,
            generate_rule_bypass: false,
            optimize: true,
        }
    }
}

impl LoaderOptions {
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_rule_bypass(mut self, generate: bool) -> Self {
        self.generate_rule_bypass = generate;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }
}

/// Load an ATN from serialized words
pub fn load_words(words: &[u16], options: &LoaderOptions) -> Result<Atn, LoadError> {
    let mut atn = deserializer::deserialize(words)?;

    if options.generate_rule_bypass {
        if atn.kind == GrammarKind::Parser {
            bypass::generate_rule_bypass_transitions(&mut atn)?;
        } else {
            debug!("rule bypass requested for a lexer ATN, skipping");
        }
    }

    if options.verify {
        verify::verify_atn(&atn)?;
    }

    if options.optimize {
        let report = optimize(&mut atn);
        debug!(
            rounds = report.rounds,
            inlined = report.inlined_calls,
            combined = report.combined_epsilons,
            merged = report.merged_set_edges,
            "optimized ATN"
        );
        if options.verify {
            verify::verify_atn(&atn)?;
        }
    }

    tail_calls::identify_tail_calls(&mut atn);
    Ok(atn)
}

/// Load an ATN from a little-endian byte buffer
pub fn load_bytes(bytes: &[u8], options: &LoaderOptions) -> Result<Atn, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(FormatError::OddByteLength(bytes.len()).into());
    }
    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    load_words(&words, options)
}
