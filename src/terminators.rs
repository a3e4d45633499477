use crate::tokenizer::{TerminatorProvider, Tokenizer};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// ChatML end-of-turn marker carried by some instruction-tuned tokenizers.
pub const CHATML_END: &str = "<|im_end|>";

/// Matching parameters attached to an accumulated stop word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopWordSpec {
    pub required_encounters: u32,
    pub handle_leading_newline: bool,
}

/// Insertion-ordered, deduplicated stop-word accumulator.
///
/// Later inserts of an already-present word are ignored, so the first-seen
/// position and matching parameters win. Frozen into a
/// [`crate::StopRuleSet`] by the builder before the detector ever sees it.
#[derive(Debug, Clone, Default)]
pub struct StopWordList {
    words: IndexMap<String, StopWordSpec>,
}

impl StopWordList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stop word, returning false if it was already present.
    pub fn insert(
        &mut self,
        word: impl Into<String>,
        required_encounters: u32,
        handle_leading_newline: bool,
    ) -> bool {
        let word = word.into();
        if self.words.contains_key(&word) {
            debug!("Skipping duplicate stop word: {:?}", word);
            return false;
        }
        self.words.insert(
            word,
            StopWordSpec {
                required_encounters,
                handle_leading_newline,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StopWordSpec)> {
        self.words.iter().map(|(word, spec)| (word.as_str(), spec))
    }
}

/// Collect model-derived terminator strings: the ChatML end-of-turn marker if
/// the tokenizer carries it, the tokenizer's EOS surface string, and any
/// per-model terminators from the provider.
///
/// Provider failures are recoverable by contract and contribute nothing.
pub fn model_terminators(
    tokenizer: &dyn Tokenizer,
    provider: &dyn TerminatorProvider,
    model: &str,
) -> Vec<String> {
    let mut terminators = Vec::new();

    if tokenizer.has_special_token(CHATML_END) {
        terminators.push(CHATML_END.to_string());
    }

    if let Some(eos) = tokenizer.eos_token() {
        terminators.push(eos);
    }

    match provider.terminators(model) {
        Ok(extra) => terminators.extend(extra),
        Err(e) => {
            warn!(
                "Terminator lookup failed for model {}: {}, continuing without extras",
                model, e
            );
        }
    }

    terminators
}
