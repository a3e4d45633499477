use crate::types::TokenId;
use std::collections::HashMap;
use thiserror::Error;

/// Tokenizer capability interface consumed by the stopping core.
///
/// Special-token queries are explicit and typed; a `None` answer disables the
/// corresponding normalization step without error. Implementations wrap
/// whatever tokenizer the host runs (SentencePiece, BPE, a remote service).
#[cfg_attr(test, mockall::automock)]
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<TokenId>;

    fn decode(&self, ids: &[TokenId]) -> String;

    /// Vocabulary lookup for a literal token string.
    fn token_to_id(&self, token: &str) -> Option<TokenId>;

    /// Reverse vocabulary lookup.
    fn id_to_token(&self, id: TokenId) -> Option<String>;

    fn pad_token_id(&self) -> Option<TokenId>;

    fn unk_token_id(&self) -> Option<TokenId>;

    fn bos_token_id(&self) -> Option<TokenId>;

    fn eos_token_id(&self) -> Option<TokenId>;

    /// Surface string of the end-of-sequence token, if the tokenizer has one.
    fn eos_token(&self) -> Option<String> {
        self.eos_token_id().and_then(|id| self.id_to_token(id))
    }

    /// Whether `token` exists in the tokenizer's added special vocabulary
    /// (e.g. `<|im_end|>` for ChatML-tuned models).
    fn has_special_token(&self, token: &str) -> bool {
        self.token_to_id(token).is_some()
    }
}

#[derive(Debug, Error)]
pub enum TerminatorError {
    #[error("No terminator configuration for model: {0}")]
    NotFound(String),

    #[error("Terminator lookup failed: {0}")]
    Lookup(String),
}

/// Supplies additional per-model terminator strings (end-of-turn markers,
/// configured end-of-sequence strings). Lookup failures are recoverable by
/// contract: the rule builder swallows them and continues without extras.
#[cfg_attr(test, mockall::automock)]
pub trait TerminatorProvider: Send + Sync {
    fn terminators(&self, model: &str) -> Result<Vec<String>, TerminatorError>;
}

/// Provider that never contributes terminators.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerminators;

impl TerminatorProvider for NoTerminators {
    fn terminators(&self, _model: &str) -> Result<Vec<String>, TerminatorError> {
        Ok(Vec::new())
    }
}

/// Provider backed by a fixed model-to-terminators table.
#[derive(Debug, Clone, Default)]
pub struct StaticTerminators {
    entries: HashMap<String, Vec<String>>,
}

impl StaticTerminators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: impl Into<String>, terminators: Vec<String>) {
        self.entries.insert(model.into(), terminators);
    }
}

impl TerminatorProvider for StaticTerminators {
    fn terminators(&self, model: &str) -> Result<Vec<String>, TerminatorError> {
        self.entries
            .get(model)
            .cloned()
            .ok_or_else(|| TerminatorError::NotFound(model.to_string()))
    }
}

/// Broad architecture class of the active model, detected from its
/// identifier. Text-to-text encoder tokenizers collapse a double space into a
/// space+newline artifact, which selects an extra normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Causal,
    Seq2Seq,
}

impl ModelKind {
    pub fn detect(model: &str) -> ModelKind {
        let lowered = model.to_lowercase();
        if lowered.contains("t5") || lowered.contains("flan") {
            ModelKind::Seq2Seq
        } else {
            ModelKind::Causal
        }
    }
}
