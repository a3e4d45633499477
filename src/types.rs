use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Token identifier in the active tokenizer's vocabulary.
pub type TokenId = u32;

/// A single stop rule: a literal phrase, its canonical tokenization, and how
/// many times the phrase must be observed before generation halts.
///
/// Rules are built once per generation run by [`crate::StopRuleBuilder`] and
/// are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRule {
    pub text: String,
    pub token_ids: Vec<TokenId>,
    pub required_encounters: u32,
    pub handle_leading_newline: bool,
}

impl StopRule {
    /// A rule with an empty token sequence can never match.
    pub fn is_inert(&self) -> bool {
        self.token_ids.is_empty()
    }
}

/// Frozen, ordered collection of stop rules consumed read-only by the
/// detector. Construction order is the detector's evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopRuleSet {
    rules: Vec<StopRule>,
}

impl StopRuleSet {
    pub fn new(rules: Vec<StopRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StopRule> {
        self.rules.iter()
    }

    pub fn get(&self, index: usize) -> Option<&StopRule> {
        self.rules.get(index)
    }

    /// Largest required-encounter count across all rules, 0 for an empty set.
    /// The detector scans only newly generated tokens when this is 1.
    pub fn max_required_encounters(&self) -> u32 {
        self.rules
            .iter()
            .map(|r| r.required_encounters)
            .max()
            .unwrap_or(0)
    }
}

/// Why the detector decided generation must halt.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishReason {
    /// A stop rule reached its required encounter count; carries the matched
    /// stop text.
    StopSequence(String),
    /// The wall-clock budget was exhausted.
    MaxTime,
    /// The sequence reached the configured context-length limit.
    MaxLength,
}

/// Budgets applied by the detector on top of pattern matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Wall-clock budget measured from detector construction.
    pub max_time: Option<Duration>,
    /// Hard context-length limit for the full token sequence.
    pub model_max_length: Option<usize>,
    /// Whether reaching `model_max_length` should stop generation.
    pub truncation_generation: bool,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), StopConfigError> {
        if let Some(max_time) = self.max_time {
            if max_time.is_zero() {
                return Err(StopConfigError::InvalidConfig(
                    "Max time budget must be greater than 0".to_string(),
                ));
            }
        }

        if let Some(model_max_length) = self.model_max_length {
            if model_max_length == 0 {
                return Err(StopConfigError::InvalidConfig(
                    "Model max length must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// Error types
#[derive(Debug, Error)]
pub enum StopConfigError {
    #[error("Stop word list of length {stops} cannot be paired with encounter cycle of length {encounters}")]
    EncounterMismatch { stops: usize, encounters: usize },

    #[error("Invalid stopping configuration: {0}")]
    InvalidConfig(String),
}
