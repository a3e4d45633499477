pub mod builder;
pub mod detector;
pub mod format;
pub mod normalize;
pub mod terminators;
pub mod tokenizer;
pub mod types;

// Re-export commonly used types
pub use types::*;

// Re-export rule building functionality
pub use builder::StopRuleBuilder;
pub use format::{ConversationProfile, PromptFormat};

// Re-export detector functionality
pub use detector::{Stopper, StreamingStopDetector};

// Re-export collaborator contracts
pub use tokenizer::{
    ModelKind, NoTerminators, StaticTerminators, TerminatorError, TerminatorProvider, Tokenizer,
};

// Re-export normalization helpers
pub use normalize::{normalize_stop_phrase, strip_special_ids, SpecialIds};
pub use terminators::{model_terminators, StopWordList, StopWordSpec, CHATML_END};
