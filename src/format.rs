use serde::{Deserialize, Serialize};

/// Canonical conversation-format identifier.
///
/// Hosts historically address formats by numeric code, stringified code, or
/// symbolic name interchangeably. All three spellings are accepted by
/// [`PromptFormat::resolve`] exactly once at the boundary; the rest of the
/// crate only ever matches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptFormat {
    Plain,
    HumanBot,
    HumanBotOrig,
    InstructVicuna,
    Guanaco,
    OneShot,
    InstructVicuna2,
    InstructVicuna3,
    InstructWithEnd,
}

impl PromptFormat {
    const ALL: [PromptFormat; 9] = [
        PromptFormat::Plain,
        PromptFormat::HumanBot,
        PromptFormat::HumanBotOrig,
        PromptFormat::InstructVicuna,
        PromptFormat::Guanaco,
        PromptFormat::OneShot,
        PromptFormat::InstructVicuna2,
        PromptFormat::InstructVicuna3,
        PromptFormat::InstructWithEnd,
    ];

    /// Stable numeric code for this format.
    pub fn code(&self) -> u32 {
        match self {
            PromptFormat::Plain => 0,
            PromptFormat::HumanBot => 1,
            PromptFormat::HumanBotOrig => 2,
            PromptFormat::InstructVicuna => 3,
            PromptFormat::Guanaco => 4,
            PromptFormat::OneShot => 5,
            PromptFormat::InstructVicuna2 => 6,
            PromptFormat::InstructVicuna3 => 7,
            PromptFormat::InstructWithEnd => 8,
        }
    }

    /// Symbolic name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            PromptFormat::Plain => "plain",
            PromptFormat::HumanBot => "human_bot",
            PromptFormat::HumanBotOrig => "human_bot_orig",
            PromptFormat::InstructVicuna => "instruct_vicuna",
            PromptFormat::Guanaco => "guanaco",
            PromptFormat::OneShot => "one_shot",
            PromptFormat::InstructVicuna2 => "instruct_vicuna2",
            PromptFormat::InstructVicuna3 => "instruct_vicuna3",
            PromptFormat::InstructWithEnd => "instruct_with_end",
        }
    }

    /// Resolve a loose identifier (numeric code, string-of-code, or symbolic
    /// name, case-insensitive) into its canonical format.
    pub fn resolve(identifier: &str) -> Option<PromptFormat> {
        let identifier = identifier.trim();

        if let Ok(code) = identifier.parse::<u32>() {
            return Self::ALL.iter().copied().find(|f| f.code() == code);
        }

        let lowered = identifier.to_lowercase();
        Self::ALL.iter().copied().find(|f| f.name() == lowered)
    }

    /// Formats that mark turns with free-form human/bot marker strings.
    pub fn is_human_bot(&self) -> bool {
        matches!(self, PromptFormat::HumanBot | PromptFormat::HumanBotOrig)
    }

    /// Formats that mark turns with `### Human:` / `### Assistant:` labels.
    pub fn is_structured_instruction(&self) -> bool {
        matches!(
            self,
            PromptFormat::InstructVicuna
                | PromptFormat::Guanaco
                | PromptFormat::OneShot
                | PromptFormat::InstructVicuna2
                | PromptFormat::InstructVicuna3
        )
    }
}

impl std::fmt::Display for PromptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Turn markers and optional free-form terminators for one conversation
/// scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationProfile {
    pub human: String,
    pub bot: String,
    /// Free-form terminator strings used when no format-specific derivation
    /// applies.
    pub terminate_response: Vec<String>,
}

impl Default for ConversationProfile {
    fn default() -> Self {
        Self {
            human: "<human>:".to_string(),
            bot: "<bot>:".to_string(),
            terminate_response: Vec::new(),
        }
    }
}
