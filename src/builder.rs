use crate::format::{ConversationProfile, PromptFormat};
use crate::normalize::normalize_stop_phrase;
use crate::terminators::{model_terminators, StopWordList};
use crate::tokenizer::{ModelKind, TerminatorProvider, Tokenizer};
use crate::types::{StopConfigError, StopRule, StopRuleSet};
use tracing::debug;

/// Assembles the ordered stop-rule set for one generation run.
///
/// Rule order is deterministic: format-derived words first, caller extras
/// second, model-derived terminators last, with duplicates collapsed to their
/// first-seen position.
#[derive(Debug, Clone)]
pub struct StopRuleBuilder {
    format: PromptFormat,
    profile: ConversationProfile,
    model: String,
    extra_stops: Vec<String>,
}

impl StopRuleBuilder {
    pub fn new(
        format: PromptFormat,
        profile: ConversationProfile,
        model: impl Into<String>,
    ) -> Self {
        Self {
            format,
            profile,
            model: model.into(),
            extra_stops: Vec::new(),
        }
    }

    /// Caller-supplied literal stop strings, e.g. from an agent framework.
    pub fn extra_stops(mut self, stops: Vec<String>) -> Self {
        self.extra_stops = stops;
        self
    }

    pub fn build(
        &self,
        tokenizer: &dyn Tokenizer,
        provider: &dyn TerminatorProvider,
    ) -> Result<StopRuleSet, StopConfigError> {
        let (format_words, encounter_cycle) = self.format_stop_words();
        let encounters = expand_encounters(format_words.len(), &encounter_cycle)?;

        let mut words = StopWordList::new();
        for (word, required) in format_words.into_iter().zip(encounters) {
            words.insert(word, required, true);
        }

        for stop in &self.extra_stops {
            words.insert(stop.clone(), 1, false);
        }

        for terminator in model_terminators(tokenizer, provider, &self.model) {
            words.insert(terminator, 1, false);
        }

        let model_kind = ModelKind::detect(&self.model);
        let mut rules = Vec::with_capacity(words.len());
        for (text, spec) in words.iter() {
            let token_ids = normalize_stop_phrase(
                tokenizer,
                text,
                spec.handle_leading_newline,
                model_kind,
            );
            if token_ids.is_empty() {
                debug!("Dropping stop word with empty tokenization: {:?}", text);
                continue;
            }
            rules.push(StopRule {
                text: text.to_string(),
                token_ids,
                required_encounters: spec.required_encounters,
                handle_leading_newline: spec.handle_leading_newline,
            });
        }

        debug!(
            "Built {} stop rules for format {} on model {:?}",
            rules.len(),
            self.format,
            self.model
        );
        Ok(StopRuleSet::new(rules))
    }

    /// Format-derived stop words paired with their encounter cycle. The cycle
    /// is expanded positionally over the word list by [`expand_encounters`].
    fn format_stop_words(&self) -> (Vec<String>, Vec<u32>) {
        if self.format.is_human_bot() {
            let human = &self.profile.human;
            let bot = &self.profile.bot;
            // One human marker is enough to trigger, but the bot marker needs
            // two: the first scan window after priming already contains the
            // bot marker that started the turn.
            let words = vec![
                human.clone(),
                bot.clone(),
                format!("\n{human}"),
                format!("\n{bot}"),
            ];
            (words, vec![1, 2])
        } else if self.format.is_structured_instruction() {
            let (human_role, assistant_role) = match self.format {
                PromptFormat::InstructVicuna3 => ("User", "Assistant"),
                _ => ("Human", "Assistant"),
            };

            let mut words = role_variants(human_role);
            let human_count = words.len();
            words.extend(role_variants(assistant_role));

            if self.format == PromptFormat::InstructVicuna2 {
                words = words.iter().map(|w| w.to_uppercase()).collect();
            }

            let mut encounters = vec![1; human_count];
            encounters.extend(vec![2; words.len() - human_count]);
            (words, encounters)
        } else if self.format == PromptFormat::InstructWithEnd {
            // Some instruct prompts end turns with this; uncommon otherwise,
            // so stopping on it is safe.
            (vec!["### End".to_string()], vec![1])
        } else if !self.profile.terminate_response.is_empty() {
            let words = self.profile.terminate_response.clone();
            let encounters = vec![1; words.len()];
            (words, encounters)
        } else {
            (Vec::new(), Vec::new())
        }
    }
}

/// Surface spellings a role label shows up with in generated text: plain,
/// newline-prefixed, newline-wrapped, and double-spaced.
fn role_variants(role: &str) -> Vec<String> {
    vec![
        format!("### {role}:"),
        format!("\n### {role}:"),
        format!("\n### {role}:\n"),
        format!("###  {role}:  "),
        format!("###  {role}:"),
    ]
}

/// Expand an encounter cycle positionally over `stops` stop words. The cycle
/// must cover the word list evenly; anything else is a configuration error
/// caught here rather than surfacing as undefined matching behavior later.
fn expand_encounters(stops: usize, cycle: &[u32]) -> Result<Vec<u32>, StopConfigError> {
    if stops == 0 {
        return Ok(Vec::new());
    }
    if cycle.is_empty() || stops % cycle.len() != 0 {
        return Err(StopConfigError::EncounterMismatch {
            stops,
            encounters: cycle.len(),
        });
    }
    Ok((0..stops).map(|i| cycle[i % cycle.len()]).collect())
}
