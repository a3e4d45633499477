use crate::tokenizer::Tokenizer;
use crate::types::{DetectorConfig, FinishReason, StopRuleSet, TokenId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Core trait for determining when to stop generation.
///
/// Invoked once per decoding step with the full token sequence so far
/// (prompt plus generated tokens). `None` means keep generating.
pub trait Stopper {
    fn should_stop(&mut self, tokens: &[TokenId]) -> Option<FinishReason>;
}

/// Stateful stop-sequence detector for a single generation run.
///
/// Owns its encounter counters, start time, and new-token offset; one
/// instance per in-flight run, never shared or reused across runs. The host
/// loop must halt token production as soon as a reason is returned.
pub struct StreamingStopDetector {
    rules: StopRuleSet,
    tokenizer: Arc<dyn Tokenizer>,
    config: DetectorConfig,
    num_stops: Vec<u32>,
    token_start: Option<usize>,
    look_at_new_tokens_only: bool,
    started_at: Instant,
}

impl StreamingStopDetector {
    pub fn new(rules: StopRuleSet, tokenizer: Arc<dyn Tokenizer>, config: DetectorConfig) -> Self {
        // When every rule triggers on its first encounter nothing in the
        // primed prompt matters, so only newly generated tokens are scanned.
        // Some models re-segment the lookback window oddly enough to match a
        // stop token inside the prompt otherwise. Multi-encounter rules need
        // the full sequence because they count a marker the primer already
        // contains.
        let look_at_new_tokens_only = rules.max_required_encounters() == 1;
        let num_stops = vec![0; rules.len()];

        Self {
            rules,
            tokenizer,
            config,
            num_stops,
            token_start: None,
            look_at_new_tokens_only,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Encounter count observed so far for the rule at `index`.
    pub fn encounters(&self, index: usize) -> Option<u32> {
        self.num_stops.get(index).copied()
    }
}

impl std::fmt::Debug for StreamingStopDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingStopDetector")
            .field("rules", &self.rules.len())
            .field("num_stops", &self.num_stops)
            .field("token_start", &self.token_start)
            .field("look_at_new_tokens_only", &self.look_at_new_tokens_only)
            .finish()
    }
}

impl Stopper for StreamingStopDetector {
    fn should_stop(&mut self, tokens: &[TokenId]) -> Option<FinishReason> {
        // Budget exhaustion outranks every pattern check.
        if let Some(max_time) = self.config.max_time {
            if self.started_at.elapsed() >= max_time {
                debug!("Stopping: exceeded time budget of {:?}", max_time);
                return Some(FinishReason::MaxTime);
            }
        }

        let token_start = *self.token_start.get_or_insert(tokens.len());
        let new_tokens = if self.look_at_new_tokens_only {
            tokens.get(token_start..).unwrap_or(&[])
        } else {
            tokens
        };

        for (index, rule) in self.rules.iter().enumerate() {
            let pattern_len = rule.token_ids.len();
            // Inert rule, can never match.
            if pattern_len == 0 || new_tokens.len() < pattern_len {
                continue;
            }

            // Tokenization is not injective over surface text: the same
            // phrase re-segments differently depending on context, so the
            // trailing window is decoded and compared as text rather than as
            // raw ids.
            let window = &new_tokens[new_tokens.len() - pattern_len..];
            let window_text = self.tokenizer.decode(window);
            if window_text.contains(&rule.text) {
                self.num_stops[index] += 1;
                if self.num_stops[index] >= rule.required_encounters {
                    debug!(
                        "Stopping: matched {:?} ({} of {} encounters)",
                        rule.text, self.num_stops[index], rule.required_encounters
                    );
                    return Some(FinishReason::StopSequence(rule.text.clone()));
                }
            }
        }

        if self.config.truncation_generation {
            if let Some(model_max_length) = self.config.model_max_length {
                if tokens.len() >= model_max_length {
                    debug!(
                        "Stopping: sequence length {} reached context limit {}",
                        tokens.len(),
                        model_max_length
                    );
                    return Some(FinishReason::MaxLength);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StopRule;

    /// One token per character; decode maps code points back to text.
    struct CharTokenizer;

    impl Tokenizer for CharTokenizer {
        fn encode(&self, text: &str) -> Vec<TokenId> {
            text.chars().map(|c| c as TokenId).collect()
        }

        fn decode(&self, ids: &[TokenId]) -> String {
            ids.iter().filter_map(|&id| char::from_u32(id)).collect()
        }

        fn token_to_id(&self, _token: &str) -> Option<TokenId> {
            None
        }

        fn id_to_token(&self, _id: TokenId) -> Option<String> {
            None
        }

        fn pad_token_id(&self) -> Option<TokenId> {
            None
        }

        fn unk_token_id(&self) -> Option<TokenId> {
            None
        }

        fn bos_token_id(&self) -> Option<TokenId> {
            None
        }

        fn eos_token_id(&self) -> Option<TokenId> {
            None
        }
    }

    fn rule(text: &str, encounters: u32) -> StopRule {
        StopRule {
            text: text.to_string(),
            token_ids: CharTokenizer.encode(text),
            required_encounters: encounters,
            handle_leading_newline: false,
        }
    }

    fn detector(rules: Vec<StopRule>, config: DetectorConfig) -> StreamingStopDetector {
        StreamingStopDetector::new(StopRuleSet::new(rules), Arc::new(CharTokenizer), config)
    }

    fn tokens(text: &str) -> Vec<TokenId> {
        CharTokenizer.encode(text)
    }

    /// Feed `stream` one token at a time on top of `prompt`, returning the
    /// first stop reason and the full-sequence length it fired at.
    fn run_stream(
        detector: &mut StreamingStopDetector,
        prompt: &str,
        stream: &str,
    ) -> Option<(FinishReason, usize)> {
        let mut sequence = tokens(prompt);
        if let Some(reason) = detector.should_stop(&sequence) {
            return Some((reason, sequence.len()));
        }
        for id in tokens(stream) {
            sequence.push(id);
            if let Some(reason) = detector.should_stop(&sequence) {
                return Some((reason, sequence.len()));
            }
        }
        None
    }

    #[test]
    fn test_single_encounter_stops_on_first_match() {
        let mut detector = detector(vec![rule("END", 1)], DetectorConfig::default());

        let (reason, at) = run_stream(&mut detector, "", "abcENDxyz").unwrap();
        assert_eq!(reason, FinishReason::StopSequence("END".to_string()));
        assert_eq!(at, "abcEND".len());
    }

    #[test]
    fn test_double_encounter_stops_on_second_match() {
        let mut detector = detector(vec![rule("<bot>:", 2)], DetectorConfig::default());

        let stream = "<bot>: hello <bot>: more";
        let (reason, at) = run_stream(&mut detector, "", stream).unwrap();
        assert_eq!(reason, FinishReason::StopSequence("<bot>:".to_string()));
        assert_eq!(at, "<bot>: hello <bot>:".len());
    }

    #[test]
    fn test_single_encounter_ignores_primed_prompt() {
        // All-ones encounter counts scan new tokens only, so a stop phrase
        // already present in the prompt must not trigger.
        let mut detector = detector(vec![rule("END", 1)], DetectorConfig::default());

        assert!(run_stream(&mut detector, "prompt END primer", "safe").is_none());
    }

    #[test]
    fn test_multi_encounter_scans_full_sequence() {
        // A bot marker in the primer counts toward the threshold of 2.
        let mut detector = detector(vec![rule("<bot>:", 2)], DetectorConfig::default());

        let (reason, _) = run_stream(&mut detector, "<bot>:", " reply <bot>: next").unwrap();
        assert_eq!(reason, FinishReason::StopSequence("<bot>:".to_string()));
    }

    #[test]
    fn test_rules_checked_in_order() {
        let mut detector = detector(
            vec![rule("ab", 1), rule("b", 1)],
            DetectorConfig::default(),
        );

        // Both rules match on the same step; the earlier rule wins.
        let (reason, _) = run_stream(&mut detector, "", "ab").unwrap();
        assert_eq!(reason, FinishReason::StopSequence("ab".to_string()));
    }

    #[test]
    fn test_inert_rule_is_skipped() {
        let inert = StopRule {
            text: "ghost".to_string(),
            token_ids: Vec::new(),
            required_encounters: 1,
            handle_leading_newline: false,
        };
        let mut detector = detector(vec![inert, rule("END", 1)], DetectorConfig::default());

        let (reason, _) = run_stream(&mut detector, "", "xEND").unwrap();
        assert_eq!(reason, FinishReason::StopSequence("END".to_string()));
    }

    #[test]
    fn test_empty_rule_set_never_pattern_stops() {
        let mut detector = detector(Vec::new(), DetectorConfig::default());
        assert!(run_stream(&mut detector, "", "anything at all goes here").is_none());
    }

    #[test]
    fn test_truncation_on_max_length() {
        let config = DetectorConfig {
            model_max_length: Some(5),
            truncation_generation: true,
            ..Default::default()
        };
        let mut detector = detector(Vec::new(), config);

        assert!(detector.should_stop(&tokens("abcd")).is_none());
        assert_eq!(
            detector.should_stop(&tokens("abcde")),
            Some(FinishReason::MaxLength)
        );
    }

    #[test]
    fn test_truncation_disabled_ignores_limit() {
        let config = DetectorConfig {
            model_max_length: Some(5),
            truncation_generation: false,
            ..Default::default()
        };
        let mut detector = detector(Vec::new(), config);

        assert!(detector.should_stop(&tokens("abcdefgh")).is_none());
    }

    #[test]
    fn test_time_budget_stops_every_invocation_after_expiry() {
        let config = DetectorConfig {
            max_time: Some(Duration::from_millis(5)),
            ..Default::default()
        };
        let mut detector = detector(vec![rule("END", 1)], config);

        assert!(detector.should_stop(&tokens("a")).is_none());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(
            detector.should_stop(&tokens("ab")),
            Some(FinishReason::MaxTime)
        );
        assert_eq!(
            detector.should_stop(&tokens("abc")),
            Some(FinishReason::MaxTime)
        );
    }

    #[test]
    fn test_time_budget_outranks_pattern_match() {
        let config = DetectorConfig {
            max_time: Some(Duration::from_millis(1)),
            ..Default::default()
        };
        let mut detector = detector(vec![rule("END", 1)], config);
        detector.should_stop(&tokens(""));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            detector.should_stop(&tokens("END")),
            Some(FinishReason::MaxTime)
        );
    }

    #[test]
    fn test_encounter_counters_are_monotone() {
        let mut detector = detector(vec![rule("x", 3)], DetectorConfig::default());

        let mut sequence = Vec::new();
        let mut last = 0;
        for id in tokens("axbxc") {
            sequence.push(id);
            detector.should_stop(&sequence);
            let current = detector.encounters(0).unwrap();
            assert!(current >= last);
            last = current;
        }
        assert_eq!(last, 2);
    }
}
