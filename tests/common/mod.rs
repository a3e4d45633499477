use stop_stream::{TokenId, Tokenizer};

/// Shared test tokenizer: one token per character, with special tokens placed
/// above the Unicode range so `decode` skips them naturally.

pub const BOS: TokenId = 0x0011_0000;
pub const EOS: TokenId = 0x0011_0001;
pub const PAD: TokenId = 0x0011_0002;
pub const UNK: TokenId = 0x0011_0003;

#[derive(Debug, Default)]
pub struct FakeTokenizer {
    bos_wrap: bool,
    eos_wrap: bool,
    eos_surface: Option<String>,
    added_tokens: Vec<String>,
}

impl FakeTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend BOS to every encoding, the way many tokenizers do.
    pub fn with_bos_wrap(mut self) -> Self {
        self.bos_wrap = true;
        self
    }

    /// Append EOS to every encoding.
    pub fn with_eos_wrap(mut self) -> Self {
        self.eos_wrap = true;
        self
    }

    /// Give the EOS token a surface string (enables EOS-derived terminators).
    pub fn with_eos_surface(mut self, surface: &str) -> Self {
        self.eos_surface = Some(surface.to_string());
        self
    }

    /// Register an added special token, e.g. `<|im_end|>`.
    pub fn with_added_token(mut self, token: &str) -> Self {
        self.added_tokens.push(token.to_string());
        self
    }
}

impl Tokenizer for FakeTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        let mut ids = Vec::new();
        if self.bos_wrap {
            ids.push(BOS);
        }
        ids.extend(text.chars().map(|c| c as TokenId));
        if self.eos_wrap {
            ids.push(EOS);
        }
        ids
    }

    fn decode(&self, ids: &[TokenId]) -> String {
        ids.iter().filter_map(|&id| char::from_u32(id)).collect()
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c as TokenId),
            _ => None,
        }
    }

    fn id_to_token(&self, id: TokenId) -> Option<String> {
        if id == EOS {
            return self.eos_surface.clone();
        }
        char::from_u32(id).map(String::from)
    }

    fn pad_token_id(&self) -> Option<TokenId> {
        Some(PAD)
    }

    fn unk_token_id(&self) -> Option<TokenId> {
        Some(UNK)
    }

    fn bos_token_id(&self) -> Option<TokenId> {
        Some(BOS)
    }

    fn eos_token_id(&self) -> Option<TokenId> {
        Some(EOS)
    }

    fn has_special_token(&self, token: &str) -> bool {
        self.added_tokens.iter().any(|t| t == token)
    }
}

pub fn tokens(text: &str) -> Vec<TokenId> {
    text.chars().map(|c| c as TokenId).collect()
}
