use crate::tokenizer::{ModelKind, Tokenizer};
use crate::types::TokenId;

/// Artifact token ids a tokenizer may wrap around a stop phrase's encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecialIds {
    pub pad: Option<TokenId>,
    pub unk: Option<TokenId>,
    pub bos: Option<TokenId>,
    pub eos: Option<TokenId>,
}

impl SpecialIds {
    pub fn from_tokenizer(tokenizer: &dyn Tokenizer) -> Self {
        Self {
            pad: tokenizer.pad_token_id(),
            unk: tokenizer.unk_token_id(),
            bos: tokenizer.bos_token_id(),
            eos: tokenizer.eos_token_id(),
        }
    }
}

/// Convert a stop phrase into a canonical token-id sequence suitable for
/// streaming comparison.
///
/// Artifact ids introduced by the encoding (padding, unknown, begin/end
/// markers) are stripped, interior newline artifacts of text-to-text encoder
/// tokenizers are rewritten, and the synthetic leading-newline token is
/// dropped for rules that carry one. An empty result marks the rule inert;
/// the builder drops such rules.
pub fn normalize_stop_phrase(
    tokenizer: &dyn Tokenizer,
    phrase: &str,
    handle_leading_newline: bool,
    model_kind: ModelKind,
) -> Vec<TokenId> {
    let specials = SpecialIds::from_tokenizer(tokenizer);
    let mut ids = strip_special_ids(tokenizer.encode(phrase), &specials);

    if model_kind == ModelKind::Seq2Seq {
        rewrite_interior_newlines(&mut ids, tokenizer);
    }

    // Upstream prompt construction prefixes some stop words with a synthetic
    // newline; drop the token it encoded to.
    if handle_leading_newline && phrase.starts_with('\n') && !ids.is_empty() {
        ids.remove(0);
    }

    ids
}

/// Strip artifact ids from the ends of an encoded sequence. Each strip only
/// applies while the sequence is longer than one id, so a phrase that IS a
/// special token survives.
pub fn strip_special_ids(mut ids: Vec<TokenId>, specials: &SpecialIds) -> Vec<TokenId> {
    if let Some(pad) = specials.pad {
        strip_leading(&mut ids, pad);
    }
    if let Some(unk) = specials.unk {
        strip_leading(&mut ids, unk);
        strip_trailing(&mut ids, unk);
    }
    if let Some(eos) = specials.eos {
        strip_trailing(&mut ids, eos);
    }
    if let Some(bos) = specials.bos {
        strip_leading(&mut ids, bos);
        strip_trailing(&mut ids, bos);
    }
    ids
}

fn strip_leading(ids: &mut Vec<TokenId>, id: TokenId) {
    if ids.len() > 1 && ids[0] == id {
        ids.remove(0);
    }
}

fn strip_trailing(ids: &mut Vec<TokenId>, id: TokenId) {
    if ids.len() > 1 && ids.last() == Some(&id) {
        ids.pop();
    }
}

/// T5-family encoders collapse a run of two spaces into a space+newline
/// artifact; rewrite interior newline ids back to the space id. Endpoints are
/// left untouched.
fn rewrite_interior_newlines(ids: &mut [TokenId], tokenizer: &dyn Tokenizer) {
    let (Some(space), Some(newline)) = (tokenizer.token_to_id(" "), tokenizer.token_to_id("\n"))
    else {
        return;
    };

    let len = ids.len();
    if len <= 2 {
        return;
    }
    for id in &mut ids[1..len - 1] {
        if *id == newline {
            *id = space;
        }
    }
}
