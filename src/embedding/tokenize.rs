//! Tokenizer collaborator: text in, fixed-length token sequences out.

#[cfg(any(test, feature = "mock"))]
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::info;
#[cfg(any(test, feature = "mock"))]
use tracing::{debug, warn};

use super::error::EncoderError;
use super::utils::load_tokenizer_fixed_length;
use crate::constants::STUB_PAD_ID;
#[cfg(any(test, feature = "mock"))]
use crate::constants::{STUB_CLS_ID, STUB_VOCAB_SIZE};

/// One tokenized text, exactly `max_length` positions long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedInput {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Segment ids. All zeros for single-sentence input.
    pub token_type_ids: Vec<u32>,
}

impl TokenizedInput {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions.
    pub fn active_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }

    /// Truncates or right-pads every field to `max_length`.
    fn fixed_length(mut self, max_length: usize, pad_id: u32) -> Self {
        self.input_ids.resize(max_length, pad_id);
        self.attention_mask.resize(max_length, 0);
        self.token_type_ids.resize(max_length, 0);
        self
    }
}

/// Device tensors for a batch of tokenized texts, each `[batch, max_length]`.
#[derive(Debug, Clone)]
pub struct TokenizedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

impl TokenizedBatch {
    /// Stacks inputs into `[batch, max_length]` tensors on `device`.
    pub fn collate(inputs: &[&TokenizedInput], device: &Device) -> Result<Self, EncoderError> {
        let seq_len = inputs.first().map(|i| i.len()).unwrap_or(0);

        if let Some(bad) = inputs.iter().find(|i| i.len() != seq_len) {
            return Err(EncoderError::InvalidConfig {
                reason: format!(
                    "tokenized inputs must share one length: expected {seq_len}, got {}",
                    bad.len()
                ),
            });
        }

        Ok(Self {
            input_ids: stack_field(inputs, device, |i| i.input_ids.as_slice())?,
            attention_mask: stack_field(inputs, device, |i| i.attention_mask.as_slice())?,
            token_type_ids: stack_field(inputs, device, |i| i.token_type_ids.as_slice())?,
        })
    }

    pub fn batch_size(&self) -> Result<usize, EncoderError> {
        Ok(self.input_ids.dim(0)?)
    }
}

fn stack_field(
    inputs: &[&TokenizedInput],
    device: &Device,
    field: impl Fn(&TokenizedInput) -> &[u32],
) -> Result<Tensor, EncoderError> {
    let seq_len = inputs.first().map(|i| i.len()).unwrap_or(0);
    let flat: Vec<u32> = inputs
        .iter()
        .flat_map(|i| field(i).iter().copied())
        .collect();
    Ok(Tensor::from_vec(flat, (inputs.len(), seq_len), device)?)
}

enum TokenizerBackend {
    HuggingFace(Box<Tokenizer>),
    #[cfg(any(test, feature = "mock"))]
    Stub,
}

/// Produces [`TokenizedInput`]s truncated and padded to a fixed length.
pub struct TextTokenizer {
    backend: TokenizerBackend,
    max_length: usize,
}

impl std::fmt::Debug for TextTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextTokenizer")
            .field(
                "backend",
                &match self.backend {
                    TokenizerBackend::HuggingFace(_) => "HuggingFace",
                    #[cfg(any(test, feature = "mock"))]
                    TokenizerBackend::Stub => "Stub",
                },
            )
            .field("max_length", &self.max_length)
            .finish()
    }
}

impl TextTokenizer {
    /// Loads `tokenizer.json` from a model directory.
    pub fn from_model_dir(model_dir: &Path, max_length: usize) -> Result<Self, EncoderError> {
        if max_length == 0 {
            return Err(EncoderError::InvalidConfig {
                reason: "max_length must be greater than 0".to_string(),
            });
        }

        let tokenizer = load_tokenizer_fixed_length(model_dir, max_length).map_err(|e| {
            EncoderError::EncoderLoad {
                identifier: model_dir.display().to_string(),
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        info!(
            model_dir = %model_dir.display(),
            max_length,
            vocab_size = tokenizer.get_vocab_size(true),
            "Tokenizer loaded"
        );

        Ok(Self {
            backend: TokenizerBackend::HuggingFace(Box::new(tokenizer)),
            max_length,
        })
    }

    /// Deterministic whitespace tokenizer that needs no files (testing only).
    #[cfg(any(test, feature = "mock"))]
    pub fn stub(max_length: usize) -> Self {
        warn!(max_length, "Tokenizer running in STUB mode (testing only)");
        Self {
            backend: TokenizerBackend::Stub,
            max_length: max_length.max(1),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    #[cfg(any(test, feature = "mock"))]
    pub fn is_stub(&self) -> bool {
        matches!(self.backend, TokenizerBackend::Stub)
    }

    pub fn encode(&self, text: &str) -> Result<TokenizedInput, EncoderError> {
        match &self.backend {
            TokenizerBackend::HuggingFace(tokenizer) => self.encode_with_model(text, tokenizer),
            #[cfg(any(test, feature = "mock"))]
            TokenizerBackend::Stub => Ok(self.encode_stub(text)),
        }
    }

    fn encode_with_model(
        &self,
        text: &str,
        tokenizer: &Tokenizer,
    ) -> Result<TokenizedInput, EncoderError> {
        let encoding =
            tokenizer
                .encode(text, true)
                .map_err(|e| EncoderError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .unwrap_or(STUB_PAD_ID);

        let input = TokenizedInput {
            input_ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            token_type_ids: encoding.get_type_ids().to_vec(),
        };

        Ok(input.fixed_length(self.max_length, pad_id))
    }

    #[cfg(any(test, feature = "mock"))]
    fn encode_stub(&self, text: &str) -> TokenizedInput {
        let mut input_ids = vec![STUB_CLS_ID];
        input_ids.extend(
            text.split_whitespace()
                .take(self.max_length - 1)
                .map(|word| stub_token_id(&word.to_lowercase())),
        );

        let active = input_ids.len();
        debug!(text_len = text.len(), active, "Stub tokenization");

        TokenizedInput {
            attention_mask: vec![1; active],
            token_type_ids: vec![0; active],
            input_ids,
        }
        .fixed_length(self.max_length, STUB_PAD_ID)
    }
}

#[cfg(any(test, feature = "mock"))]
fn stub_token_id(word: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    word.hash(&mut hasher);
    let reserved = STUB_CLS_ID as u64 + 1;
    (reserved + hasher.finish() % (STUB_VOCAB_SIZE as u64 - reserved)) as u32
}
