//! Text encoder collaborator.
//!
//! Wraps a pretrained BERT-family model (or a deterministic stub) and maps a
//! [`TokenizedBatch`] to one representation vector per row, `[batch, hidden]`.
//!
//! How the representation is read off the model is decided once, when the
//! encoder is built, and stored as an [`ExtractionPolicy`]:
//!
//! - models that ship a pooler head (`pooler.dense`) use [`ExtractionPolicy::PooledOutput`]
//! - DistilBERT, and BERT checkpoints without a pooler, use the `[CLS]` hidden
//!   state ([`ExtractionPolicy::FirstPositionToken`])
//!
//! Weights are either memory-mapped and frozen ([`WeightMode::Frozen`]) or
//! copied into a [`VarMap`] so the optimizer can update them
//! ([`WeightMode::Trainable`]).

pub mod card;


pub use card::{EncoderFamily, ModelCard, ModelFiles};

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor, Var};
use candle_nn::{Linear, Module, VarBuilder, VarMap};
#[cfg(any(test, feature = "mock"))]
use candle_nn::Embedding;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use tracing::{debug, info};
#[cfg(any(test, feature = "mock"))]
use tracing::warn;

use super::error::EncoderError;
use super::tokenize::TokenizedBatch;
#[cfg(any(test, feature = "mock"))]
use crate::constants::{STUB_HIDDEN_SIZE, STUB_VOCAB_SIZE};

/// How a per-text representation is extracted from encoder output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPolicy {
    /// Output of the model's dedicated pooling head.
    PooledOutput,
    /// Hidden state at position 0 (the `[CLS]` token).
    FirstPositionToken,
}

/// Whether encoder parameters can receive gradient updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMode {
    Frozen,
    Trainable,
}

enum EncoderBackend {
    Bert {
        model: BertModel,
        pooler: Option<Linear>,
    },
    DistilBert {
        model: DistilBertModel,
    },
    #[cfg(any(test, feature = "mock"))]
    Stub {
        embeddings: Embedding,
    },
}

/// A single text encoder instance (query side or document side).
pub struct TextEncoder {
    identifier: String,
    backend: EncoderBackend,
    policy: ExtractionPolicy,
    hidden_size: usize,
    /// Present only for [`WeightMode::Trainable`].
    varmap: Option<VarMap>,
}

impl std::fmt::Debug for TextEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEncoder")
            .field("identifier", &self.identifier)
            .field("family", &self.family())
            .field("policy", &self.policy)
            .field("hidden_size", &self.hidden_size)
            .field("trainable", &self.is_trainable())
            .finish()
    }
}

impl TextEncoder {
    /// Loads the encoder stored in the model directory `identifier`.
    pub fn load(identifier: &str, mode: WeightMode, device: &Device) -> Result<Self, EncoderError> {
        let files = ModelFiles::resolve(identifier)?;
        let family = files.card.family();
        let load_error = |reason: String| EncoderError::EncoderLoad {
            identifier: identifier.to_string(),
            reason,
        };

        // The mmaped view is only used to inspect tensor names when training.
        let mmaped = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&files.weights_path], DType::F32, device)
        }
        .map_err(|e| load_error(format!("Failed to map weights: {}", e)))?;

        let prefix = family
            .weight_prefixes()
            .iter()
            .copied()
            .find(|p| mmaped.contains_tensor(&format!("{p}.embeddings.word_embeddings.weight")));
        let pooler_name = match prefix {
            Some(p) => format!("{p}.pooler.dense.weight"),
            None => "pooler.dense.weight".to_string(),
        };
        let has_pooler = family == EncoderFamily::Bert && mmaped.contains_tensor(&pooler_name);

        let (vb, varmap) = match mode {
            WeightMode::Frozen => (mmaped, None),
            WeightMode::Trainable => {
                let varmap = VarMap::new();
                let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
                (vb, Some(varmap))
            }
        };
        let vb = match prefix {
            Some(p) => vb.pp(p),
            None => vb,
        };

        let (backend, hidden_size) = match family {
            EncoderFamily::DistilBert => {
                let config: DistilBertConfig = serde_json::from_str(&files.config_json)
                    .map_err(|e| load_error(format!("Failed to parse config: {}", e)))?;
                let hidden_size = files
                    .card
                    .hidden_size()
                    .ok_or_else(|| load_error("config.json has no hidden size".to_string()))?;
                let model = DistilBertModel::load(vb, &config)
                    .map_err(|e| load_error(format!("Failed to load DistilBERT model: {}", e)))?;
                (EncoderBackend::DistilBert { model }, hidden_size)
            }
            EncoderFamily::Bert | EncoderFamily::Stub => {
                let config: BertConfig = serde_json::from_str(&files.config_json)
                    .map_err(|e| load_error(format!("Failed to parse config: {}", e)))?;
                let hidden_size = config.hidden_size;
                let pooler = if has_pooler {
                    Some(
                        candle_nn::linear(hidden_size, hidden_size, vb.pp("pooler").pp("dense"))
                            .map_err(|e| load_error(format!("Failed to load pooler: {}", e)))?,
                    )
                } else {
                    None
                };
                let model = BertModel::load(vb, &config)
                    .map_err(|e| load_error(format!("Failed to load BERT model: {}", e)))?;
                (EncoderBackend::Bert { model, pooler }, hidden_size)
            }
        };

        if let Some(ref varmap) = varmap {
            copy_pretrained_weights(varmap, &files.weights_path, device)
                .map_err(|e| load_error(format!("Failed to copy pretrained weights: {}", e)))?;
        }

        let policy = if has_pooler {
            ExtractionPolicy::PooledOutput
        } else {
            ExtractionPolicy::FirstPositionToken
        };

        info!(
            identifier,
            family = ?family,
            policy = ?policy,
            hidden_size,
            mode = ?mode,
            prefix = prefix.unwrap_or(""),
            "Text encoder loaded"
        );

        Ok(Self {
            identifier: identifier.to_string(),
            backend,
            policy,
            hidden_size,
            varmap,
        })
    }

    /// Builds a deterministic embedding-table encoder with masked mean pooling.
    ///
    /// Different seeds give different (but reproducible) weights.
    #[cfg(any(test, feature = "mock"))]
    pub fn stub(seed: u64, mode: WeightMode, device: &Device) -> Result<Self, EncoderError> {
        warn!(seed, mode = ?mode, "Text encoder running in STUB mode (testing only)");

        let weights = stub_weights(seed, STUB_VOCAB_SIZE, STUB_HIDDEN_SIZE, device)?;

        let (embeddings, varmap) = match mode {
            WeightMode::Frozen => (Embedding::new(weights, STUB_HIDDEN_SIZE), None),
            WeightMode::Trainable => {
                let mut varmap = VarMap::new();
                let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
                let embeddings =
                    candle_nn::embedding(STUB_VOCAB_SIZE, STUB_HIDDEN_SIZE, vb.pp("embeddings"))?;
                varmap.set_one("embeddings.weight", &weights)?;
                (embeddings, Some(varmap))
            }
        };

        Ok(Self {
            identifier: format!("stub-{seed}"),
            backend: EncoderBackend::Stub { embeddings },
            policy: ExtractionPolicy::PooledOutput,
            hidden_size: STUB_HIDDEN_SIZE,
            varmap,
        })
    }

    /// Encodes a batch into `[batch, hidden_size]` representations.
    pub fn encode(&self, batch: &TokenizedBatch) -> Result<Tensor, EncoderError> {
        let representations = match &self.backend {
            EncoderBackend::Bert { model, pooler } => {
                let hidden = model.forward(
                    &batch.input_ids,
                    &batch.token_type_ids,
                    Some(&batch.attention_mask),
                )?;
                let cls = hidden.i((.., 0))?;
                match (self.policy, pooler) {
                    (ExtractionPolicy::PooledOutput, Some(pooler)) => {
                        pooler.forward(&cls)?.tanh()?
                    }
                    _ => cls,
                }
            }
            EncoderBackend::DistilBert { model } => {
                // DistilBERT takes no segment ids; its mask marks positions to hide.
                let (batch_size, seq_len) = batch.attention_mask.dims2()?;
                let hide = batch
                    .attention_mask
                    .eq(0u32)?
                    .reshape((batch_size, 1, 1, seq_len))?;
                let hidden = model.forward(&batch.input_ids, &hide)?;
                hidden.i((.., 0))?
            }
            #[cfg(any(test, feature = "mock"))]
            EncoderBackend::Stub { embeddings } => {
                let token_vectors = embeddings.forward(&batch.input_ids)?;
                let mask = batch.attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
                let summed = token_vectors.broadcast_mul(&mask)?.sum(1)?;
                let counts = mask.sum(1)?.clamp(1f32, f32::MAX)?;
                summed.broadcast_div(&counts)?
            }
        };

        debug!(
            identifier = %self.identifier,
            shape = ?representations.dims(),
            "Encoded batch"
        );

        Ok(representations)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn family(&self) -> EncoderFamily {
        match self.backend {
            EncoderBackend::Bert { .. } => EncoderFamily::Bert,
            EncoderBackend::DistilBert { .. } => EncoderFamily::DistilBert,
            #[cfg(any(test, feature = "mock"))]
            EncoderBackend::Stub { .. } => EncoderFamily::Stub,
        }
    }

    pub fn is_trainable(&self) -> bool {
        self.varmap.is_some()
    }

    /// Variables handed to the optimizer. Empty for frozen encoders.
    pub fn trainable_vars(&self) -> Vec<Var> {
        self.varmap
            .as_ref()
            .map(|v| v.all_vars())
            .unwrap_or_default()
    }

    /// Writes the trainable parameters to a safetensors file.
    pub fn save(&self, path: &Path) -> Result<(), EncoderError> {
        let varmap = self.varmap.as_ref().ok_or_else(|| EncoderError::NotTrainable {
            identifier: self.identifier.clone(),
        })?;

        varmap.save(path).map_err(|e| EncoderError::SaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Copies checkpoint tensors into every variable registered in `varmap`.
///
/// Older BERT checkpoints name layer-norm parameters `gamma`/`beta`; those are
/// accepted for `weight`/`bias`.
fn copy_pretrained_weights(
    varmap: &VarMap,
    weights_path: &Path,
    device: &Device,
) -> Result<(), EncoderError> {
    let tensors = candle_core::safetensors::load(weights_path, device)?;
    let vars = varmap.data().lock().map_err(|e| EncoderError::InvalidConfig {
        reason: format!("variable map lock poisoned: {}", e),
    })?;

    for (name, var) in vars.iter() {
        let tensor = tensors
            .get(name)
            .or_else(|| legacy_layer_norm_name(name).and_then(|n| tensors.get(&n)))
            .ok_or_else(|| EncoderError::InvalidConfig {
                reason: format!("checkpoint has no tensor named {name}"),
            })?;
        var.set(&tensor.to_dtype(DType::F32)?)?;
    }

    debug!(count = vars.len(), "Pretrained weights copied into variables");
    Ok(())
}

fn legacy_layer_norm_name(name: &str) -> Option<String> {
    if let Some(stem) = name.strip_suffix(".weight") {
        Some(format!("{stem}.gamma"))
    } else {
        name.strip_suffix(".bias").map(|stem| format!("{stem}.beta"))
    }
}

#[cfg(any(test, feature = "mock"))]
fn stub_weights(
    seed: u64,
    vocab_size: usize,
    hidden_size: usize,
    device: &Device,
) -> Result<Tensor, EncoderError> {
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let values: Vec<f32> = (0..vocab_size * hidden_size)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 32) as f32 / u32::MAX as f32) - 0.5
        })
        .collect();

    Ok(Tensor::from_vec(values, (vocab_size, hidden_size), device)?)
}
