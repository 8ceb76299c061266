use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::embedding::error::EncoderError;

/// Architecture family of a pretrained encoder, read from `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderFamily {
    Bert,
    DistilBert,
    /// Deterministic embedding-table encoder used without model files.
    Stub,
}

impl EncoderFamily {
    pub fn from_model_type(model_type: Option<&str>) -> Self {
        match model_type.map(str::to_ascii_lowercase).as_deref() {
            Some("distilbert") => Self::DistilBert,
            _ => Self::Bert,
        }
    }

    /// Checkpoint prefixes tried, in order, before falling back to bare names.
    pub fn weight_prefixes(&self) -> &'static [&'static str] {
        match self {
            Self::Bert => &["bert", "roberta"],
            Self::DistilBert => &["distilbert"],
            Self::Stub => &[],
        }
    }
}

/// The subset of a HuggingFace `config.json` needed before the full config is parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelCard {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    hidden_size: Option<usize>,
    /// DistilBERT names its hidden size `dim`.
    #[serde(default)]
    dim: Option<usize>,
}

impl ModelCard {
    pub fn family(&self) -> EncoderFamily {
        EncoderFamily::from_model_type(self.model_type.as_deref())
    }

    pub fn hidden_size(&self) -> Option<usize> {
        self.hidden_size.or(self.dim)
    }
}

/// Resolved on-disk layout of a model directory.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config_path: PathBuf,
    pub weights_path: PathBuf,
    /// Raw `config.json`, parsed again into the family-specific config.
    pub config_json: String,
    pub card: ModelCard,
}

impl ModelFiles {
    /// Checks that `identifier` names a directory with `config.json` and `model.safetensors`.
    pub fn resolve(identifier: &str) -> Result<Self, EncoderError> {
        let load_error = |reason: String| EncoderError::EncoderLoad {
            identifier: identifier.to_string(),
            reason,
        };

        let model_dir = Path::new(identifier);
        if !model_dir.is_dir() {
            return Err(load_error(format!(
                "model directory not found: {}",
                model_dir.display()
            )));
        }

        let config_path = model_dir.join("config.json");
        if !config_path.exists() {
            return Err(load_error(format!(
                "Missing config.json in {}",
                model_dir.display()
            )));
        }

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(load_error(format!(
                "Missing model.safetensors in {}",
                model_dir.display()
            )));
        }

        let config_json = std::fs::read_to_string(&config_path)
            .map_err(|e| load_error(format!("Failed to read config.json: {}", e)))?;
        let card: ModelCard = serde_json::from_str(&config_json)
            .map_err(|e| load_error(format!("Failed to parse config.json: {}", e)))?;

        Ok(Self {
            config_path,
            weights_path,
            config_json,
            card,
        })
    }
}
