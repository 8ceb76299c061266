use std::path::Path;

use candle_core::{Device, Tensor, Var};
use tracing::{debug, info};

use crate::embedding::{EncoderError, TextEncoder, TokenizedBatch, WeightMode};

use super::error::ScoringError;

/// File name of the saved query-side encoder inside a save directory.
pub const QUERY_ENCODER_FILE: &str = "query_encoder.safetensors";
/// File name of the saved document-side encoder inside a save directory.
pub const DOCUMENT_ENCODER_FILE: &str = "document_encoder.safetensors";

/// Scores every query against every document of a batch by inner product.
pub struct DualEncoderScorer {
    query_encoder: TextEncoder,
    document_encoder: TextEncoder,
    mode: WeightMode,
}

impl std::fmt::Debug for DualEncoderScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualEncoderScorer")
            .field("query_encoder", &self.query_encoder)
            .field("document_encoder", &self.document_encoder)
            .field("mode", &self.mode)
            .finish()
    }
}

impl DualEncoderScorer {
    /// Loads independent query and document encoders from one model directory.
    pub fn load(identifier: &str, mode: WeightMode, device: &Device) -> Result<Self, ScoringError> {
        let query_encoder = TextEncoder::load(identifier, mode, device)?;
        let document_encoder = TextEncoder::load(identifier, mode, device)?;

        info!(
            identifier,
            mode = ?mode,
            policy = ?query_encoder.policy(),
            hidden_size = query_encoder.hidden_size(),
            "Dual encoder ready"
        );

        Self::from_encoders(query_encoder, document_encoder, mode)
    }

    /// Dual encoder over two stub encoders derived from `seed`.
    #[cfg(any(test, feature = "mock"))]
    pub fn stub(seed: u64, mode: WeightMode, device: &Device) -> Result<Self, ScoringError> {
        let query_encoder = TextEncoder::stub(seed, mode, device)?;
        let document_encoder = TextEncoder::stub(seed.wrapping_add(1), mode, device)?;
        Self::from_encoders(query_encoder, document_encoder, mode)
    }

    pub fn from_encoders(
        query_encoder: TextEncoder,
        document_encoder: TextEncoder,
        mode: WeightMode,
    ) -> Result<Self, ScoringError> {
        if query_encoder.hidden_size() != document_encoder.hidden_size() {
            return Err(ScoringError::Encoder(EncoderError::InvalidConfig {
                reason: format!(
                    "query hidden size {} does not match document hidden size {}",
                    query_encoder.hidden_size(),
                    document_encoder.hidden_size()
                ),
            }));
        }

        Ok(Self {
            query_encoder,
            document_encoder,
            mode,
        })
    }

    /// Returns the `[B, B]` score matrix; entry `[i, j]` scores query `i` against document `j`.
    pub fn score(
        &self,
        queries: &TokenizedBatch,
        documents: &TokenizedBatch,
    ) -> Result<Tensor, ScoringError> {
        let num_queries = queries.batch_size()?;
        let num_documents = documents.batch_size()?;
        if num_queries != num_documents {
            return Err(ScoringError::ShapeMismatch {
                queries: num_queries,
                documents: num_documents,
            });
        }

        let query_reps = self.query_encoder.encode(queries)?;
        let document_reps = self.document_encoder.encode(documents)?;

        let scores = query_reps.matmul(&document_reps.t()?)?;

        debug!(batch_size = num_queries, "Computed score matrix");

        Ok(scores)
    }

    pub fn query_encoder(&self) -> &TextEncoder {
        &self.query_encoder
    }

    pub fn document_encoder(&self) -> &TextEncoder {
        &self.document_encoder
    }

    pub fn mode(&self) -> WeightMode {
        self.mode
    }

    /// Parameters of both encoders. Empty for a frozen scorer.
    pub fn trainable_vars(&self) -> Vec<Var> {
        let mut vars = self.query_encoder.trainable_vars();
        vars.extend(self.document_encoder.trainable_vars());
        vars
    }

    /// Writes both encoders into `dir` (created if missing).
    pub fn save(&self, dir: &Path) -> Result<(), EncoderError> {
        std::fs::create_dir_all(dir).map_err(|e| EncoderError::SaveFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        self.query_encoder.save(&dir.join(QUERY_ENCODER_FILE))?;
        self.document_encoder.save(&dir.join(DOCUMENT_ENCODER_FILE))?;

        info!(path = %dir.display(), "Student model saved");
        Ok(())
    }
}
