//! Dual-encoder scoring.
//!
//! A [`DualEncoderScorer`] owns a query-side and a document-side
//! [`TextEncoder`](crate::embedding::TextEncoder). For a batch of `B` aligned
//! pairs it returns a `B×B` matrix of raw inner products: the diagonal holds
//! the true pairs, everything off the diagonal is an in-batch negative.
//!
//! Score matrices are never cached; each batch gets a fresh one.

pub mod error;
pub mod scorer;


pub use error::ScoringError;
pub use scorer::{DOCUMENT_ENCODER_FILE, DualEncoderScorer, QUERY_ENCODER_FILE};
