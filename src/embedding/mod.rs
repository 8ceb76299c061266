//! Encoder + tokenizer collaborators.
//!
//! - [`encoder`] maps tokenized text to representation vectors.
//! - [`tokenize`] turns raw text into fixed-length token sequences.

/// Device selection (CPU / Metal / CUDA).
pub mod device;
/// Pretrained text encoders (BERT, DistilBERT, stub).
pub mod encoder;
mod error;
/// Fixed-length tokenization and batch collation.
pub mod tokenize;
/// Tokenizer loading helpers.
pub mod utils;


pub use device::select_device;
pub use encoder::{EncoderFamily, ExtractionPolicy, TextEncoder, WeightMode};
pub use error::EncoderError;
pub use tokenize::{TextTokenizer, TokenizedBatch, TokenizedInput};
