//! Training data: relevance corpus loading, the paired example dataset and
//! the mini-batch loader.
//!
//! The flow is `RelevanceCorpus` → [`Examples`] (truncate, split) →
//! [`PairedDataset`] → [`BatchLoader`] → [`PairBatch`] on the compute device.
//! The dataset keeps source order; only the training loader shuffles.

pub mod corpus;
pub mod error;
pub mod example;
pub mod loader;
pub mod paired;


pub use corpus::{COLLECTION_FILE, Judgment, QRELS_FILE, QUERIES_FILE, RelevanceCorpus};
pub use error::DatasetError;
pub use example::{Example, Examples};
pub use loader::{BatchLoader, PairBatch};
pub use paired::{PairedDataset, TokenizedPair};
