use std::sync::Arc;

use crate::embedding::{TextTokenizer, TokenizedInput};

use super::error::DatasetError;
use super::example::Examples;

/// Tokenized query, tokenized document and label for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedPair {
    pub query: TokenizedInput,
    pub document: TokenizedInput,
    pub label: f32,
}

/// Random-access view over aligned `(query, document, label)` columns.
///
/// Texts are tokenized on access; nothing tokenized is retained.
#[derive(Debug, Clone)]
pub struct PairedDataset {
    tokenizer: Arc<TextTokenizer>,
    queries: Vec<String>,
    documents: Vec<String>,
    labels: Vec<f32>,
}

impl PairedDataset {
    pub fn new(
        tokenizer: Arc<TextTokenizer>,
        queries: Vec<String>,
        documents: Vec<String>,
        labels: Vec<f32>,
    ) -> Result<Self, DatasetError> {
        if queries.len() != documents.len() || queries.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                queries: queries.len(),
                documents: documents.len(),
                labels: labels.len(),
            });
        }

        Ok(Self {
            tokenizer,
            queries,
            documents,
            labels,
        })
    }

    pub fn from_examples(tokenizer: Arc<TextTokenizer>, examples: Examples) -> Self {
        let (queries, documents, labels) = examples.into_columns();
        Self {
            tokenizer,
            queries,
            documents,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.tokenizer.max_length()
    }

    /// Tokenizes example `index`, both sides padded to the tokenizer's max length.
    pub fn get(&self, index: usize) -> Result<TokenizedPair, DatasetError> {
        let len = self.len();
        let (query, document, label) = match (
            self.queries.get(index),
            self.documents.get(index),
            self.labels.get(index),
        ) {
            (Some(q), Some(d), Some(l)) => (q, d, *l),
            _ => return Err(DatasetError::IndexOutOfBounds { index, len }),
        };

        Ok(TokenizedPair {
            query: self.tokenizer.encode(query)?,
            document: self.tokenizer.encode(document)?,
            label,
        })
    }
}
