use serde::{Deserialize, Serialize};

/// One labeled query/document pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub query: String,
    pub document: String,
    /// Non-negative relevance grade from the source corpus.
    pub label: f32,
}

impl Example {
    pub fn new(query: impl Into<String>, document: impl Into<String>, label: f32) -> Self {
        Self {
            query: query.into(),
            document: document.into(),
            label,
        }
    }
}

/// Ordered collection of examples, kept in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Examples {
    items: Vec<Example>,
}

impl Examples {
    pub fn new(items: Vec<Example>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Example] {
        &self.items
    }

    /// Keeps the first `subset_size` examples.
    pub fn truncate(mut self, subset_size: usize) -> Self {
        self.items.truncate(subset_size);
        self
    }

    /// Splits into `(train, validation)` at `floor(len * train_fraction)`.
    pub fn split(mut self, train_fraction: f64) -> (Self, Self) {
        let fraction = train_fraction.clamp(0.0, 1.0);
        let split_at = ((self.items.len() as f64) * fraction).floor() as usize;
        let validation = self.items.split_off(split_at);
        (self, Self { items: validation })
    }

    /// Three parallel columns: queries, documents, labels.
    pub fn into_columns(self) -> (Vec<String>, Vec<String>, Vec<f32>) {
        let mut queries = Vec::with_capacity(self.items.len());
        let mut documents = Vec::with_capacity(self.items.len());
        let mut labels = Vec::with_capacity(self.items.len());

        for example in self.items {
            queries.push(example.query);
            documents.push(example.document);
            labels.push(example.label);
        }

        (queries, documents, labels)
    }
}

impl FromIterator<Example> for Examples {
    fn from_iter<I: IntoIterator<Item = Example>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Examples {
    type Item = Example;
    type IntoIter = std::vec::IntoIter<Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
