use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::DatasetError;
use super::example::{Example, Examples};

pub const QUERIES_FILE: &str = "queries.tsv";
pub const COLLECTION_FILE: &str = "collection.tsv";
pub const QRELS_FILE: &str = "qrels.tsv";

/// A relevance judgment: `query_id` judged against `document_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub query_id: String,
    pub document_id: String,
    pub relevance: f32,
}

/// Query records, document records and relevance judgments of a passage corpus.
#[derive(Debug, Default)]
pub struct RelevanceCorpus {
    queries: HashMap<String, String>,
    documents: HashMap<String, String>,
    judgments: Vec<Judgment>,
}

impl RelevanceCorpus {
    pub fn new(
        queries: HashMap<String, String>,
        documents: HashMap<String, String>,
        judgments: Vec<Judgment>,
    ) -> Self {
        Self {
            queries,
            documents,
            judgments,
        }
    }

    /// Reads `queries.tsv`, `collection.tsv` and `qrels.tsv` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, DatasetError> {
        let queries = read_records(&dir.join(QUERIES_FILE))?;
        let documents = read_records(&dir.join(COLLECTION_FILE))?;
        let judgments = read_judgments(&dir.join(QRELS_FILE))?;

        info!(
            dir = %dir.display(),
            queries = queries.len(),
            documents = documents.len(),
            judgments = judgments.len(),
            "Relevance corpus loaded"
        );

        Ok(Self::new(queries, documents, judgments))
    }

    pub fn num_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn judgments(&self) -> &[Judgment] {
        &self.judgments
    }

    /// Joins every judgment with its query and document text, in judgment order.
    pub fn into_examples(self) -> Result<Examples, DatasetError> {
        let Self {
            queries,
            documents,
            judgments,
        } = self;

        judgments
            .into_iter()
            .map(|judgment| {
                let query = queries.get(&judgment.query_id).ok_or_else(|| {
                    DatasetError::MissingRecord {
                        kind: "query",
                        id: judgment.query_id.clone(),
                    }
                })?;
                let document = documents.get(&judgment.document_id).ok_or_else(|| {
                    DatasetError::MissingRecord {
                        kind: "document",
                        id: judgment.document_id.clone(),
                    }
                })?;
                Ok(Example::new(query.as_str(), document.as_str(), judgment.relevance))
            })
            .collect()
    }
}

fn open(path: &Path) -> Result<BufReader<File>, DatasetError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| DatasetError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Non-blank lines with their 1-based line numbers.
fn lines(path: &Path) -> Result<Vec<(usize, String)>, DatasetError> {
    let mut out = Vec::new();
    for (idx, line) in open(path)?.lines().enumerate() {
        let line = line.map_err(|e| DatasetError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !line.trim().is_empty() {
            out.push((idx + 1, line));
        }
    }
    Ok(out)
}

fn malformed(path: &Path, line: usize, reason: impl Into<String>) -> DatasetError {
    DatasetError::Malformed {
        path: PathBuf::from(path),
        line,
        reason: reason.into(),
    }
}

/// `id \t text` records.
fn read_records(path: &Path) -> Result<HashMap<String, String>, DatasetError> {
    let mut records = HashMap::new();
    for (line_no, line) in lines(path)? {
        let (id, text) = line
            .split_once('\t')
            .ok_or_else(|| malformed(path, line_no, "expected '<id>\\t<text>'"))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(malformed(path, line_no, "empty id"));
        }
        records.insert(id.to_string(), text.to_string());
    }
    debug!(path = %path.display(), count = records.len(), "Read records");
    Ok(records)
}

/// `query_id iteration document_id relevance`, whitespace separated.
fn read_judgments(path: &Path) -> Result<Vec<Judgment>, DatasetError> {
    let mut judgments = Vec::new();
    for (line_no, line) in lines(path)? {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [query_id, _iteration, document_id, relevance] = fields.as_slice() else {
            return Err(malformed(
                path,
                line_no,
                format!("expected 4 fields, got {}", fields.len()),
            ));
        };

        let relevance: f32 = relevance
            .parse()
            .map_err(|_| malformed(path, line_no, format!("invalid relevance '{relevance}'")))?;
        if !relevance.is_finite() || relevance < 0.0 {
            return Err(malformed(
                path,
                line_no,
                format!("relevance must be a non-negative grade, got {relevance}"),
            ));
        }

        judgments.push(Judgment {
            query_id: query_id.to_string(),
            document_id: document_id.to_string(),
            relevance,
        });
    }
    Ok(judgments)
}
