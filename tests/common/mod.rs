//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use candle_core::Device;
use ranker::dataset::{COLLECTION_FILE, QRELS_FILE, QUERIES_FILE};
use ranker::embedding::WeightMode;
use ranker::scoring::DualEncoderScorer;

pub const TOPICS: &[(&str, &str)] = &[
    ("what is rust", "Rust is a systems programming language focused on safety."),
    ("how do magnets work", "Magnets attract iron through magnetic fields."),
    ("best way to brew coffee", "Pour over brewing gives a clean cup of coffee."),
    ("why is the sky blue", "Rayleigh scattering makes the sky look blue."),
    ("capital of france", "Paris is the capital city of France."),
    ("how tall is everest", "Mount Everest stands 8849 metres above sea level."),
    ("what do pandas eat", "Giant pandas eat mostly bamboo shoots and leaves."),
    ("boiling point of water", "Water boils at 100 degrees Celsius at sea level."),
    ("who wrote hamlet", "Hamlet is a tragedy written by William Shakespeare."),
    ("speed of light", "Light travels at about 299792 kilometres per second."),
];

/// Writes a corpus with one judgment per topic (qid `i`, pid `100 + i`).
pub fn write_corpus(dir: &Path) {
    let mut queries = String::new();
    let mut collection = String::new();
    let mut qrels = String::new();

    for (i, (query, passage)) in TOPICS.iter().enumerate() {
        queries.push_str(&format!("{i}\t{query}\n"));
        collection.push_str(&format!("{}\t{passage}\n", 100 + i));
        qrels.push_str(&format!("{i}\t0\t{}\t1\n", 100 + i));
    }
    collection.push_str("999\tA passage nobody judged.\n");

    fs::write(dir.join(QUERIES_FILE), queries).unwrap();
    fs::write(dir.join(COLLECTION_FILE), collection).unwrap();
    fs::write(dir.join(QRELS_FILE), qrels).unwrap();
}

/// Frozen teacher and trainable student stubs with distinct weights.
pub fn stub_models() -> (DualEncoderScorer, DualEncoderScorer) {
    let teacher = DualEncoderScorer::stub(7, WeightMode::Frozen, &Device::Cpu).unwrap();
    let student = DualEncoderScorer::stub(70, WeightMode::Trainable, &Device::Cpu).unwrap();
    (teacher, student)
}
