use std::io;
use std::path::{Path, PathBuf};

use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Token used to look up the padding id; models without it pad with `0`.
const PAD_TOKEN: &str = "[PAD]";

/// `tokenizer.json` inside a model directory, or the path itself if it already names one.
pub fn tokenizer_path(model_path: &Path) -> PathBuf {
    if model_path.file_name().is_some_and(|name| name == TOKENIZER_FILE) {
        model_path.to_path_buf()
    } else {
        model_path.join(TOKENIZER_FILE)
    }
}

/// Loads a tokenizer whose encodings are always exactly `max_len` tokens long.
///
/// Longer inputs are truncated, shorter ones padded on the right with the
/// tokenizer's `[PAD]` id.
pub fn load_tokenizer_fixed_length(model_path: &Path, max_len: usize) -> io::Result<Tokenizer> {
    let path = tokenizer_path(model_path);
    let mut tokenizer = Tokenizer::from_file(&path).map_err(|e| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}: {}", path.display(), e),
        )
    })?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| io::Error::other(format!("Failed to configure truncation: {}", e)))?;

    let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_len),
        pad_id,
        pad_token: PAD_TOKEN.to_string(),
        ..Default::default()
    }));

    Ok(tokenizer)
}
