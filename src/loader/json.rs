//! JSON and line-delimited JSON decoding.

use std::path::Path;

use serde_json::Value;

use crate::error::LoaderError;
use crate::loader::read_bytes;

/// Read and parse a JSON file.
pub async fn load(path: &Path) -> Result<Value, LoaderError> {
    let bytes = read_bytes(path).await?;
    parse(&bytes).map_err(|reason| LoaderError::InvalidJson {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse a whole document, falling back to one value per non-blank line.
/// Line-delimited input yields an array.
pub fn parse(bytes: &[u8]) -> Result<Value, String> {
    let whole_err = match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let text = std::str::from_utf8(bytes).map_err(|_| whole_err.to_string())?;
    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(line)
            .map_err(|e| format!("{whole_err}; line {}: {e}", idx + 1))?;
        items.push(value);
    }

    if items.is_empty() {
        return Err(whole_err.to_string());
    }
    Ok(Value::Array(items))
}
