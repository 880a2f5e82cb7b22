//! Reading receipt text from input files.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Extensions accepted by `process` and `batch`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "text", "pdf"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(path).as_str())
}

/// Load the text of a receipt: plain text as-is, PDFs through their text layer.
pub fn read_receipt_text(path: &Path) -> anyhow::Result<String> {
    let extension = extension(path);

    match extension.as_str() {
        "txt" | "text" => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        "pdf" => {
            let data = fs::read(path)?;
            // pdf-extract can panic on malformed documents
            let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&data))
                .map_err(|_| anyhow::anyhow!("PDF extraction panicked (malformed PDF)"))?
                .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;

            debug!("Extracted {} characters from {}", text.len(), path.display());

            if text.trim().is_empty() {
                anyhow::bail!(
                    "No text layer found in {}; scanned receipts need OCR first",
                    path.display()
                );
            }
            Ok(text)
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}
