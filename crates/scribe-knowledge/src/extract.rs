//! Source document loading: plain text as-is, PDFs through `pdf-extract`.

use std::path::Path;

use scribe_core::error::{Result, ScribeError};

/// Kinds of source file `ingest_file` understands, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
            _ => DocumentKind::Text,
        }
    }
}

/// Read `path` into a single string of document text.
pub async fn read_document(path: &Path) -> Result<String> {
    match DocumentKind::from_path(path) {
        DocumentKind::Text => Ok(tokio::fs::read_to_string(path).await?),
        DocumentKind::Pdf => {
            let bytes = tokio::fs::read(path).await?;
            extract_pdf(bytes, path).await
        }
    }
}

async fn extract_pdf(bytes: Vec<u8>, path: &Path) -> Result<String> {
    // pdf-extract is synchronous and CPU-bound
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .await
        .map_err(|e| ScribeError::Extraction(format!("{}: extractor task failed: {e}", path.display())))?
        .map_err(|e| ScribeError::Extraction(format!("{}: {e}", path.display())))?;

    let text = pages.join("\n");
    tracing::info!("📄 Extracted {} pages, {} characters from {}", pages.len(), text.chars().count(), path.display());

    if text.trim().is_empty() {
        return Err(ScribeError::Extraction(format!(
            "{} has no extractable text (image-only or encrypted?)",
            path.display()
        )));
    }
    Ok(text)
}
