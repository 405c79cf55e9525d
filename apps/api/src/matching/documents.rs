//! Text extraction from uploaded résumés.

use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::AppError;

const PANDOC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
    Text,
}

impl DocumentKind {
    /// Decided by extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" | "doc" => Some(DocumentKind::Word),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

/// Extracts plain text from an upload. Unsupported formats, unreadable
/// files and files without any text are all caller errors.
pub async fn extract_text(filename: &str, data: Bytes) -> Result<String, AppError> {
    let kind = DocumentKind::from_filename(filename).ok_or_else(|| {
        AppError::Validation("Unsupported file format. Use PDF, DOCX, or TXT.".to_string())
    })?;

    let text = match extract(kind, data).await {
        Ok(text) => text,
        Err(err) => {
            warn!("Text extraction from '{filename}' failed: {err:#}");
            String::new()
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(
            "Could not extract text from resume".to_string(),
        ));
    }
    debug!("Extracted {} chars from '{filename}'", text.len());
    Ok(text.to_string())
}

async fn extract(kind: DocumentKind, data: Bytes) -> Result<String> {
    match kind {
        DocumentKind::Text => Ok(String::from_utf8_lossy(&data).into_owned()),
        DocumentKind::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data).map_err(|e| anyhow!("PDF extraction failed: {e}"))
        })
        .await
        .context("PDF extraction task failed")?,
        DocumentKind::Word => convert_with_pandoc(&data).await,
    }
}

async fn convert_with_pandoc(data: &[u8]) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .suffix(".docx")
        .tempfile()
        .context("failed to create temp file")?;
    file.write_all(data).context("failed to write temp file")?;

    let output = tokio::time::timeout(
        PANDOC_TIMEOUT,
        Command::new("pandoc")
            .arg("-f")
            .arg("docx")
            .arg("-t")
            .arg("plain")
            .arg("--wrap=none")
            .arg(file.path())
            .output(),
    )
    .await
    .map_err(|_| anyhow!("pandoc timed out after {}s", PANDOC_TIMEOUT.as_secs()))?
    .context("failed to run pandoc")?;

    if !output.status.success() {
        bail!(
            "pandoc failed (exit {}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
