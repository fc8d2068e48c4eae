//! PDF text extraction

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::extraction::TextExtractor;

/// Glyph names like `uni2019` that some fonts leak into extracted text
///
/// Leaked names run straight into the surrounding letters (`Borroweruni2019s`),
/// so no word boundaries are required. Glyph names spell the code point in
/// upper-case hex, which keeps words like `uniface` intact.
static GLYPH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"uni([0-9A-F]{4})").expect("Invalid glyph regex"));

/// Typographic characters folded to plain ASCII after extraction
const ASCII_FOLDS: &[(char, &str)] = &[
    ('\u{2010}', "-"),   // Hyphen
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "--"),  // Em dash
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201C}', "\""),  // Left double quote
    ('\u{201D}', "\""),  // Right double quote
    ('\u{2022}', "* "),  // Bullet
    ('\u{2026}', "..."), // Ellipsis
    ('\u{00A0}', " "),   // Non-breaking space
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up PDF text: resolve leaked glyph names, fold typography, drop NULs
pub fn cleanup_pdf_text(text: &str) -> String {
    let resolved = GLYPH_NAME.replace_all(text, |caps: &regex::Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    let mut result = String::with_capacity(resolved.len());
    for c in resolved.chars() {
        if c == '\0' {
            continue;
        }
        match ASCII_FOLDS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => result.push_str(to),
            None => result.push(c),
        }
    }

    result
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// PDF extractor backed by `pdf-extract`, with a `lopdf` page-by-page fallback
#[derive(Debug, Clone)]
pub struct PdfTextExtractor {
    /// Upper bound for the primary extractor before falling back
    timeout: Duration,
}

impl PdfTextExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Extract and clean text from PDF bytes
    ///
    /// Returns an empty string when the PDF parses but carries no text layer.
    pub fn extract_from_bytes(&self, data: &[u8]) -> Result<String> {
        if !contains_pdf_header(data) {
            return Err(Error::extraction("Not a PDF file (missing %PDF header)"));
        }

        let raw = self.extract_with_timeout(data)?;
        Ok(cleanup_pdf_text(&raw))
    }

    /// Run pdf-extract on its own thread so a pathological font cannot hang the request
    fn extract_with_timeout(&self, data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Ok(_)) => {
                let _ = handle.join();
                tracing::debug!("pdf-extract returned no text, trying lopdf");
                Self::extract_with_lopdf(data)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed: {}, trying lopdf", e);
                Self::extract_with_lopdf(data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction timed out after {:?}, trying lopdf",
                    self.timeout
                );
                Self::extract_with_lopdf(data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed, trying lopdf");
                Self::extract_with_lopdf(data)
            }
        }
    }

    /// Fallback extraction using lopdf directly
    fn extract_with_lopdf(data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) if !text.trim().is_empty() => pages.push(text),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                }
            }
        }

        if pages.is_empty() {
            tracing::warn!("PDF has no extractable text, it may be image-based or encrypted");
        }

        // Blank line between pages so each page starts a new paragraph
        Ok(pages.join("\n\n"))
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let data = tokio::fs::read(path).await?;
        let extractor = self.clone();

        tokio::task::spawn_blocking(move || extractor.extract_from_bytes(&data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

/// Readers accept up to 1024 bytes of junk before the header
fn contains_pdf_header(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    head.windows(4).any(|w| w == b"%PDF")
}
