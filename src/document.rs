use anyhow::{Context, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text_by_pages;
use std::fs;
use std::path::Path;

/// A loaded document, split into the text of its pages
#[derive(Debug, Clone)]
pub struct Document {
    /// Text of each page, in page order
    pub pages: Vec<String>,
    /// The document's file name (used as document ID)
    pub document_id: String,
    /// The document's MIME type
    pub mime_type: String,
}

impl Document {
    /// Load a document from a file path
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!("File not found: {}", path.display()));
        }

        let file_name = path
            .file_name()
            .context("Invalid file name")?
            .to_str()
            .context("Invalid file name encoding")?
            .to_string();

        let mime = from_path(path).first_or_octet_stream();
        let mime_type = mime.to_string();
        debug!("Detected MIME type: {}", mime_type);

        let pages = read_document_pages(path, &mime_type)?;

        Ok(Document {
            pages,
            document_id: file_name,
            mime_type,
        })
    }

    /// Total number of characters across all pages
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|page| page.chars().count()).sum()
    }
}

/// Read the pages of a document based on its MIME type
pub fn read_document_pages<P: AsRef<Path>>(file_path: P, mime_type: &str) -> Result<Vec<String>> {
    let path = file_path.as_ref();

    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let pages = extract_text_by_pages(path)
                .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

            let pages: Vec<String> = pages.iter().map(|page| normalize_whitespace(page)).collect();

            if pages.iter().all(|page| page.is_empty()) {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(pages)
        }

        // A plain text file is treated as a single page
        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display()))?;
            Ok(vec![content])
        }

        _ => Err(anyhow::anyhow!(
            "Unsupported document format: {}. Only PDF and text files are supported.",
            mime_type
        )),
    }
}

/// Collapse runs of spaces and keep at most one blank line between paragraphs
fn normalize_whitespace(text: &str) -> String {
    let result = text.replace('\r', "");

    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
            }

            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        let text = "This  has   multiple    spaces.\n\n\nAnd multiple newlines.\r\nAnd Windows line endings.\n\n";
        let expected =
            "This has multiple spaces.\n\nAnd multiple newlines.\nAnd Windows line endings.";
        assert_eq!(normalize_whitespace(text), expected);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Document::from_file("does/not/exist.pdf").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_text_file_is_single_page() {
        let path = std::env::temp_dir().join(format!("pdf-rag-doc-{}.txt", std::process::id()));
        fs::write(&path, "First paragraph.\n\nSecond paragraph.").unwrap();

        let document = Document::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(document.pages.len(), 1);
        assert!(document.mime_type.starts_with("text/plain"));
        assert_eq!(document.char_count(), "First paragraph.\n\nSecond paragraph.".len());
    }

    #[test]
    fn test_unsupported_format() {
        let err = read_document_pages("image.png", "image/png").unwrap_err();
        assert!(err.to_string().contains("Unsupported document format"));
    }
}
