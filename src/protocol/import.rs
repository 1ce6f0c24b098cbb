//! Protocol file import
//!
//! Plain-text formats are decoded as UTF-8. PDFs are read page by page with
//! lopdf and the page texts joined with newlines.

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file type for {0} (expected .txt, .md or .pdf)")]
    UnsupportedType(String),

    #[error("{0} is not valid UTF-8 text")]
    InvalidText(String),

    #[error("failed to parse PDF {filename}: {reason}")]
    Pdf { filename: String, reason: String },

    #[error("{0} contains no extractable text")]
    Empty(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
}

impl FileKind {
    pub fn detect(filename: &str) -> Option<Self> {
        let mime = mime_guess::from_path(filename).first()?;
        match (mime.type_().as_str(), mime.subtype().as_str()) {
            ("application", "pdf") => Some(FileKind::Pdf),
            ("text", _) => Some(FileKind::Text),
            _ => None,
        }
    }
}

/// Extract plain text from an uploaded file
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ImportError> {
    let kind = FileKind::detect(filename)
        .ok_or_else(|| ImportError::UnsupportedType(filename.to_string()))?;

    debug!(filename, size = bytes.len(), ?kind, "Extracting protocol text");

    let text = match kind {
        FileKind::Text => String::from_utf8(bytes.to_vec())
            .map_err(|_| ImportError::InvalidText(filename.to_string()))?,
        FileKind::Pdf => extract_pdf_text(filename, bytes)?,
    };

    if text.trim().is_empty() {
        return Err(ImportError::Empty(filename.to_string()));
    }

    info!(filename, chars = text.chars().count(), "Imported protocol file");
    Ok(text)
}

fn extract_pdf_text(filename: &str, bytes: &[u8]) -> Result<String, ImportError> {
    let pdf_error = |reason: String| ImportError::Pdf {
        filename: filename.to_string(),
        reason,
    };

    let document = Document::load_mem(bytes).map_err(|e| pdf_error(e.to_string()))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(|e| pdf_error(format!("page {}: {}", page_number, e)))?;
        pages.push(text.trim_end().to_string());
    }

    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Minimal PDF with one line of Courier text per page
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_detects_kinds() {
        assert_eq!(FileKind::detect("protocol.txt"), Some(FileKind::Text));
        assert_eq!(FileKind::detect("notes.md"), Some(FileKind::Text));
        assert_eq!(FileKind::detect("Protocol.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::detect("image.png"), None);
        assert_eq!(FileKind::detect("no_extension"), None);
    }

    #[test]
    fn test_plain_text_import() {
        let text = extract_text("protocol.txt", b"Step 1: digest\nStep 2: ligate").unwrap();
        assert_eq!(text, "Step 1: digest\nStep 2: ligate");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = extract_text("protocol.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ImportError::InvalidText(_)));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let err = extract_text("gel.png", b"\x89PNG").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedType(_)));
    }

    #[test]
    fn test_pdf_pages_joined_with_newlines() {
        let bytes = pdf_with_pages(&["Step 1 digest", "Step 2 ligate"]);
        let text = extract_text("protocol.pdf", &bytes).unwrap();
        assert_eq!(text, "Step 1 digest\nStep 2 ligate");
    }

    #[test]
    fn test_corrupt_pdf_rejected() {
        let err = extract_text("protocol.pdf", b"not really a pdf").unwrap_err();
        assert!(matches!(err, ImportError::Pdf { .. }));
    }

    #[test]
    fn test_blank_file_rejected() {
        let err = extract_text("empty.txt", b"  \n ").unwrap_err();
        assert!(matches!(err, ImportError::Empty(_)));
    }
}
