//! Uploaded document handling: saving uploads and extracting text.

use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::DocumentError;

/// Extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// What could be read from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentSummary {
    fn pages(num_pages: usize, first_page_text: String) -> Self {
        Self {
            num_pages: Some(num_pages),
            first_page_text: Some(first_page_text.trim().to_string()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            num_pages: None,
            first_page_text: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Rendering embedded in the `Process this file: ...` message.
    pub fn to_prompt_text(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{{error: {error}}}");
        }
        format!(
            "{{num_pages: {}, first_page_text: {}}}",
            self.num_pages.unwrap_or(0),
            self.first_page_text.as_deref().unwrap_or("")
        )
    }
}

/// Reads page count and first-page text from uploaded documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentReader;

impl DocumentReader {
    /// Read `path`. Failures are reported inside the summary.
    pub fn read(&self, path: &Path) -> DocumentSummary {
        if !path.is_file() {
            return DocumentSummary::failed("File not found");
        }
        match extension(path).as_deref() {
            Some("txt") => read_text(path),
            _ => read_pdf(path),
        }
    }
}

fn read_pdf(path: &Path) -> DocumentSummary {
    let doc = match lopdf::Document::load(path) {
        Ok(doc) => doc,
        Err(e) => return DocumentSummary::failed(format!("Error reading PDF: {e}")),
    };
    let pages = doc.get_pages();
    let Some(first) = pages.keys().next().copied() else {
        return DocumentSummary::failed("Error reading PDF: document has no pages");
    };
    match doc.extract_text(&[first]) {
        Ok(text) => {
            debug!(path = %path.display(), pages = pages.len(), "PDF read");
            DocumentSummary::pages(pages.len(), text)
        }
        Err(e) => DocumentSummary::failed(format!("Error reading PDF: {e}")),
    }
}

fn read_text(path: &Path) -> DocumentSummary {
    match std::fs::read(path) {
        Ok(bytes) => DocumentSummary::pages(1, String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => DocumentSummary::failed(format!("Error reading file: {e}")),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Decode a base64 upload body.
pub fn decode_upload(content_base64: &str) -> Result<Vec<u8>, DocumentError> {
    // Accept data URLs as well as bare base64.
    let data = match content_base64.split_once(";base64,") {
        Some((_, data)) => data,
        None => content_base64,
    };
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| DocumentError::InvalidEncoding(e.to_string()))
}

/// Store an uploaded file as `{dir}/{YYYYmmddHHMMSS}_{name}`.
pub fn save_upload(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
    now: DateTime<Local>,
) -> Result<PathBuf, DocumentError> {
    let name = sanitize_file_name(file_name);
    let ext = extension(Path::new(&name));
    if !ext
        .as_deref()
        .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e))
    {
        return Err(DocumentError::UnsupportedType(file_name.to_string()));
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_{}", now.format("%Y%m%d%H%M%S"), name));
    std::fs::write(&path, bytes)?;
    info!(path = %path.display(), size = bytes.len(), "Upload saved");
    Ok(path)
}

/// Keep only the final path component, replacing anything unusual with `_`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    use super::*;

    fn write_pdf(path: &Path, page_texts: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
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
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 9, 5, 7).unwrap()
    }

    #[test]
    fn reads_pdf_page_count_and_first_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labs.pdf");
        write_pdf(&path, &["Cholesterol normal", "Vitamin D low"]);

        let summary = DocumentReader.read(&path);
        assert!(!summary.is_error(), "{summary:?}");
        assert_eq!(summary.num_pages, Some(2));
        let text = summary.first_page_text.unwrap();
        assert!(text.contains("Cholesterol"));
        assert!(!text.contains("Vitamin"));
    }

    #[test]
    fn missing_file_is_reported() {
        let summary = DocumentReader.read(Path::new("/definitely/not/here.pdf"));
        assert_eq!(summary.error.as_deref(), Some("File not found"));
        assert_eq!(summary.to_prompt_text(), "{error: File not found}");
    }

    #[test]
    fn corrupt_pdf_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let summary = DocumentReader.read(&path);
        assert!(summary.error.unwrap().starts_with("Error reading PDF: "));
    }

    #[test]
    fn text_file_is_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "  Slept 5 hours.\n").unwrap();

        let summary = DocumentReader.read(&path);
        assert_eq!(summary.num_pages, Some(1));
        assert_eq!(
            summary.to_prompt_text(),
            "{num_pages: 1, first_page_text: Slept 5 hours.}"
        );
    }

    #[test]
    fn save_upload_prefixes_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let path = save_upload(&uploads, "../../etc/report 1.txt", b"hi", fixed_now()).unwrap();

        assert_eq!(path.parent().unwrap(), uploads);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "20261016090507_report_1.txt"
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"hi");
    }

    #[test]
    fn save_upload_rejects_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_upload(dir.path(), "scan.exe", b"MZ", fixed_now()).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedType(_)));
        assert!(save_upload(dir.path(), "noext", b"", fixed_now()).is_err());
    }

    #[test]
    fn decode_accepts_bare_and_data_url() {
        assert_eq!(decode_upload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_upload("data:application/pdf;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(
            decode_upload("***"),
            Err(DocumentError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn sanitize_keeps_basename() {
        assert_eq!(sanitize_file_name("C:\\Users\\me\\scan.pdf"), "scan.pdf");
        assert_eq!(sanitize_file_name(".hidden.txt"), "hidden.txt");
        assert_eq!(sanitize_file_name("///"), "upload");
    }
}
