//! Source document discovery and plain-text extraction.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::RagError;

/// Extensions picked up from the source directory.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// A document found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Base file name; used as the chunk source and ID prefix.
    pub file_name: String,
}

/// Lists supported documents directly inside `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<SourceDocument>, RagError> {
    let mut documents = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!("Skipping non UTF-8 file name: {}", path.display());
            continue;
        };
        documents.push(SourceDocument {
            file_name: file_name.to_string(),
            path,
        });
    }

    documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(documents)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Turns a document on disk into plain text. Called from a blocking task.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, RagError>;
}

/// Extension-based extractor for PDF and plain-text files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, RagError> {
        extract_text(path)
    }
}

/// Extracts the plain text of a document. Blocking; PDF parsing is CPU bound.
pub fn extract_text(path: &Path) -> Result<String, RagError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            // pdf-extract panics on some malformed inputs
            let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
                .map_err(|_| {
                    RagError::Extraction(format!("{}: parser panicked", path.display()))
                })?
                .map_err(|e| RagError::Extraction(format!("{}: {}", path.display(), e)))?;
            Ok(join_pages(&pages))
        }
        "txt" | "md" => Ok(fs::read_to_string(path)?),
        other => Err(RagError::Extraction(format!(
            "unsupported document type '{}' for {}",
            other,
            path.display()
        ))),
    }
}

/// Every page is followed by a newline.
fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_supported_files_sorted_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.PDF"), "not really a pdf").unwrap();
        fs::write(dir.path().join("notes.md"), "n").unwrap();
        fs::write(dir.path().join("image.png"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let docs = list_documents(dir.path()).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.txt", "notes.md"]);
    }

    #[test]
    fn reads_plain_text_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brief.txt");
        fs::write(&path, "Subsea cable landing stations").unwrap();

        assert_eq!(extract_text(&path).unwrap(), "Subsea cable landing stations");
    }

    #[test]
    fn corrupt_pdf_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4 garbage").unwrap();

        assert!(extract_text(&path).is_err());
    }

    /// Minimal PDF with one Helvetica text line per page.
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let page_count = lines.len();
        let font_id = 3 + page_count;
        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                (0..page_count)
                    .map(|i| format!("{} 0 R", 3 + i))
                    .collect::<Vec<_>>()
                    .join(" "),
                page_count
            ),
        ];
        for i in 0..page_count {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                font_id,
                font_id + 1 + i
            ));
        }
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
        for line in lines {
            let stream = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", line);
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn pdf_pages_are_newline_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_pages.pdf");
        fs::write(&path, pdf_with_pages(&["PageOneEnd", "PageTwoStart"])).unwrap();

        let text = extract_text(&path).unwrap();

        assert!(!text.contains("PageOneEndPageTwoStart"), "pages ran together: {text:?}");
        assert!(text.contains("PageOneEnd\n"));
        assert!(text.ends_with("PageTwoStart\n"));
        assert!(text.find("PageOneEnd").unwrap() < text.find("PageTwoStart").unwrap());
    }

    #[test]
    fn join_pages_appends_newline_per_page() {
        let pages = vec!["one".to_string(), String::new(), "three".to_string()];
        assert_eq!(join_pages(&pages), "one\n\nthree\n");
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = list_documents(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
    }
}
