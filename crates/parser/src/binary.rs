use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

/// Binary payload families the extractor can turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Zip,
    Tar,
    Gzip,
}

#[derive(Debug, Clone, Default)]
pub struct BinaryText {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    /// Set when the payload exceeded the record size cap and was truncated.
    pub partial: bool,
}

#[derive(Error, Debug)]
pub enum BinaryError {
    #[error("unsupported legacy format: {0}")]
    Unsupported(&'static str),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Map MIME + URL path to a binary family, or None when the payload is not
/// one we extract.
pub fn binary_kind(content_type: &str, path: &str) -> Option<BinaryKind> {
    let ct = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let lower_path = path.to_ascii_lowercase();

    match ct.as_str() {
        "application/pdf" => return Some(BinaryKind::Pdf),
        DOCX_MIME => return Some(BinaryKind::Docx),
        XLSX_MIME => return Some(BinaryKind::Xlsx),
        PPTX_MIME => return Some(BinaryKind::Pptx),
        "application/zip" | "application/x-zip-compressed" => return Some(BinaryKind::Zip),
        "application/x-tar" => return Some(BinaryKind::Tar),
        "application/gzip" | "application/x-gzip" => return Some(BinaryKind::Gzip),
        _ => {}
    }

    if lower_path.ends_with(".pdf") {
        Some(BinaryKind::Pdf)
    } else if lower_path.ends_with(".docx") {
        Some(BinaryKind::Docx)
    } else if lower_path.ends_with(".xlsx") {
        Some(BinaryKind::Xlsx)
    } else if lower_path.ends_with(".pptx") {
        Some(BinaryKind::Pptx)
    } else if lower_path.ends_with(".zip") {
        Some(BinaryKind::Zip)
    } else if lower_path.ends_with(".tar") {
        Some(BinaryKind::Tar)
    } else if lower_path.ends_with(".gz") || lower_path.ends_with(".tgz") {
        Some(BinaryKind::Gzip)
    } else {
        None
    }
}

/// Pre-OOXML Office formats are tolerated but never extracted.
pub fn is_legacy_office(content_type: &str, path: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    let lower_path = path.to_ascii_lowercase();
    ct == "application/msword"
        || ct == "application/vnd.ms-excel"
        || ct == "application/vnd.ms-powerpoint"
        || lower_path.ends_with(".doc")
        || lower_path.ends_with(".xls")
        || lower_path.ends_with(".ppt")
}

/// Convert a binary payload to plain text plus basic metadata. `cap` is the
/// archive-record size cap; output beyond it is truncated and flagged
/// partial.
pub fn extract(kind: BinaryKind, bytes: &[u8], cap: usize) -> Result<BinaryText, BinaryError> {
    let mut out = match kind {
        BinaryKind::Pdf => extract_pdf(bytes)?,
        BinaryKind::Docx => extract_docx(bytes)?,
        BinaryKind::Xlsx => extract_xlsx(bytes)?,
        BinaryKind::Pptx => extract_pptx(bytes)?,
        BinaryKind::Zip => extract_zip(bytes, cap)?,
        BinaryKind::Tar => extract_tar(bytes, cap)?,
        BinaryKind::Gzip => extract_gzip(bytes, cap)?,
    };
    if out.text.len() > cap {
        let mut end = cap;
        while !out.text.is_char_boundary(end) {
            end -= 1;
        }
        out.text.truncate(end);
        out.partial = true;
    }
    Ok(out)
}

fn extract_pdf(bytes: &[u8]) -> Result<BinaryText, BinaryError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| BinaryError::Malformed(format!("pdf: {e}")))?;
    let pages = text.matches('\u{c}').count() + 1;
    let mut metadata = BTreeMap::new();
    metadata.insert("pages".to_string(), pages.to_string());
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(BinaryText {
        text,
        metadata,
        partial: false,
    })
}

fn open_zip(bytes: &[u8]) -> Result<zip::ZipArchive<Cursor<&[u8]>>, BinaryError> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| BinaryError::Malformed(format!("zip: {e}")))
}

fn zip_entry_string(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, BinaryError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut buf = String::new();
            file.read_to_string(&mut buf)
                .map_err(|e| BinaryError::Malformed(format!("zip entry {name}: {e}")))?;
            Ok(Some(buf))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(BinaryError::Malformed(format!("zip entry {name}: {e}"))),
    }
}

/// Pull character data from the XML elements named in `text_tags`,
/// inserting a space at each `break_tags` close.
fn xml_text(xml: &str, text_tags: &[&[u8]], break_tags: &[&[u8]]) -> String {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut depth_in_text = 0u32;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if text_tags.iter().any(|t| e.local_name().as_ref() == *t) {
                    depth_in_text += 1;
                }
            }
            Ok(Event::End(e)) => {
                if text_tags.iter().any(|t| e.local_name().as_ref() == *t) {
                    depth_in_text = depth_in_text.saturating_sub(1);
                } else if break_tags.iter().any(|t| e.local_name().as_ref() == *t) {
                    out.push(' ');
                }
            }
            Ok(Event::Text(t)) => {
                if depth_in_text > 0 {
                    if let Ok(s) = t.unescape() {
                        out.push_str(&s);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "xml text walk stopped early");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    out
}

fn extract_docx(bytes: &[u8]) -> Result<BinaryText, BinaryError> {
    let mut archive = open_zip(bytes)?;
    let document = zip_entry_string(&mut archive, "word/document.xml")?
        .ok_or_else(|| BinaryError::Malformed("docx: no word/document.xml".into()))?;
    let text = xml_text(&document, &[b"t"], &[b"p"]);
    let paragraphs = document.matches("</w:p>").count();
    let mut metadata = BTreeMap::new();
    metadata.insert("paragraphs".to_string(), paragraphs.to_string());
    Ok(BinaryText {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        metadata,
        partial: false,
    })
}

fn extract_xlsx(bytes: &[u8]) -> Result<BinaryText, BinaryError> {
    let mut archive = open_zip(bytes)?;

    let mut sheet_names = Vec::new();
    if let Some(workbook) = zip_entry_string(&mut archive, "xl/workbook.xml")? {
        let mut reader = Reader::from_str(&workbook);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.local_name().as_ref() == b"sheet" {
                        for attr in e.attributes().flatten() {
                            if attr.key.local_name().as_ref() == b"name" {
                                if let Ok(v) = attr.unescape_value() {
                                    sheet_names.push(v.into_owned());
                                }
                            }
                        }
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }
    }

    let shared = zip_entry_string(&mut archive, "xl/sharedStrings.xml")?.unwrap_or_default();
    let text = xml_text(&shared, &[b"t"], &[b"si"]);

    let mut metadata = BTreeMap::new();
    metadata.insert("sheets".to_string(), sheet_names.join(","));
    Ok(BinaryText {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        metadata,
        partial: false,
    })
}

fn extract_pptx(bytes: &[u8]) -> Result<BinaryText, BinaryError> {
    let mut archive = open_zip(bytes)?;
    let slide_names: Vec<String> = (0..archive.len())
        .filter_map(|i| {
            let name = archive.by_index(i).ok()?.name().to_string();
            (name.starts_with("ppt/slides/slide") && name.ends_with(".xml")).then_some(name)
        })
        .collect();

    let mut text = String::new();
    for name in &slide_names {
        if let Some(xml) = zip_entry_string(&mut archive, name)? {
            text.push_str(&xml_text(&xml, &[b"t"], &[b"p"]));
            text.push(' ');
        }
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("slides".to_string(), slide_names.len().to_string());
    Ok(BinaryText {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        metadata,
        partial: false,
    })
}

/// Entry names a container listing treats as readable text.
fn is_text_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    [".txt", ".csv", ".md", ".json", ".xml", ".html", ".htm"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn extract_zip(bytes: &[u8], cap: usize) -> Result<BinaryText, BinaryError> {
    let mut archive = open_zip(bytes)?;
    let mut text = String::new();
    let mut partial = false;
    let entries = archive.len();

    for i in 0..entries {
        let mut file = archive
            .by_index(i)
            .map_err(|e| BinaryError::Malformed(format!("zip: {e}")))?;
        let name = file.name().to_string();
        text.push_str(&name);
        text.push(' ');
        if is_text_entry(&name) && text.len() < cap {
            let mut buf = String::new();
            if file.read_to_string(&mut buf).is_ok() {
                text.push_str(&buf);
                text.push(' ');
            }
        }
        if text.len() >= cap {
            partial = true;
            break;
        }
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("entries".to_string(), entries.to_string());
    Ok(BinaryText {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        metadata,
        partial,
    })
}

fn extract_tar(bytes: &[u8], cap: usize) -> Result<BinaryText, BinaryError> {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut text = String::new();
    let mut partial = false;
    let mut entries = 0usize;

    for entry in archive
        .entries()
        .map_err(|e| BinaryError::Malformed(format!("tar: {e}")))?
    {
        let mut entry = entry.map_err(|e| BinaryError::Malformed(format!("tar: {e}")))?;
        entries += 1;
        let name = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        text.push_str(&name);
        text.push(' ');
        if is_text_entry(&name) && text.len() < cap {
            let mut buf = String::new();
            if entry.read_to_string(&mut buf).is_ok() {
                text.push_str(&buf);
                text.push(' ');
            }
        }
        if text.len() >= cap {
            partial = true;
            break;
        }
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("entries".to_string(), entries.to_string());
    Ok(BinaryText {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        metadata,
        partial,
    })
}

fn extract_gzip(bytes: &[u8], cap: usize) -> Result<BinaryText, BinaryError> {
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut buf = Vec::with_capacity(cap.min(1 << 20));
    let mut chunk = [0u8; 8192];
    let mut partial = false;
    loop {
        match decoder.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() >= cap {
                    partial = true;
                    break;
                }
            }
            Err(e) => return Err(BinaryError::Malformed(format!("gzip: {e}"))),
        }
    }
    let text = String::from_utf8_lossy(&buf)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut metadata = BTreeMap::new();
    metadata.insert("decompressed_bytes".to_string(), buf.len().to_string());
    Ok(BinaryText {
        text,
        metadata,
        partial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_binary_kind_by_mime_and_extension() {
        assert_eq!(
            binary_kind("application/pdf", "/report"),
            Some(BinaryKind::Pdf)
        );
        assert_eq!(
            binary_kind("application/octet-stream", "/files/report.PDF"),
            Some(BinaryKind::Pdf)
        );
        assert_eq!(binary_kind(DOCX_MIME, "/x"), Some(BinaryKind::Docx));
        assert_eq!(binary_kind("text/html", "/page"), None);
    }

    #[test]
    fn test_legacy_office_detected() {
        assert!(is_legacy_office("application/msword", "/a"));
        assert!(is_legacy_office("application/octet-stream", "/old.xls"));
        assert!(!is_legacy_office("application/pdf", "/new.pdf"));
    }

    fn docx_fixture(paragraphs: &[&str]) -> Vec<u8> {
        let mut body = String::from(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        );
        for p in paragraphs {
            body.push_str(&format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"));
        }
        body.push_str("</w:body></w:document>");

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let opts = zip::write::FileOptions::default();
            writer.start_file("word/document.xml", opts).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_docx_text_extracted() {
        let bytes = docx_fixture(&["Hello world", "Second paragraph"]);
        let out = extract(BinaryKind::Docx, &bytes, 1 << 20).unwrap();
        assert_eq!(out.text, "Hello world Second paragraph");
        assert_eq!(out.metadata.get("paragraphs").unwrap(), "2");
        assert!(!out.partial);
    }

    #[test]
    fn test_cap_truncates_and_flags_partial() {
        let bytes = docx_fixture(&["0123456789 0123456789 0123456789"]);
        let out = extract(BinaryKind::Docx, &bytes, 10).unwrap();
        assert!(out.partial);
        assert!(out.text.len() <= 10);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"compressed   text body").unwrap();
        let bytes = enc.finish().unwrap();
        let out = extract(BinaryKind::Gzip, &bytes, 1 << 20).unwrap();
        assert_eq!(out.text, "compressed text body");
    }

    #[test]
    fn test_malformed_zip_rejected() {
        let err = extract(BinaryKind::Docx, b"not a zip", 1 << 20).unwrap_err();
        assert!(matches!(err, BinaryError::Malformed(_)));
    }
}
