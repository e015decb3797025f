pub mod binary;
pub mod decode;
pub mod html;

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use dragnet_core::FetchResponse;

pub use binary::{BinaryError, BinaryKind, BinaryText};
pub use html::PageLink;

/// Max bytes handed to the HTML parser. Larger pages are truncated first.
const MAX_PARSE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unsupported binary format")]
    BinaryUnsupported,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// What one fetched payload parses into. `text` is present iff the payload
/// was textual or binary extraction succeeded.
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub text: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub links: Vec<PageLink>,
    pub binary_metadata: BTreeMap<String, String>,
    pub partial_extraction: bool,
    pub content_hash: String,
}

/// Turn a fetch response into normalized text, links, and metadata.
/// Dispatches on MIME: HTML is decoded and parsed, plain text decoded,
/// known binary formats routed through the binary extractor. Legacy Office
/// formats surface `BinaryUnsupported` so the caller can emit a URL-only
/// record.
pub fn parse_response(resp: &FetchResponse, binary_cap: usize) -> Result<ParsedPage, ParseError> {
    let content_type = resp.content_type_str();
    let path = resp.final_url.path();

    let mut hasher = Sha256::new();
    hasher.update(&resp.body);
    let content_hash = format!("{:x}", hasher.finalize());

    if binary::is_legacy_office(content_type, path) {
        return Err(ParseError::BinaryUnsupported);
    }

    if let Some(kind) = binary::binary_kind(content_type, path) {
        let extracted = binary::extract(kind, &resp.body, binary_cap).map_err(|e| match e {
            BinaryError::Unsupported(_) => ParseError::BinaryUnsupported,
            BinaryError::Malformed(m) => ParseError::MalformedPayload(m),
        })?;
        return Ok(ParsedPage {
            text: Some(extracted.text),
            title: None,
            meta_description: None,
            links: Vec::new(),
            binary_metadata: extracted.metadata,
            partial_extraction: extracted.partial,
            content_hash,
        });
    }

    if !decode::is_textual(content_type) && !content_type.is_empty() {
        debug!(content_type, url = %resp.final_url, "non-textual payload, no text extracted");
        return Ok(ParsedPage {
            content_hash,
            ..ParsedPage::default()
        });
    }

    let body = if resp.body.len() > MAX_PARSE_SIZE {
        &resp.body[..MAX_PARSE_SIZE]
    } else {
        &resp.body[..]
    };
    let (decoded, _encoding) = decode::decode_body(body, resp.content_type.as_deref());

    if decode::is_html(content_type) || content_type.is_empty() {
        let doc = html::parse_html(&decoded, &resp.final_url);
        Ok(ParsedPage {
            text: Some(doc.text),
            title: doc.title,
            meta_description: doc.meta_description,
            links: doc.links,
            binary_metadata: BTreeMap::new(),
            partial_extraction: false,
            content_hash,
        })
    } else {
        let text = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(ParsedPage {
            text: Some(text),
            title: None,
            meta_description: None,
            links: Vec::new(),
            binary_metadata: BTreeMap::new(),
            partial_extraction: false,
            content_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragnet_core::PageSource;
    use std::collections::HashMap;
    use url::Url;

    fn response(content_type: &str, body: &[u8], url: &str) -> FetchResponse {
        let u = Url::parse(url).unwrap();
        FetchResponse {
            url: u.clone(),
            final_url: u,
            status: 200,
            headers: HashMap::new(),
            body: body.to_vec(),
            content_type: if content_type.is_empty() {
                None
            } else {
                Some(content_type.to_string())
            },
            source: PageSource::Live,
            fetched_at: chrono::Utc::now(),
            response_time_ms: 1,
        }
    }

    #[test]
    fn test_html_parsed() {
        let resp = response(
            "text/html; charset=utf-8",
            b"<html><head><title>T</title></head><body><p>Body text</p><a href=\"/x\">x</a></body></html>",
            "https://example.com/",
        );
        let page = parse_response(&resp, 1 << 20).unwrap();
        assert_eq!(page.text.as_deref(), Some("Body text x"));
        assert_eq!(page.title.as_deref(), Some("T"));
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.content_hash.len(), 64);
    }

    #[test]
    fn test_plain_text_passthrough() {
        let resp = response(
            "text/plain",
            b"line one\nline   two",
            "https://example.com/notes.txt",
        );
        let page = parse_response(&resp, 1 << 20).unwrap();
        assert_eq!(page.text.as_deref(), Some("line one line two"));
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_image_has_no_text() {
        let resp = response("image/png", &[0x89, 0x50, 0x4e, 0x47], "https://example.com/x.png");
        let page = parse_response(&resp, 1 << 20).unwrap();
        assert!(page.text.is_none());
    }

    #[test]
    fn test_legacy_office_unsupported() {
        let resp = response(
            "application/msword",
            b"\xd0\xcf\x11\xe0",
            "https://example.com/old.doc",
        );
        let err = parse_response(&resp, 1 << 20).unwrap_err();
        assert!(matches!(err, ParseError::BinaryUnsupported));
    }

    #[test]
    fn test_deterministic_hash() {
        let resp = response("text/html", b"<p>same</p>", "https://example.com/");
        let a = parse_response(&resp, 1 << 20).unwrap().content_hash;
        let b = parse_response(&resp, 1 << 20).unwrap().content_hash;
        assert_eq!(a, b);
    }
}
