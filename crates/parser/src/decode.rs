use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// `<meta charset=...>` / `http-equiv` sniff over the head of the document.
static META_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-zA-Z0-9_\-]+)"#).unwrap()
});

/// How many leading bytes the meta sniff inspects.
const SNIFF_WINDOW: usize = 1024;

/// Decode a response body to UTF-8 text. Charset resolution order: the
/// Content-Type header parameter, a `<meta charset>` sniff over the first
/// kilobyte, then UTF-8 with lossy replacement.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> (String, &'static str) {
    if let Some(enc) = content_type.and_then(charset_from_content_type) {
        let (text, _, _) = enc.decode(body);
        return (text.into_owned(), enc.name());
    }

    let window = &body[..body.len().min(SNIFF_WINDOW)];
    if let Some(cap) = META_CHARSET_RE.captures(window) {
        if let Some(enc) = Encoding::for_label(&cap[1]) {
            let (text, _, _) = enc.decode(body);
            return (text.into_owned(), enc.name());
        }
    }

    let (text, _, _) = UTF_8.decode(body);
    (text.into_owned(), UTF_8.name())
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let lower = content_type.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let rest = &content_type[idx + "charset=".len()..];
    let label = rest
        .trim_start_matches(['"', '\''])
        .split([';', '"', '\'', ' '])
        .next()?;
    Encoding::for_label(label.as_bytes())
}

/// Whether a MIME type carries text we can scan directly.
pub fn is_textual(content_type: &str) -> bool {
    let ct = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ct.starts_with("text/")
        || ct == "application/xhtml+xml"
        || ct == "application/xml"
        || ct == "application/json"
        || ct == "application/rss+xml"
        || ct == "application/atom+xml"
}

pub fn is_html(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml+xml")
}
