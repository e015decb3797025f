use url::form_urlencoded;
use url::Url;

/// Canonical form used for frontier dedup: lowercase scheme/host (the `url`
/// crate guarantees both on parse, along with default-port removal),
/// fragment stripped, query pairs sorted, unreserved percent-escapes
/// decoded. Trailing slashes are kept as distinguishing.
///
/// Idempotent: `normalize(normalize(u)) == normalize(u)`.
pub fn normalize(url: &Url) -> Url {
    let mut out = url.clone();
    out.set_fragment(None);

    let path = out.path().to_string();
    let decoded = decode_unreserved(&path);
    if decoded != path {
        out.set_path(&decoded);
    }

    if out.query().is_some() {
        let mut pairs: Vec<(String, String)> = out
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if pairs.is_empty() {
            out.set_query(None);
        } else {
            pairs.sort();
            let mut ser = form_urlencoded::Serializer::new(String::new());
            for (k, v) in &pairs {
                ser.append_pair(k, v);
            }
            out.set_query(Some(&ser.finish()));
        }
    }

    out
}

pub fn normalized_str(url: &Url) -> String {
    normalize(url).to_string()
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Decode `%XX` sequences whose octet is an RFC 3986 unreserved character;
/// everything else is left encoded as-is.
fn decode_unreserved(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &path[i + 1..i + 3];
            if let Ok(octet) = u8::from_str_radix(hex, 16) {
                if is_unreserved(octet) {
                    out.push(octet as char);
                    i += 3;
                    continue;
                }
            }
        }
        // Path is valid UTF-8; copy the full character.
        let ch = path[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Public-suffix-plus-one portion of a host (`example.co.uk` for
/// `shop.example.co.uk`). Hosts the public suffix list cannot parse (IPs,
/// single labels) fall back to the host itself.
pub fn registrable_domain(host: &str) -> String {
    match addr::parse_domain_name(host) {
        Ok(name) => name.root().unwrap_or(host).to_ascii_lowercase(),
        Err(_) => host.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_stripped_and_query_sorted() {
        let u = Url::parse("HTTPS://Example.COM:443/a?b=2&a=1#frag").unwrap();
        let n = normalize(&u);
        assert_eq!(n.as_str(), "https://example.com/a?a=1&b=2");
    }

    #[test]
    fn test_unreserved_escapes_decoded() {
        let u = Url::parse("https://example.com/%61bc%2Fdef").unwrap();
        let n = normalize(&u);
        // %61 = 'a' (unreserved, decoded); %2F = '/' (reserved, kept).
        assert_eq!(n.path(), "/abc%2Fdef");
    }

    #[test]
    fn test_trailing_slash_distinguishing() {
        let a = Url::parse("https://example.com/a/").unwrap();
        let b = Url::parse("https://example.com/a").unwrap();
        assert_ne!(normalized_str(&a), normalized_str(&b));
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "https://example.com/a%20b?z=1&y=%2F#x",
            "http://example.com:80/path/?q=a+b",
            "https://sub.example.co.uk/%7Euser/",
        ] {
            let u = Url::parse(raw).unwrap();
            let once = normalize(&u);
            let twice = normalize(&once);
            assert_eq!(once.as_str(), twice.as_str(), "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("www.example.com"), "example.com");
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
    }
}
