use url::Url;

/// Static-asset and bulk-binary extensions that are never enqueued. Binary
/// documents reached as seeds are still fetched; this gates link following
/// only.
const SKIP_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "svg", "css", "js", "ico", "woff", "woff2", "ttf", "eot",
    "mp4", "mp3", "avi", "mov", "webm", "webp", "zip", "gz", "tgz", "tar", "rar", "7z", "exe",
    "dmg", "iso", "apk", "bin",
];

/// Path segments that mark asset trees and CMS plumbing.
const SKIP_SEGMENTS: &[&str] = &[
    "wp-content",
    "wp-includes",
    "wp-json",
    "cdn-cgi",
    "node_modules",
];

pub fn should_enqueue(url: &Url) -> bool {
    let path = url.path();

    if let Some(ext) = path.rsplit('/').next().and_then(|f| f.rsplit_once('.')) {
        let ext = ext.1.to_ascii_lowercase();
        if SKIP_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
    }

    if let Some(segments) = url.path_segments() {
        for seg in segments {
            if SKIP_SEGMENTS.contains(&seg) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_asset_extensions_filtered() {
        assert!(!should_enqueue(&u("https://example.com/logo.PNG")));
        assert!(!should_enqueue(&u("https://example.com/report.pdf")));
        assert!(!should_enqueue(&u("https://example.com/app.js?v=3")));
        assert!(should_enqueue(&u("https://example.com/about")));
        assert!(should_enqueue(&u("https://example.com/index.html")));
    }

    #[test]
    fn test_cms_segments_filtered() {
        assert!(!should_enqueue(&u(
            "https://example.com/wp-content/uploads/x"
        )));
        assert!(!should_enqueue(&u("https://example.com/cdn-cgi/l/email")));
        assert!(should_enqueue(&u("https://example.com/blog/wp-style-post")));
    }
}
