use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A resolved page link: absolute href plus anchor text when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub href: Url,
    pub anchor: Option<String>,
}

#[derive(Debug, Default)]
pub struct HtmlDoc {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Visible text with script/style removed, whitespace collapsed to
    /// single spaces.
    pub text: String,
    pub links: Vec<PageLink>,
}

pub fn parse_html(html_str: &str, base_url: &Url) -> HtmlDoc {
    let document = Html::parse_document(html_str);

    let title = selector("title")
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let meta_description = selector("meta[name='description'], meta[name='Description']")
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("content").map(|c| c.trim().to_string()))
        .filter(|d| !d.is_empty());

    let mut raw_text = String::new();
    collect_text(document.root_element(), &mut raw_text);
    let text = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");

    let links = extract_links(&document, base_url);

    HtmlDoc {
        title,
        meta_description,
        text,
        links,
    }
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Elements whose text is never page content.
fn skip_element(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template" | "head")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    if skip_element(el.value().name()) {
        return;
    }
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        } else if let Some(t) = child.value().as_text() {
            out.push_str(t);
            out.push(' ');
        }
    }
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<PageLink> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|el| {
            let href = el.value().attr("href")?;

            if href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("data:")
                || href.starts_with('#')
            {
                return None;
            }

            let resolved = base_url.join(href).ok()?;
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                return None;
            }

            let anchor = {
                let t = el.text().collect::<String>().trim().to_string();
                if t.is_empty() {
                    None
                } else {
                    Some(t)
                }
            };

            Some(PageLink {
                href: resolved,
                anchor,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/dir/").unwrap()
    }

    #[test]
    fn test_script_and_style_removed() {
        let html = r#"<html><head><style>.x{color:red}</style></head>
            <body><p>Visible   text</p><script>var hidden = 1;</script></body></html>"#;
        let doc = parse_html(html, &base());
        assert_eq!(doc.text, "Visible text");
    }

    #[test]
    fn test_title_and_meta() {
        let html = r#"<html><head><title> Acme Corp </title>
            <meta name="description" content="Widgets and more"></head><body></body></html>"#;
        let doc = parse_html(html, &base());
        assert_eq!(doc.title.as_deref(), Some("Acme Corp"));
        assert_eq!(doc.meta_description.as_deref(), Some("Widgets and more"));
    }

    #[test]
    fn test_links_resolved_against_base() {
        let html = r##"<body>
            <a href="/about">About us</a>
            <a href="page2.html">Next</a>
            <a href="https://partner.org/x">Partner</a>
            <a href="mailto:x@example.com">Mail</a>
            <a href="#section">Anchor</a>
        </body>"##;
        let doc = parse_html(html, &base());
        let hrefs: Vec<&str> = doc.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "https://example.com/about",
                "https://example.com/dir/page2.html",
                "https://partner.org/x",
            ]
        );
        assert_eq!(doc.links[0].anchor.as_deref(), Some("About us"));
    }
}
