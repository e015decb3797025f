use std::collections::HashSet;

use url::Url;

use dragnet_frontier::registrable_domain;
use dragnet_parser::PageLink;

/// Query parameters that only identify campaigns/clicks, stripped before
/// dedup so the same target is not recorded many times.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "yclid", "igshid", "mc_cid", "mc_eid", "_hsenc",
    "_hsmi", "ref_src", "cmpid",
];

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// Split page links into an external-outlink list (fragments and tracking
/// params dropped, deduplicated, capped) and a same-domain count.
pub fn select_outlinks(page_url: &Url, links: &[PageLink], cap: usize) -> (Vec<String>, usize) {
    let own = page_url
        .host_str()
        .map(registrable_domain)
        .unwrap_or_default();

    let mut internal = 0usize;
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for link in links {
        let Some(host) = link.href.host_str() else {
            continue;
        };
        if registrable_domain(host) == own {
            internal += 1;
            continue;
        }
        if out.len() >= cap {
            continue;
        }

        let mut target = link.href.clone();
        target.set_fragment(None);
        let kept: Vec<(String, String)> = target
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            target.set_query(None);
        } else {
            let mut ser = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in &kept {
                ser.append_pair(k, v);
            }
            target.set_query(Some(&ser.finish()));
        }

        let s = target.to_string();
        if seen.insert(s.clone()) {
            out.push(s);
        }
    }

    (out, internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str) -> PageLink {
        PageLink {
            href: Url::parse(href).unwrap(),
            anchor: None,
        }
    }

    #[test]
    fn test_same_domain_counted_not_listed() {
        let page = Url::parse("https://example.com/a").unwrap();
        let links = vec![
            link("https://example.com/b"),
            link("https://www.example.com/c"),
            link("https://partner.org/x"),
        ];
        let (out, internal) = select_outlinks(&page, &links, 300);
        assert_eq!(internal, 2);
        assert_eq!(out, vec!["https://partner.org/x"]);
    }

    #[test]
    fn test_tracking_params_and_fragment_stripped() {
        let page = Url::parse("https://example.com/").unwrap();
        let links = vec![
            link("https://partner.org/x?utm_source=mail&id=7&fbclid=abc#frag"),
            link("https://partner.org/x?id=7"),
        ];
        let (out, _) = select_outlinks(&page, &links, 300);
        assert_eq!(out, vec!["https://partner.org/x?id=7"]);
    }

    #[test]
    fn test_cap() {
        let page = Url::parse("https://example.com/").unwrap();
        let links: Vec<PageLink> = (0..10)
            .map(|i| link(&format!("https://site{i}.org/")))
            .collect();
        let (out, _) = select_outlinks(&page, &links, 3);
        assert_eq!(out.len(), 3);
    }
}
