use url::Url;

use dragnet_core::ExtractionTier;
use dragnet_frontier::registrable_domain;

/// Social networks: profile pages are worth extracting, but following
/// their links floods the frontier with platform chrome.
const SOCIAL_HOSTS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "vk.com",
    "telegram.org",
    "reddit.com",
    "medium.com",
    "github.com",
];

/// Curated news publishers: always a full scrape.
const NEWS_HOSTS: &[&str] = &[
    "reuters.com",
    "bloomberg.com",
    "bbc.co.uk",
    "bbc.com",
    "theguardian.com",
    "ft.com",
    "wsj.com",
    "nytimes.com",
    "apnews.com",
    "aljazeera.com",
    "dw.com",
    "lemonde.fr",
    "spiegel.de",
    "occrp.org",
    "icij.org",
];

/// Trackers and ad plumbing: dropped without a record.
const SKIP_HOSTS: &[&str] = &[
    "doubleclick.net",
    "google-analytics.com",
    "googletagmanager.com",
    "googlesyndication.com",
    "adsystem.com",
    "adnxs.com",
    "scorecardresearch.com",
    "hotjar.com",
    "segment.io",
];

/// Link shorteners: the target is opaque, only the URL itself is worth
/// keeping.
const URL_ONLY_HOSTS: &[&str] = &[
    "t.co",
    "bit.ly",
    "goo.gl",
    "tinyurl.com",
    "ow.ly",
    "buff.ly",
    "lnkd.in",
    "cutt.ly",
];

/// Pure URL/host classification, computed once per URL on dequeue.
pub fn classify(url: &Url) -> ExtractionTier {
    let Some(host) = url.host_str() else {
        return ExtractionTier::Skip;
    };
    let root = registrable_domain(host);

    if SKIP_HOSTS.contains(&root.as_str()) {
        return ExtractionTier::Skip;
    }
    if URL_ONLY_HOSTS.contains(&root.as_str()) {
        return ExtractionTier::UrlOnly;
    }
    if SOCIAL_HOSTS.contains(&root.as_str()) {
        return ExtractionTier::Extract;
    }
    if NEWS_HOSTS.contains(&root.as_str()) {
        return ExtractionTier::Full;
    }

    ExtractionTier::Full
}
