use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use dragnet_core::CompanyMatch;

use crate::gazetteer::jurisdiction_for;

/// Name tokens followed by a legal-form designator. The designator
/// alternation is explicit about casing: short forms (AG, AS, SA, ...) are
/// common words in lowercase, so only their uppercase spellings count.
static COMPANY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b((?:[A-Z][\w&'.\-]*,? ){1,6}?)(Ltd\.?|LTD\.?|Limited|LIMITED|LLC|L\.L\.C\.|Inc\.?|INC\.?|Corp\.?|CORP\.?|PLC|Plc|LLP|GmbH|GMBH|S\.?à\.? ?r\.? ?l\.?|SARL|S\.A\.S\.|SAS|S\.r\.o\.|s\.r\.o\.|S\.p\.A\.|SpA|S\.r\.l\.|SRL|ApS|A/S|OOO|ZAO|Pty\.? Ltd\.?|Pte\.? Ltd\.?|Sp\. ?z ?o\.?o\.?|d\.o\.o\.|EOOD|Kft\.?|Zrt\.?|Lda\.?|OYJ|AG|KG|UG|NV|BV|OY|AB|AS|SA|KK|SL)(?:[^\w]|$)",
    )
    .unwrap()
});

/// Short all-caps designators that double as ordinary words or acronyms;
/// these need a title-cased name to their left.
static RISKY_FORMS: &[&str] = &["AG", "KG", "UG", "NV", "BV", "OY", "AB", "AS", "SA", "KK", "SL"];

/// Words that look like name tokens but start sentences or boilerplate.
static NAME_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "this", "that", "these", "those", "terms", "conditions", "known", "same", "such",
        "all", "any", "our", "your", "their", "his", "her", "its", "was", "is", "are", "has",
        "had", "not", "but", "and", "for", "with", "about",
    ]
    .into_iter()
    .collect()
});

/// Phrases ending in a legal-form designator, first-seen order, capped.
/// Each match carries the jurisdiction its designator implies.
pub fn extract_companies(text: &str, max: usize) -> Vec<CompanyMatch> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for caps in COMPANY_RE.captures_iter(text) {
        if out.len() >= max {
            break;
        }
        let name_part = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let designator = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let tokens: Vec<&str> = name_part
            .split(' ')
            .map(|t| t.trim_end_matches(','))
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens
            .iter()
            .any(|t| NAME_STOPWORDS.contains(t.to_ascii_lowercase().as_str()))
        {
            continue;
        }
        if RISKY_FORMS.contains(&designator)
            && !tokens
                .iter()
                .all(|t| t.chars().skip(1).any(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
        {
            continue;
        }

        let Some(jurisdiction) = jurisdiction_lookup(designator) else {
            continue;
        };

        let name = format!("{} {}", tokens.join(" "), designator.trim_end_matches('.'));
        if seen.insert(name.clone()) {
            out.push(CompanyMatch {
                name,
                jurisdiction: jurisdiction.to_string(),
            });
        }
    }
    out
}

fn jurisdiction_lookup(designator: &str) -> Option<&'static str> {
    // "A/S" and "à r l" spellings need folding before table lookup.
    let folded: String = designator
        .chars()
        .filter(|c| *c != '.' && *c != '/')
        .collect::<String>()
        .replace('à', "A")
        .to_ascii_uppercase();
    let folded = folded.trim().to_string();
    match folded.as_str() {
        "SARL" => Some("FR"),
        "PTY LTD" => Some("AU"),
        "PTE LTD" => Some("SG"),
        other => jurisdiction_for(other),
    }
}
