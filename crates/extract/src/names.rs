use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::gazetteer::{FIRST_NAMES, LAST_NAMES, PERSON_CUES, PERSON_STOPWORDS};

/// Title-cased bigram/trigram candidates. Apostrophes and hyphens stay
/// inside tokens (O'Brien, Smith-Jones).
static CANDIDATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z'\-]+(?: [A-Z][a-z'\-]+){1,2}\b").unwrap());

/// How far back a context cue ("Mr.", "CEO", ...) may sit.
const CUE_WINDOW: usize = 24;

pub struct PersonExtractor {
    first: HashSet<&'static str>,
    last: HashSet<&'static str>,
    stopwords: HashSet<&'static str>,
    threshold: f64,
}

impl PersonExtractor {
    pub fn new(threshold: f64) -> Self {
        Self {
            first: FIRST_NAMES.iter().copied().collect(),
            last: LAST_NAMES.iter().copied().collect(),
            stopwords: PERSON_STOPWORDS.iter().copied().collect(),
            threshold,
        }
    }

    /// Candidates scoring at or above the threshold, first-seen order,
    /// capped at `max`. A leading role word in the candidate itself
    /// ("Director Maria Garcia") is treated as the cue, not the name.
    pub fn extract(&self, text: &str, max: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for m in CANDIDATE_RE.find_iter(text) {
            if out.len() >= max {
                break;
            }
            let mut tokens: Vec<&str> = m.as_str().split(' ').collect();
            let mut cued = has_cue(text, m.start());
            if PERSON_CUES.contains(&tokens[0].to_ascii_lowercase().as_str()) {
                tokens.remove(0);
                cued = true;
            }
            if tokens.len() < 2 {
                continue;
            }
            if self.score(&tokens, cued) < self.threshold {
                continue;
            }
            let name = tokens.join(" ");
            if seen.insert(name.clone()) {
                out.push(name);
            }
        }
        out
    }

    /// Confidence in [0,1]: gazetteer hit rate plus positional bonuses plus
    /// a cue bonus.
    fn score(&self, tokens: &[&str], cued: bool) -> f64 {
        let lower: Vec<String> = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();

        if lower.iter().any(|t| self.stopwords.contains(t.as_str())) {
            return 0.0;
        }

        let hits = lower
            .iter()
            .filter(|t| self.first.contains(t.as_str()) || self.last.contains(t.as_str()))
            .count();
        let hit_rate = hits as f64 / lower.len() as f64;

        let mut score = 0.45 * hit_rate;
        if self.first.contains(lower[0].as_str()) {
            score += 0.25;
        }
        if self.last.contains(lower[lower.len() - 1].as_str()) {
            score += 0.15;
        }
        if cued {
            score += 0.25;
        }
        score.min(1.0)
    }
}

fn has_cue(text: &str, start: usize) -> bool {
    let mut lo = start.saturating_sub(CUE_WINDOW);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let window = text[lo..start].to_ascii_lowercase();
    window
        .split(|c: char| !c.is_ascii_alphabetic())
        .rev()
        .take(3)
        .any(|w| PERSON_CUES.contains(&w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PersonExtractor {
        PersonExtractor::new(0.6)
    }

    #[test]
    fn test_full_gazetteer_hit_kept() {
        let out = extractor().extract("Board member John Smith attended.", 30);
        assert_eq!(out, vec!["John Smith"]);
    }

    #[test]
    fn test_unknown_surname_needs_cue() {
        let without = extractor().extract("Then John Xyzzak spoke.", 30);
        assert!(without.is_empty());
        let with = extractor().extract("CEO John Xyzzak spoke.", 30);
        assert_eq!(with, vec!["John Xyzzak"]);
    }

    #[test]
    fn test_navigation_text_rejected() {
        let out = extractor().extract("Privacy Policy and Contact Us and New York", 30);
        assert!(out.is_empty());
    }

    #[test]
    fn test_cap_and_dedup() {
        let text = "Maria Garcia met Maria Garcia and David Miller.";
        let out = extractor().extract(text, 30);
        assert_eq!(out, vec!["Maria Garcia", "David Miller"]);
        let capped = extractor().extract(text, 1);
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_trigram_candidate() {
        let out = extractor().extract("Dr. Anna Maria Schmidt presented findings.", 30);
        assert_eq!(out, vec!["Anna Maria Schmidt"]);
    }
}
