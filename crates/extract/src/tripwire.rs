use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::collections::HashSet;

use dragnet_core::{TripwireCategory, TripwireHit};

/// Curated risk terms by category. Matched case-insensitively as
/// substrings; longest match wins at a given position.
const DICTIONARY: &[(TripwireCategory, &[&str])] = &[
    (
        TripwireCategory::Sanctions,
        &[
            "ofac",
            "sdn list",
            "specially designated national",
            "sanctions list",
            "sanctioned entity",
            "sectoral sanctions",
            "eu sanctions",
            "un security council sanctions",
            "export ban",
            "asset freeze",
            "embargo",
        ],
    ),
    (
        TripwireCategory::Pep,
        &[
            "politically exposed person",
            "pep screening",
            "state official",
            "former minister",
            "head of state",
            "ruling family",
        ],
    ),
    (
        TripwireCategory::Fraud,
        &[
            "fraud",
            "fraudulent",
            "ponzi",
            "pyramid scheme",
            "embezzlement",
            "misappropriation",
            "fake invoices",
            "wire fraud",
            "securities fraud",
            "forgery",
        ],
    ),
    (
        TripwireCategory::MoneyLaundering,
        &[
            "money laundering",
            "laundered",
            "anti-money laundering",
            "shell company",
            "shell companies",
            "offshore accounts",
            "layering",
            "suspicious transaction report",
            "beneficial owner concealed",
        ],
    ),
    (
        TripwireCategory::Corruption,
        &[
            "bribery",
            "bribe",
            "kickback",
            "corruption",
            "corrupt practices",
            "embezzled public funds",
            "influence peddling",
            "abuse of office",
        ],
    ),
    (
        TripwireCategory::Litigation,
        &[
            "lawsuit",
            "litigation",
            "class action",
            "court order",
            "injunction",
            "plaintiff",
            "defendant",
            "indictment",
            "convicted",
            "criminal charges",
            "settlement agreement",
        ],
    ),
];

/// Automaton built once at startup; scanning never blocks extraction.
pub struct TripwireScanner {
    automaton: AhoCorasick,
    terms: Vec<(TripwireCategory, &'static str)>,
}

impl TripwireScanner {
    pub fn new() -> Self {
        let mut terms = Vec::new();
        for (category, words) in DICTIONARY {
            for word in *words {
                terms.push((*category, *word));
            }
        }
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(terms.iter().map(|(_, t)| *t))
            .expect("tripwire dictionary is well-formed");
        Self { automaton, terms }
    }

    /// Scan capped text. Hits are deduplicated per (category, term); the
    /// first occurrence's span is kept.
    pub fn scan(&self, text: &str) -> Vec<TripwireHit> {
        let mut seen: HashSet<(TripwireCategory, &str)> = HashSet::new();
        let mut hits = Vec::new();
        for m in self.automaton.find_iter(text) {
            let (category, term) = self.terms[m.pattern().as_usize()];
            if seen.insert((category, term)) {
                hits.push(TripwireHit {
                    category,
                    term: term.to_string(),
                    span: [m.start(), m.end()],
                });
            }
        }
        hits
    }
}

impl Default for TripwireScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanctions_hit() {
        let scanner = TripwireScanner::new();
        let text = "The entity was designated under SDN list provisions by OFAC.";
        let hits = scanner.scan(text);
        assert!(hits
            .iter()
            .any(|h| h.category == TripwireCategory::Sanctions && h.term == "sdn list"));
        assert!(hits
            .iter()
            .any(|h| h.category == TripwireCategory::Sanctions && h.term == "ofac"));
    }

    #[test]
    fn test_case_insensitive_and_span() {
        let scanner = TripwireScanner::new();
        let hits = scanner.scan("ALLEGED Money Laundering case");
        let hit = hits
            .iter()
            .find(|h| h.category == TripwireCategory::MoneyLaundering)
            .unwrap();
        assert_eq!(hit.term, "money laundering");
        assert_eq!(&"ALLEGED Money Laundering case"[hit.span[0]..hit.span[1]], "Money Laundering");
    }

    #[test]
    fn test_dedup_keeps_first_span() {
        let scanner = TripwireScanner::new();
        let hits = scanner.scan("fraud here, more fraud there");
        let fraud: Vec<_> = hits.iter().filter(|h| h.term == "fraud").collect();
        assert_eq!(fraud.len(), 1);
        assert_eq!(fraud[0].span, [0, 5]);
    }

    #[test]
    fn test_clean_text_no_hits() {
        let scanner = TripwireScanner::new();
        assert!(scanner.scan("A quiet bakery in a small town.").is_empty());
    }
}
