pub mod companies;
pub mod gazetteer;
pub mod names;
pub mod outlinks;
pub mod patterns;
pub mod tier;
pub mod tripwire;
pub mod validate;

use std::collections::BTreeMap;

use url::Url;

use dragnet_core::config::ExtractionConfig;
use dragnet_core::{CompanyMatch, EntityKind, ExtractionTier, TripwireHit};
use dragnet_parser::PageLink;

use names::PersonExtractor;
use patterns::PatternBank;
use tripwire::TripwireScanner;

pub use tier::classify;

/// Everything one page's text yields: entities, risk hits, outlinks.
#[derive(Debug, Default)]
pub struct Extraction {
    pub entities: BTreeMap<EntityKind, Vec<String>>,
    pub companies: Vec<CompanyMatch>,
    pub tripwires: Vec<TripwireHit>,
    pub outlinks: Vec<String>,
    pub internal_links: usize,
}

/// The extraction engine. All static state (automaton, regex bank,
/// gazetteer) is built once here; `extract` is pure and deterministic and
/// never errors to its caller.
pub struct Extractor {
    patterns: PatternBank,
    tripwires: TripwireScanner,
    persons: PersonExtractor,
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            patterns: PatternBank::new(),
            tripwires: TripwireScanner::new(),
            persons: PersonExtractor::new(config.person_threshold),
            config,
        }
    }

    /// Tier classification for a URL, computed once on dequeue.
    pub fn classify(&self, url: &Url) -> ExtractionTier {
        tier::classify(url)
    }

    /// Run the fixed sub-stage order (tripwires, pattern bank, names,
    /// outlinks) over at most `max_content_scan` bytes of text. Text beyond
    /// the cap is ignored for matching but still counts toward the page's
    /// recorded length.
    pub fn extract(&self, url: &Url, text: &str, links: &[PageLink]) -> Extraction {
        let capped = cap_text(text, self.config.max_content_scan);

        let tripwires = self.tripwires.scan(capped);

        let mut entities = self.patterns.extract(capped);

        let persons = self.persons.extract(capped, self.config.max_persons);
        if !persons.is_empty() {
            entities.insert(EntityKind::Person, persons);
        }

        let companies = companies::extract_companies(capped, self.config.max_companies);
        if !companies.is_empty() {
            entities.insert(
                EntityKind::Company,
                companies.iter().map(|c| c.name.clone()).collect(),
            );
        }

        let (outlinks, internal_links) =
            outlinks::select_outlinks(url, links, self.config.max_outlinks);

        Extraction {
            entities,
            companies,
            tripwires,
            outlinks,
            internal_links,
        }
    }
}

fn cap_text(text: &str, cap: usize) -> &str {
    if text.len() <= cap {
        return text;
    }
    let mut end = cap;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
