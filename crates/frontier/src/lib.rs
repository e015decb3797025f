pub mod filter;
pub mod normalize;

use std::collections::{HashSet, VecDeque};

use tracing::trace;
use url::Url;

use dragnet_core::FrontierEntry;

pub use normalize::{normalize, normalized_str, registrable_domain};

#[derive(Debug, Clone)]
pub struct FrontierLimits {
    pub max_pages: u64,
    pub max_depth: u32,
    /// URL_ONLY and EXTRACT fetches count against `max_pages *
    /// secondary_budget_factor`, not the page budget.
    pub secondary_budget_factor: u64,
    pub allow_subdomains: bool,
}

/// URL frontier for a single domain's crawl. Owned exclusively by one
/// Domain Pipeline; FIFO so records leave in dequeue order.
pub struct Frontier {
    seed_host: String,
    registrable: String,
    limits: FrontierLimits,
    queue: VecDeque<FrontierEntry>,
    seen: HashSet<String>,
    full_fetched: u64,
    aux_fetched: u64,
}

impl Frontier {
    pub fn new(seed: Url, limits: FrontierLimits) -> Self {
        let seed_host = seed.host_str().unwrap_or_default().to_ascii_lowercase();
        let registrable = registrable_domain(&seed_host);
        let mut seen = HashSet::new();
        seen.insert(normalized_str(&seed));
        let mut queue = VecDeque::new();
        queue.push_back(FrontierEntry {
            url: seed,
            depth: 0,
            parent: None,
        });
        Self {
            seed_host,
            registrable,
            limits,
            queue,
            seen,
            full_fetched: 0,
            aux_fetched: 0,
        }
    }

    pub fn registrable(&self) -> &str {
        &self.registrable
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Whether a URL belongs to this domain's crawl. Without
    /// `allow_subdomains` only the seed's own host qualifies (modulo a
    /// leading `www.`); with it, any host under the same registrable domain.
    pub fn in_scope(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        if registrable_domain(&host) != self.registrable {
            return false;
        }
        if self.limits.allow_subdomains {
            return true;
        }
        strip_www(&host) == strip_www(&self.seed_host)
    }

    /// Offer a candidate discovered on `parent`. Returns true when it was
    /// enqueued; scope, depth, asset filters, and the per-domain seen set
    /// all gate admission.
    pub fn offer(&mut self, url: &Url, depth: u32, parent: &Url) -> bool {
        if depth > self.limits.max_depth {
            return false;
        }
        if !self.in_scope(url) {
            return false;
        }
        if !filter::should_enqueue(url) {
            return false;
        }
        let key = normalized_str(url);
        if !self.seen.insert(key) {
            return false;
        }
        trace!(url = %url, depth, "frontier enqueue");
        self.queue.push_back(FrontierEntry {
            url: url.clone(),
            depth,
            parent: Some(parent.to_string()),
        });
        true
    }

    pub fn record_full(&mut self) {
        self.full_fetched += 1;
    }

    pub fn record_aux(&mut self) {
        self.aux_fetched += 1;
    }

    /// Page budget left for FULL fetches.
    pub fn full_budget_left(&self) -> bool {
        self.full_fetched < self.limits.max_pages
    }

    /// Secondary budget for URL_ONLY / EXTRACT records.
    pub fn aux_budget_left(&self) -> bool {
        self.aux_fetched < self.limits.max_pages * self.limits.secondary_budget_factor
    }

    pub fn pages_fetched(&self) -> u64 {
        self.full_fetched
    }

    pub fn urls_seen(&self) -> u64 {
        self.seen.len() as u64
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
