use robotstxt::DefaultMatcher;
use tracing::debug;
use url::Url;

use dragnet_core::{FetchConfig, TierDriver};

/// robots.txt, fetched once on first contact. Missing, unreadable, or
/// malformed robots.txt means allow-all.
pub struct RobotsGate {
    enabled: bool,
    user_agent: String,
    rules: Option<Option<String>>,
}

impl RobotsGate {
    pub fn new(enabled: bool, user_agent: String) -> Self {
        Self {
            enabled,
            user_agent,
            rules: None,
        }
    }

    pub async fn allowed(
        &mut self,
        url: &Url,
        driver: &dyn TierDriver,
        config: &FetchConfig,
    ) -> bool {
        if !self.enabled {
            return true;
        }
        if self.rules.is_none() {
            self.rules = Some(self.fetch_rules(url, driver, config).await);
        }
        match self.rules.as_ref().and_then(|r| r.as_ref()) {
            Some(body) => allowed_by_rules(body, &self.user_agent, url.as_str()),
            None => true,
        }
    }

    async fn fetch_rules(
        &self,
        url: &Url,
        driver: &dyn TierDriver,
        config: &FetchConfig,
    ) -> Option<String> {
        let mut robots_url = url.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        match driver.fetch(&robots_url, config).await {
            Ok(resp) if (200..300).contains(&resp.status) => {
                debug!(url = %robots_url, "robots.txt loaded");
                Some(String::from_utf8_lossy(&resp.body).into_owned())
            }
            Ok(resp) => {
                debug!(url = %robots_url, status = resp.status, "robots.txt unavailable, allowing all");
                None
            }
            Err(e) => {
                debug!(url = %robots_url, error = %e, "robots.txt fetch failed, allowing all");
                None
            }
        }
    }
}

pub fn allowed_by_rules(body: &str, user_agent: &str, url: &str) -> bool {
    DefaultMatcher::default().one_agent_allowed_by_robots(body, user_agent, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disallow_all() {
        let body = "User-agent: *\nDisallow: /\n";
        assert!(!allowed_by_rules(body, "dragnet", "https://example.com/"));
        assert!(!allowed_by_rules(body, "dragnet", "https://example.com/a/b"));
    }

    #[test]
    fn test_path_scoped_disallow() {
        let body = "User-agent: *\nDisallow: /private/\n";
        assert!(allowed_by_rules(body, "dragnet", "https://example.com/public"));
        assert!(!allowed_by_rules(
            body,
            "dragnet",
            "https://example.com/private/x"
        ));
    }

    #[test]
    fn test_agent_specific_rules() {
        let body = "User-agent: dragnet\nDisallow: /\n\nUser-agent: *\nAllow: /\n";
        assert!(!allowed_by_rules(body, "dragnet", "https://example.com/"));
        assert!(allowed_by_rules(body, "otherbot", "https://example.com/"));
    }

    #[test]
    fn test_empty_rules_allow() {
        assert!(allowed_by_rules("", "dragnet", "https://example.com/"));
    }
}
