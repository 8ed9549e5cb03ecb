//! robots.txt parsing and a per-origin policy cache.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Parsed robots.txt rules.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    /// Rules per user-agent token (lowercase)
    rules: HashMap<String, Vec<Rule>>,
    /// Rules for `*`
    default_rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    allow: bool,
}

impl RobotsTxt {
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut agents: Vec<String> = Vec::new();
        let mut rules: Vec<Rule> = Vec::new();
        // A user-agent line after rules starts a new group.
        let mut group_has_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match directive.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if group_has_rules {
                        robots.store_group(&agents, &rules);
                        agents.clear();
                        rules.clear();
                        group_has_rules = false;
                    }
                    agents.push(value.to_lowercase());
                }
                directive @ ("disallow" | "allow") => {
                    group_has_rules = true;
                    if !value.is_empty() {
                        rules.push(Rule {
                            pattern: value.to_string(),
                            allow: directive == "allow",
                        });
                    }
                }
                _ => {}
            }
        }
        robots.store_group(&agents, &rules);
        robots
    }

    /// Groups naming the same agent more than once are merged.
    fn store_group(&mut self, agents: &[String], rules: &[Rule]) {
        for agent in agents {
            if agent == "*" {
                self.default_rules.extend_from_slice(rules);
            } else {
                self.rules
                    .entry(agent.clone())
                    .or_default()
                    .extend_from_slice(rules);
            }
        }
    }

    /// The longest matching pattern decides; on equal length `Allow` wins.
    /// Agent groups match when the group token appears in the (lowercased)
    /// user agent string.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let agent = user_agent.to_lowercase();
        let rules = self
            .rules
            .iter()
            .filter(|(token, _)| agent.contains(token.as_str()))
            .max_by_key(|(token, _)| token.len())
            .map(|(_, rules)| rules)
            .unwrap_or(&self.default_rules);

        rules
            .iter()
            .filter(|rule| pattern_matches(&rule.pattern, path))
            .max_by_key(|rule| (rule.pattern.len(), rule.allow))
            .is_none_or(|rule| rule.allow)
    }
}

/// Match a robots.txt path pattern: `*` spans any run of characters and a
/// trailing `$` anchors the end of the path. Anything else is a prefix match.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };
    let mut pieces = pattern.split('*');
    let Some(rest) = pieces.next().and_then(|head| path.strip_prefix(head)) else {
        return false;
    };
    let pieces: Vec<&str> = pieces.collect();
    let Some((last, middle)) = pieces.split_last() else {
        return !anchored || rest.is_empty();
    };

    let mut rest = rest;
    for piece in middle {
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    if anchored {
        rest.ends_with(last)
    } else {
        rest.contains(last)
    }
}

/// Fetches and caches robots.txt per origin.
#[derive(Debug)]
pub struct RobotsPolicy {
    client: reqwest::Client,
    user_agent: String,
    cache: Mutex<HashMap<String, RobotsTxt>>,
}

impl RobotsPolicy {
    pub fn new(client: reqwest::Client, user_agent: &str) -> Self {
        Self {
            client,
            user_agent: user_agent.to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether our user agent may fetch `url`. Unreachable or missing
    /// robots.txt files allow everything.
    pub async fn allows(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let mut cache = self.cache.lock().await;
        if !cache.contains_key(&origin) {
            let robots = self.fetch(&origin).await;
            cache.insert(origin.clone(), robots);
        }
        cache
            .get(&origin)
            .is_none_or(|robots| robots.is_allowed(&self.user_agent, &path))
    }

    async fn fetch(&self, origin: &str) -> RobotsTxt {
        let robots_url = format!("{origin}/robots.txt");
        match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => {
                    debug!(%robots_url, bytes = body.len(), "Fetched robots.txt");
                    RobotsTxt::parse(&body)
                }
                Err(e) => {
                    warn!(%robots_url, error = %e, "Failed reading robots.txt; allowing all");
                    RobotsTxt::default()
                }
            },
            Ok(resp) => {
                debug!(%robots_url, status = resp.status().as_u16(), "No robots.txt; allowing all");
                RobotsTxt::default()
            }
            Err(e) => {
                warn!(%robots_url, error = %e, "robots.txt unreachable; allowing all");
                RobotsTxt::default()
            }
        }
    }
}
