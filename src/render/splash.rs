//! Splash `render.html` client.

use super::Renderer;
use super::robots::RobotsPolicy;
use crate::config::RendererConfig;
use crate::error::{PipelineError, Result};
use crate::models::RenderedPage;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Extra time the HTTP client allows on top of the render timeout.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// JSON body accepted by Splash's `render.html` endpoint.
#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    wait: f64,
    timeout: u64,
    headers: HashMap<&'static str, &'a str>,
}

pub struct SplashRenderer {
    client: reqwest::Client,
    endpoint: String,
    wait_seconds: f64,
    timeout_secs: u64,
    user_agent: String,
    robots: Option<RobotsPolicy>,
}

impl SplashRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs) + CLIENT_TIMEOUT_SLACK)
            .build()?;
        let robots = config
            .obey_robots
            .then(|| RobotsPolicy::new(client.clone(), &config.user_agent));

        Ok(Self {
            client,
            endpoint: render_endpoint(&config.endpoint),
            wait_seconds: config.wait_seconds,
            timeout_secs: config.timeout_secs,
            user_agent: config.user_agent.clone(),
            robots,
        })
    }
}

/// `http://host:8050/` → `http://host:8050/render.html`
pub fn render_endpoint(base: &str) -> String {
    format!("{}/render.html", base.trim_end_matches('/'))
}

/// Only absolute http(s) URLs are rendered.
pub fn parse_target(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| PipelineError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PipelineError::InvalidUrl(format!(
            "{url}: unsupported scheme {other}"
        ))),
    }
}

impl Renderer for SplashRenderer {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let target = parse_target(url)?;

        if let Some(robots) = &self.robots {
            if !robots.allows(&target).await {
                warn!("Skipping URL disallowed by robots.txt");
                return Err(PipelineError::Disallowed {
                    url: url.to_string(),
                });
            }
        }

        let body = RenderRequest {
            url,
            wait: self.wait_seconds,
            timeout: self.timeout_secs,
            headers: HashMap::from([("User-Agent", self.user_agent.as_str())]),
        };
        debug!(endpoint = %self.endpoint, wait = self.wait_seconds, "Requesting render");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|source| PipelineError::RenderRequest {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PipelineError::RenderStatus {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let raw_html = resp
            .text()
            .await
            .map_err(|source| PipelineError::RenderRequest {
                url: url.to_string(),
                source,
            })?;
        info!(bytes = raw_html.len(), "Rendered page");

        Ok(RenderedPage {
            url: url.to_string(),
            raw_html,
        })
    }
}
