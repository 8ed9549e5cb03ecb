//! Renderer gateway: turns a URL into fully rendered HTML.
//!
//! Article pages on finance portals assemble their body with client-side
//! JavaScript, so a plain GET returns little more than a shell. Rendering is
//! delegated to a headless browser service speaking the Splash HTTP API.
//!
//! # Layers
//!
//! - [`Renderer`]: the async contract
//! - [`splash::SplashRenderer`]: Splash `render.html` client that honors robots.txt
//! - [`retry::RetryRenderer`]: decorator adding backoff for transient failures
//!
//! Each URL fails on its own; nothing here aborts a batch.

pub mod retry;
pub mod robots;
pub mod splash;

use crate::config::RendererConfig;
use crate::error::Result;
use crate::models::RenderedPage;
use retry::RetryRenderer;
use splash::SplashRenderer;
use std::time::Duration;

/// Async rendering of a single URL.
pub trait Renderer {
    async fn render(&self, url: &str) -> Result<RenderedPage>;
}

/// The production renderer: Splash wrapped in retry.
pub fn build_renderer(config: &RendererConfig) -> Result<RetryRenderer<SplashRenderer>> {
    let splash = SplashRenderer::new(config)?;
    Ok(RetryRenderer::new(
        splash,
        config.max_retries,
        Duration::from_millis(config.retry_base_delay_ms),
    ))
}

/// Canned renderer for tests: known URLs return their HTML, anything else 404s.
#[cfg(test)]
pub(crate) mod fake {
    use super::Renderer;
    use crate::error::{PipelineError, Result};
    use crate::models::RenderedPage;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct StaticRenderer {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl StaticRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Renderer for StaticRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(url) {
                Some(html) => Ok(RenderedPage {
                    url: url.to_string(),
                    raw_html: html.clone(),
                }),
                None => Err(PipelineError::RenderStatus {
                    url: url.to_string(),
                    status: 404,
                    message: "not found".to_string(),
                }),
            }
        }
    }
}
