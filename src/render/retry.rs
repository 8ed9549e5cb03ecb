//! Exponential backoff for transient render failures.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
//! ```
//!
//! Only errors for which [`PipelineError::is_transient`] holds are retried;
//! a robots.txt exclusion or a 404 fails immediately.

use super::Renderer;
use crate::error::Result;
use crate::models::RenderedPage;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Wraps any [`Renderer`] with retry logic.
pub struct RetryRenderer<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T> RetryRenderer<T>
where
    T: Renderer,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }

    #[cfg(test)]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rng().random_range(0..=jitter_ms)
        };
        delay + Duration::from_millis(jitter)
    }
}

impl<T> fmt::Debug for RetryRenderer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRenderer")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Renderer for RetryRenderer<T>
where
    T: Renderer,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.render(url).await {
                Ok(page) => return Ok(page),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "render exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "render attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with `status` for the first `failures` calls.
    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, status: u16) -> Self {
            Self {
                failures,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Renderer for Flaky {
        async fn render(&self, url: &str) -> Result<RenderedPage> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(PipelineError::RenderStatus {
                    url: url.to_string(),
                    status: self.status,
                    message: "nope".to_string(),
                });
            }
            Ok(RenderedPage {
                url: url.to_string(),
                raw_html: "<body>ok</body>".to_string(),
            })
        }
    }

    fn fast(inner: Flaky, retries: usize) -> RetryRenderer<Flaky> {
        RetryRenderer::new(inner, retries, Duration::from_millis(1)).with_max_jitter(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_recovers_from_transient_errors() {
        let renderer = fast(Flaky::new(2, 503), 2);
        let page = renderer.render("https://example.com").await.unwrap();
        assert_eq!(page.url, "https://example.com");
        assert_eq!(renderer.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let renderer = fast(Flaky::new(10, 504), 2);
        let err = renderer.render("https://example.com").await.unwrap_err();
        assert!(matches!(err, PipelineError::RenderStatus { status: 504, .. }));
        assert_eq!(renderer.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let renderer = fast(Flaky::new(1, 404), 5);
        assert!(renderer.render("https://example.com").await.is_err());
        assert_eq!(renderer.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let renderer = RetryRenderer::new(Flaky::new(0, 500), 10, Duration::from_secs(1))
            .with_max_jitter(Duration::ZERO);
        assert_eq!(renderer.backoff(1), Duration::from_secs(1));
        assert_eq!(renderer.backoff(2), Duration::from_secs(2));
        assert_eq!(renderer.backoff(3), Duration::from_secs(4));
        assert_eq!(renderer.backoff(10), Duration::from_secs(30));
    }
}
