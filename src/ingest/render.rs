// src/ingest/render.rs
//! Rendering capability for JS-only pages. Chosen once at startup; callers always get
//! some `PageRenderer`, the unavailable one simply reports that it cannot render.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use crate::config::watch::WatchConfig;
use crate::ingest::fetch::FetchError;

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url`, let client-side code settle, return the rendered DOM.
    async fn render(&self, url: &str) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub settle_min: Duration,
    pub settle_max: Duration,
    pub navigation_timeout: Duration,
}

impl RenderSettings {
    pub fn from_config(cfg: &WatchConfig) -> Self {
        Self {
            settle_min: Duration::from_millis(cfg.settle_delay_ms[0]),
            settle_max: Duration::from_millis(cfg.settle_delay_ms[1]),
            navigation_timeout: Duration::from_secs(cfg.navigation_timeout_secs),
        }
    }

    /// Uniform in `[settle_min, settle_max]`.
    pub fn settle_delay(&self) -> Duration {
        let lo = self.settle_min.as_millis() as u64;
        let hi = self.settle_max.as_millis() as u64;
        if hi <= lo {
            return self.settle_min;
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    /// Ceiling for one capture: navigation, the longest settle, then reading the DOM.
    pub fn capture_budget(&self) -> Duration {
        self.navigation_timeout
            .saturating_mul(2)
            .saturating_add(self.settle_max)
    }
}

/// Stand-in when no rendering engine could be found.
pub struct UnavailableRenderer;

#[async_trait]
impl PageRenderer for UnavailableRenderer {
    async fn render(&self, _url: &str) -> Result<String, FetchError> {
        Err(FetchError::RenderUnavailable)
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Pick the best renderer this process can actually run.
pub fn select_renderer(cfg: &WatchConfig) -> Arc<dyn PageRenderer> {
    let settings = RenderSettings::from_config(cfg);

    #[cfg(feature = "browser")]
    {
        if let Some(chrome) = chrome::ChromeRenderer::detect(settings) {
            info!(target: "ingest", renderer = "chrome", "dynamic fetch enabled");
            return Arc::new(chrome);
        }
    }

    let _ = settings;
    info!(target: "ingest", renderer = "unavailable", "dynamic fetch disabled (no browser found)");
    Arc::new(UnavailableRenderer)
}

#[cfg(feature = "browser")]
pub mod chrome {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::path::PathBuf;
    use tracing::{debug, warn};

    /// One fresh headless Chrome per render, torn down afterwards.
    pub struct ChromeRenderer {
        settings: RenderSettings,
    }

    impl ChromeRenderer {
        /// `None` when no Chrome/Chromium executable can be located.
        pub fn detect(settings: RenderSettings) -> Option<Self> {
            match BrowserConfig::builder().build() {
                Ok(_) => Some(Self { settings }),
                Err(e) => {
                    debug!(target: "ingest", error = %e, "chrome not detected");
                    None
                }
            }
        }

        async fn capture(&self, browser: &Browser, url: &str) -> Result<String, FetchError> {
            let nav = self.settings.navigation_timeout;
            let page = tokio::time::timeout(nav, browser.new_page(url))
                .await
                .map_err(|_| FetchError::RenderTimeout(nav))?
                .map_err(|e| FetchError::Render(e.to_string()))?;

            tokio::time::sleep(self.settings.settle_delay()).await;

            page.content()
                .await
                .map_err(|e| FetchError::Render(e.to_string()))
        }
    }

    fn scratch_profile() -> PathBuf {
        std::env::temp_dir().join(format!("listing-watch-{:016x}", rand::random::<u64>()))
    }

    #[async_trait]
    impl PageRenderer for ChromeRenderer {
        async fn render(&self, url: &str) -> Result<String, FetchError> {
            let nav = self.settings.navigation_timeout;
            let profile = scratch_profile();
            let config = BrowserConfig::builder()
                .user_data_dir(&profile)
                .build()
                .map_err(FetchError::Render)?;

            let (mut browser, mut handler) =
                match tokio::time::timeout(nav, Browser::launch(config)).await {
                    Ok(Ok(pair)) => pair,
                    Ok(Err(e)) => {
                        let _ = tokio::fs::remove_dir_all(&profile).await;
                        return Err(FetchError::Render(e.to_string()));
                    }
                    Err(_) => {
                        let _ = tokio::fs::remove_dir_all(&profile).await;
                        return Err(FetchError::RenderTimeout(nav));
                    }
                };
            let pump = tokio::spawn(async move {
                while let Some(ev) = handler.next().await {
                    if ev.is_err() {
                        break;
                    }
                }
            });

            let budget = self.settings.capture_budget();
            let out = match tokio::time::timeout(budget, self.capture(&browser, url)).await {
                Ok(res) => res,
                Err(_) => Err(FetchError::RenderTimeout(budget)),
            };

            let teardown = async {
                if let Err(e) = browser.close().await {
                    warn!(target: "ingest", error = %e, "browser close failed");
                }
                let _ = browser.wait().await;
            };
            if tokio::time::timeout(nav, teardown).await.is_err() {
                warn!(target: "ingest", "browser teardown timed out");
            }
            pump.abort();
            let _ = tokio::fs::remove_dir_all(&profile).await;

            out
        }

        fn name(&self) -> &'static str {
            "chrome"
        }
    }
}
