//! Headless Chromium tier.
//!
//! Every call launches its own browser with a throwaway profile directory and
//! tears it down before returning, whatever the outcome. Nothing is shared
//! between calls, so concurrent jobs never see each other's cookies or storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use sitedigest_shared::{FetchConfig, FetchStrategyKind, Result, SiteDigestError};

use crate::FetchStrategy;

/// Renders pages in an isolated, per-call headless browser.
pub struct RenderedFetcher {
    user_agent: String,
    navigation_timeout: Duration,
    settle: Duration,
    chrome_executable: Option<PathBuf>,
}

impl RenderedFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            navigation_timeout: config.render_timeout,
            settle: config.render_settle,
            chrome_executable: config.chrome_executable.clone(),
        }
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .request_timeout(self.navigation_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled");

        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| SiteDigestError::Browser(format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl FetchStrategy for RenderedFetcher {
    fn kind(&self) -> FetchStrategyKind {
        FetchStrategyKind::Rendered
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let profile_dir = std::env::temp_dir().join(format!("sitedigest-profile-{}", Uuid::now_v7()));

        let result = match self.browser_config(&profile_dir) {
            Ok(config) => match BrowserSession::launch(config).await {
                Ok(session) => {
                    let rendered = session
                        .render(url, &self.user_agent, self.navigation_timeout, self.settle)
                        .await;
                    session.close().await;
                    rendered
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        if profile_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&profile_dir) {
                debug!(path = ?profile_dir, error = %e, "failed to remove browser profile");
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Browser session
// ---------------------------------------------------------------------------

/// A launched browser plus the task pumping its CDP event stream.
struct BrowserSession {
    browser: Browser,
    events: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SiteDigestError::Browser(format!("failed to launch browser: {e}")))?;

        let events = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        Ok(Self { browser, events })
    }

    /// Navigate, wait for network idle (bounded), settle, then capture the DOM.
    async fn render(
        &self,
        url: &Url,
        user_agent: &str,
        navigation_timeout: Duration,
        settle: Duration,
    ) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| SiteDigestError::Browser(format!("failed to open page: {e}")))?;

        page.set_user_agent(user_agent)
            .await
            .map_err(|e| SiteDigestError::Browser(format!("failed to set user agent: {e}")))?;

        // Navigation counts as finished once its own loader reports network idle.
        let navigation = async {
            let cdp = |e: CdpError| e.to_string();
            page.execute(SetLifecycleEventsEnabledParams::new(true))
                .await
                .map_err(cdp)?;
            let mut lifecycle = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .map_err(cdp)?;

            let nav = page
                .execute(NavigateParams::new(url.as_str()))
                .await
                .map_err(cdp)?
                .result;
            if let Some(error) = nav.error_text {
                return Err(error);
            }

            while let Some(event) = lifecycle.next().await {
                if is_network_idle(
                    &event.name,
                    event.loader_id.as_ref(),
                    event.frame_id.as_ref(),
                    nav.loader_id.as_ref().map(|id| id.as_ref()),
                    nav.frame_id.as_ref(),
                ) {
                    return Ok(());
                }
            }
            Err("lifecycle event stream closed".to_string())
        };

        match tokio::time::timeout(navigation_timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                return Err(SiteDigestError::Browser(format!(
                    "{url}: navigation failed: {reason}"
                )));
            }
            Err(_) => {
                return Err(SiteDigestError::Browser(format!(
                    "{url}: network did not go idle within {}s",
                    navigation_timeout.as_secs()
                )));
            }
        }

        // Deferred scripts get a fixed window to populate the DOM.
        tokio::time::sleep(settle).await;

        let html = page
            .content()
            .await
            .map_err(|e| SiteDigestError::Browser(format!("{url}: failed to capture DOM: {e}")))?;

        debug!(%url, bytes = html.len(), "rendered page captured");
        Ok(html)
    }

    /// Close the browser and stop the event pump. Errors are logged, not returned.
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser wait failed");
        }
        self.events.abort();
    }
}

/// Whether a lifecycle event marks network idle for the navigation we started.
///
/// Same-document navigations carry no loader id, so the frame is matched instead.
fn is_network_idle(
    event_name: &str,
    event_loader: &str,
    event_frame: &str,
    nav_loader: Option<&str>,
    nav_frame: &str,
) -> bool {
    event_name == "networkIdle"
        && match nav_loader {
            Some(loader) => event_loader == loader,
            None => event_frame == nav_frame,
        }
}
