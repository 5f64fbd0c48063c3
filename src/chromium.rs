use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::{BrowserLauncher, BrowserPage};
use crate::config::SearchOptions;
use crate::error::HarvestError;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const HANDLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Launches headless Chromium over CDP.
///
/// The CDP handler needs an async runtime; the launcher owns one and every
/// page call blocks on it, so the rest of the pipeline stays synchronous.
pub struct ChromiumLauncher {
    runtime: Arc<Runtime>,
    headless: bool,
    action_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(options: &SearchOptions) -> Result<Self, HarvestError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("plant-harvest-cdp")
            .enable_all()
            .build()
            .map_err(|err| HarvestError::BrowserLaunch(err.to_string()))?;
        Ok(Self {
            runtime: Arc::new(runtime),
            headless: options.headless,
            action_timeout: options.action_timeout,
        })
    }
}

impl BrowserLauncher for ChromiumLauncher {
    type Page = ChromiumPage;

    fn launch(&self) -> Result<ChromiumPage, HarvestError> {
        let mut builder = BrowserConfig::builder().request_timeout(self.action_timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(HarvestError::BrowserLaunch)?;

        let (browser, handler, page) = self.runtime.block_on(async {
            let (mut browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|err| HarvestError::BrowserLaunch(err.to_string()))?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(err) = event {
                        debug!("cdp handler event error: {err}");
                    }
                }
            });
            match browser.new_page("about:blank").await {
                Ok(page) => Ok::<_, HarvestError>((browser, handler, page)),
                Err(err) => {
                    if let Err(close_err) = browser.close().await {
                        warn!("failed to close browser after launch error: {close_err}");
                    }
                    if let Err(wait_err) = browser.wait().await {
                        debug!("browser exit wait failed: {wait_err}");
                    }
                    handler.abort();
                    Err(HarvestError::BrowserLaunch(err.to_string()))
                }
            }
        })?;

        debug!("browser session launched");
        Ok(ChromiumPage {
            runtime: Arc::clone(&self.runtime),
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler),
            action_timeout: self.action_timeout,
        })
    }
}

pub struct ChromiumPage {
    runtime: Arc<Runtime>,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    action_timeout: Duration,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, String> {
        self.page
            .as_ref()
            .ok_or_else(|| "page already closed".to_string())
    }

    fn run<T, E, F>(&self, future: F) -> Result<T, String>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match self
            .runtime
            .block_on(tokio::time::timeout(self.action_timeout, future))
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.action_timeout)),
        }
    }

    fn shutdown(&mut self) -> Result<(), HarvestError> {
        let page = self.page.take();
        let browser = self.browser.take();
        let handler = self.handler.take();
        self.runtime.block_on(async move {
            if let Some(page) = page
                && let Err(err) = page.close().await
            {
                warn!("failed to close page: {err}");
            }
            let mut result = Ok(());
            if let Some(mut browser) = browser {
                if let Err(err) = browser.close().await {
                    result = Err(HarvestError::action("close", err));
                }
                if let Err(err) = browser.wait().await {
                    debug!("browser process did not exit cleanly: {err}");
                }
            }
            if let Some(handler) = handler
                && tokio::time::timeout(HANDLER_DRAIN_TIMEOUT, handler)
                    .await
                    .is_err()
            {
                debug!("cdp handler still running after close");
            }
            result
        })
    }
}

impl BrowserPage for ChromiumPage {
    type Element = Element;

    fn navigate(&mut self, url: &str) -> Result<(), HarvestError> {
        let to_error = |message: String| HarvestError::Navigation {
            url: url.to_string(),
            message,
        };
        let page = self.page().map_err(to_error)?;
        self.run(async {
            match page.goto(url).await {
                Ok(page) => page.wait_for_navigation().await.map(|_| ()),
                Err(err) => Err(err),
            }
        })
        .map_err(to_error)
    }

    fn query_elements(&mut self, selector: &str) -> Result<Vec<Element>, HarvestError> {
        let page = self
            .page()
            .map_err(|err| HarvestError::action("query_elements", err))?;
        self.run(page.find_elements(selector))
            .map_err(|err| HarvestError::action("query_elements", err))
    }

    fn click(&mut self, element: &Element) -> Result<(), HarvestError> {
        self.run(async { element.click().await.map(|_| ()) })
            .map_err(|err| HarvestError::action("click", err))
    }

    fn read_attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, HarvestError> {
        self.run(element.attribute(name))
            .map_err(|err| HarvestError::action("read_attribute", err))
    }

    fn current_url(&mut self) -> Result<String, HarvestError> {
        let page = self
            .page()
            .map_err(|err| HarvestError::action("current_url", err))?;
        self.run(page.url())
            .map_err(|err| HarvestError::action("current_url", err))?
            .ok_or_else(|| HarvestError::action("current_url", "page has no URL"))
    }

    fn scroll_to_bottom(&mut self) -> Result<(), HarvestError> {
        let page = self
            .page()
            .map_err(|err| HarvestError::action("scroll", err))?;
        self.run(async { page.evaluate(SCROLL_TO_BOTTOM).await.map(|_| ()) })
            .map_err(|err| HarvestError::action("scroll", err))
    }

    fn wait(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    fn close(mut self) -> Result<(), HarvestError> {
        self.shutdown()
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if self.browser.is_some()
            && let Err(err) = self.shutdown()
        {
            warn!("browser cleanup on drop failed: {err}");
        }
    }
}
