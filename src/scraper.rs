use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScraperConfig;
use crate::plugins::traits::{FetchRequest, FetchSession, PageFetcher, PageSnapshot};
use crate::{AppError, Result};

/// Chrome exits on its own if no command arrives for this long.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

/// Fetches pages with a real headless Chrome so client-rendered prices show up.
pub struct ChromeFetcher {
    config: ScraperConfig,
}

/// One browser with a single reused tab; the browser is closed on drop.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .sandbox(false)
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-setuid-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &self.config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    fn name(&self) -> &'static str {
        "headless-chrome"
    }

    async fn open_session(&self) -> Result<Box<dyn FetchSession>> {
        let launch_options = self.launch_options()?;
        let user_agent = self.config.user_agent.clone();

        let (browser, tab) = tokio::task::spawn_blocking(move || -> Result<(Browser, Arc<Tab>)> {
            let browser = Browser::new(launch_options)
                .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

            let tab = browser
                .new_tab()
                .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

            if let Some(user_agent) = user_agent.as_deref() {
                tab.set_user_agent(user_agent, None, None)
                    .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;
            }

            Ok((browser, tab))
        })
        .await??;

        tracing::debug!("Browser session opened");
        Ok(Box::new(ChromeSession { _browser: browser, tab }))
    }
}

#[async_trait]
impl FetchSession for ChromeSession {
    async fn fetch(&mut self, request: &FetchRequest) -> Result<PageSnapshot> {
        let tab = Arc::clone(&self.tab);
        let request = request.clone();

        tokio::task::spawn_blocking(move || fetch_blocking(&tab, &request)).await?
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            tracing::debug!("Tab close failed during session release: {}", e);
        }
        tracing::debug!("Browser session released");
    }
}

fn fetch_blocking(tab: &Tab, request: &FetchRequest) -> Result<PageSnapshot> {
    tab.navigate_to(&request.url)
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(|e| AppError::Navigation {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

    let timeout = Duration::from_millis(request.timeout_ms);
    for selector in [&request.price_selector, &request.stock_selector] {
        tab.wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|_| AppError::FetchTimeout {
                selector: selector.clone(),
                timeout_ms: request.timeout_ms,
            })?;
    }

    let html = tab
        .get_content()
        .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))?;

    snapshot_from_html(&html, request)
}

/// Pull the price and stock-button text out of a rendered document.
pub fn snapshot_from_html(html: &str, request: &FetchRequest) -> Result<PageSnapshot> {
    let document = Html::parse_document(html);

    let read = |selector: &String| {
        extract_first_text(&document, selector)?.ok_or_else(|| AppError::FetchTimeout {
            selector: selector.clone(),
            timeout_ms: request.timeout_ms,
        })
    };

    Ok(PageSnapshot {
        price_text: read(&request.price_selector)?,
        stock_text: read(&request.stock_selector)?,
    })
}

/// Whitespace-normalised text of the first element matching `selector`.
fn extract_first_text(document: &Html, selector: &str) -> Result<Option<String>> {
    let css_selector = Selector::parse(selector)
        .map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))?;

    Ok(document.select(&css_selector).next().map(|element| {
        element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }))
}
