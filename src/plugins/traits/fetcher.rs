use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// What to read from one product page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub price_selector: String,
    pub stock_selector: String,
    /// Bound on each element wait.
    pub timeout_ms: u64,
}

/// Raw text pulled from the page, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub price_text: String,
    pub stock_text: String,
}

/// Source of fetch sessions. A session is opened at the start of a cycle and
/// dropped before the cycle returns; dropping it releases the browser.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open_session(&self) -> Result<Box<dyn FetchSession>>;
}

#[async_trait]
pub trait FetchSession: Send {
    /// Load the page and wait (bounded) for both selectors.
    ///
    /// Fails with `AppError::Navigation` when the page cannot be loaded and
    /// `AppError::FetchTimeout` when a selector never appears.
    async fn fetch(&mut self, request: &FetchRequest) -> Result<PageSnapshot>;
}
