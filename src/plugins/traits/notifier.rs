use async_trait::async_trait;

use crate::Result;

/// Outbound delivery of operator-facing messages (Discord, logs, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &'static str;

    /// Deliver one rendered message. Non-success delivery is `AppError::Notify`.
    async fn send(&self, message: &str) -> Result<()>;
}
