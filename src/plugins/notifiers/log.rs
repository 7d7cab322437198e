use crate::plugins::traits::NotifierPlugin;
use crate::Result;
use async_trait::async_trait;

/// Dry-run notifier: writes each message to the log instead of posting it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &str) -> Result<()> {
        tracing::info!(target: "restock_watcher::notification", "{}", message);
        Ok(())
    }
}
