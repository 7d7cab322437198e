use crate::config::DiscordConfig;
use crate::plugins::traits::NotifierPlugin;
use crate::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Posts messages to a Discord webhook as plain `content`.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: Option<String>,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let webhook_url = config
            .webhook_url
            .clone()
            .ok_or_else(|| AppError::Validation("Missing Discord webhook_url".to_string()))?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(DiscordNotifier {
            client,
            webhook_url,
            username: config.username.clone(),
        })
    }

    fn create_webhook_payload(&self, message: &str) -> serde_json::Value {
        let mut payload = json!({
            "content": message,
        });

        if let Some(username) = &self.username {
            payload["username"] = json!(username);
        }

        payload
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let payload = self.create_webhook_payload(message);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notify(format!("webhook returned {}: {}", status, body)));
        }

        Ok(())
    }
}
