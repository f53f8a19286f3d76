//! Push notifications over Firebase Cloud Messaging.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use policyai_common::config::PushConfig;
use policyai_common::{AppError, AppResult};
use policyai_db::repositories::UserRepository;
use serde::Serialize;

/// Outcome of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub success: usize,
    pub failure: usize,
}

/// A notification addressed to device tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

impl PushMessage {
    /// Announcement of a newly published policy.
    #[must_use]
    pub fn new_policy(title: &str) -> Self {
        let mut data = HashMap::new();
        data.insert("type".to_string(), "new_policy".to_string());
        data.insert("title".to_string(), title.to_string());

        Self {
            title: "New Policy Added!".to_string(),
            body: format!("Vote now on: {title}"),
            data,
        }
    }
}

/// Delivers one message to one device token.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> AppResult<()>;
}

/// FCM legacy HTTP sender.
pub struct FcmSender {
    server_key: String,
    endpoint: String,
    http_client: reqwest::Client,
}

impl FcmSender {
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(server_key: String, config: &PushConfig) -> Self {
        Self {
            server_key,
            endpoint: config.endpoint.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send(&self, token: &str, message: &PushMessage) -> AppResult<()> {
        let body = serde_json::json!({
            "to": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("FCM request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalService(format!("FCM error: {status}")));
        }

        #[derive(serde::Deserialize)]
        struct FcmResponse {
            #[serde(default)]
            failure: u32,
        }

        let parsed: FcmResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse FCM response: {e}")))?;

        if parsed.failure > 0 {
            return Err(AppError::ExternalService(
                "FCM rejected the token".to_string(),
            ));
        }
        Ok(())
    }
}

/// Best-effort notification fan-out.
#[derive(Clone)]
pub struct PushService {
    sender: Option<Arc<dyn PushSender>>,
    user_repo: UserRepository,
}

impl PushService {
    #[must_use]
    pub fn new(sender: Option<Arc<dyn PushSender>>, user_repo: UserRepository) -> Self {
        Self { sender, user_repo }
    }

    /// Create a push service from configuration.
    #[must_use]
    pub fn from_config(config: &PushConfig, user_repo: UserRepository) -> Self {
        let sender = config
            .fcm_server_key
            .as_ref()
            .map(|key| Arc::new(FcmSender::new(key.clone(), config)) as Arc<dyn PushSender>);
        Self::new(sender, user_repo)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Send `message` to every token concurrently and count the outcomes.
    pub async fn notify(&self, tokens: &[String], message: &PushMessage) -> PushReport {
        let Some(sender) = &self.sender else {
            return PushReport::default();
        };

        let results = join_all(tokens.iter().map(|token| sender.send(token, message))).await;

        let mut report = PushReport::default();
        for result in results {
            match result {
                Ok(()) => report.success += 1,
                Err(e) => {
                    report.failure += 1;
                    tracing::warn!(error = %e, "Push delivery failed");
                }
            }
        }
        report
    }

    /// Tell every registered device about a new policy.
    pub async fn notify_new_policy(&self, title: &str) -> AppResult<PushReport> {
        if !self.is_enabled() {
            tracing::debug!("Push disabled, skipping new policy notification");
            return Ok(PushReport::default());
        }

        let tokens = self.user_repo.find_push_tokens().await?;
        if tokens.is_empty() {
            tracing::debug!("No push tokens registered");
            return Ok(PushReport::default());
        }

        let report = self.notify(&tokens, &PushMessage::new_policy(title)).await;
        tracing::info!(
            success = report.success,
            failure = report.failure,
            "New policy notification sent"
        );
        Ok(report)
    }

    /// Run [`Self::notify_new_policy`] in the background.
    pub fn spawn_new_policy(&self, title: String) {
        if !self.is_enabled() {
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.notify_new_policy(&title).await {
                tracing::warn!(title = %title, error = %e, "New policy notification failed");
            }
        });
    }
}
