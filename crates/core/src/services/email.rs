//! Email delivery for one-time passwords.

use std::time::Duration;

use policyai_common::config::EmailConfig;
use policyai_common::{AppError, AppResult};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Email service backed by the Resend HTTP API.
#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_address: String,
    http_client: reqwest::Client,
}

impl EmailService {
    /// Create a new email service.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            api_key: config.resend_api_key.clone(),
            from_address: config.from_address.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Check if email delivery is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a login code. Without an API key the code is only logged.
    pub async fn send_otp(&self, to: &str, code: &str, ttl: Duration) -> AppResult<()> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(email = %to, code = %code, "Email delivery disabled, OTP logged");
            return Ok(());
        };

        let body = serde_json::json!({
            "from": self.from_address,
            "to": [to],
            "subject": "Your PolicyAI login code",
            "html": render_otp_html(code, ttl),
        });

        let response = self
            .http_client
            .post(RESEND_ENDPOINT)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Resend request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Resend API error: {status} - {body}"
            )));
        }

        tracing::info!(email = %to, "OTP email sent");
        Ok(())
    }
}

fn render_otp_html(code: &str, ttl: Duration) -> String {
    let minutes = (ttl.as_secs() / 60).max(1);
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 480px; margin: 0 auto;\">\
         <h2>PolicyAI Login</h2>\
         <p>Your one-time login code is:</p>\
         <p style=\"font-size: 32px; font-weight: bold; letter-spacing: 6px;\">{code}</p>\
         <p>This code expires in {minutes} minutes. If you did not request it, ignore this email.</p>\
         </div>"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_html_contains_code() {
        let html = render_otp_html("042917", Duration::from_secs(300));
        assert!(html.contains("042917"));
        assert!(html.contains("5 minutes"));
    }

    #[tokio::test]
    async fn test_disabled_service_logs_only() {
        let service = EmailService::new(&EmailConfig::default());
        assert!(!service.is_enabled());
        let result = service
            .send_otp("a@example.com", "123456", Duration::from_secs(300))
            .await;
        assert!(result.is_ok());
    }
}
