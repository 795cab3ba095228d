//! WhatsApp Cloud API notifier.
//!
//! Sends a plain text message per notification, retrying transport errors
//! and 5xx answers with exponential backoff. 4xx answers are final.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use super::{Notification, NotificationError, Notifier};
use crate::config::WhatsAppConfig;

const MAX_ATTEMPTS: u32 = 3;

pub struct WhatsAppNotifier {
    client: Client,
    api_url: String,
    access_token: String,
    retry_delay: Duration,
}

impl WhatsAppNotifier {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, NotificationError> {
        let api_url = config
            .api_url
            .clone()
            .ok_or_else(|| NotificationError::Config("api_url is not set".to_string()))?;
        let access_token = config
            .access_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| NotificationError::Config("access_token is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url,
            access_token,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Initial delay between attempts; doubles after each failure.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn payload(recipient: &str, notification: &Notification) -> serde_json::Value {
        json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": { "body": notification.message() },
        })
    }

    fn redacted_target(&self) -> String {
        Url::parse(&self.api_url)
            .ok()
            .map(|parsed| {
                let host = parsed.host_str().unwrap_or("unknown");
                format!("{}://{}", parsed.scheme(), host)
            })
            .unwrap_or_else(|| "[invalid-url]".to_string())
    }
}

/// Digits only, as the API expects. A leading `+` is dropped.
pub fn normalize_recipient(phone: &str) -> Result<String, NotificationError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 7 || digits.len() > 15 {
        return Err(NotificationError::InvalidRecipient(phone.to_string()));
    }
    Ok(digits)
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let recipient = normalize_recipient(notification.phone())?;
        let payload = Self::payload(&recipient, notification);
        let endpoint = self.redacted_target();
        let mut delay = self.retry_delay;

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.access_token)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!(endpoint = %endpoint, attempt, "WhatsApp message accepted");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    warn!(endpoint = %endpoint, attempt, status = %status, "WhatsApp message rejected");
                    if status.is_client_error() || attempt == MAX_ATTEMPTS {
                        return Err(NotificationError::Rejected {
                            attempts: attempt,
                            status: status.as_u16(),
                        });
                    }
                }
                Err(err) => {
                    warn!(endpoint = %endpoint, attempt, error = %err, "WhatsApp request failed");
                    if attempt == MAX_ATTEMPTS {
                        return Err(NotificationError::Transport(err));
                    }
                }
            }

            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::work_order::WorkOrderStatus;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> WhatsAppNotifier {
        WhatsAppNotifier::new(&WhatsAppConfig {
            api_url: Some(format!("{}/v1/messages", server.uri())),
            access_token: Some("wa-token".into()),
            timeout_seconds: 5,
        })
        .unwrap()
        .with_retry_delay(Duration::from_millis(5))
    }

    fn repaired() -> Notification {
        Notification::WorkOrderStatusChanged {
            phone: "+57 300 123 4567".into(),
            customer_name: "Ana".into(),
            work_order_id: Uuid::new_v4(),
            plate: "ABC123".into(),
            status: WorkOrderStatus::Reparado,
        }
    }

    #[tokio::test]
    async fn sends_text_message_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("authorization", "Bearer wa-token"))
            .and(body_partial_json(json!({
                "messaging_product": "whatsapp",
                "to": "573001234567",
                "type": "text",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server).send(&repaired()).await.unwrap();
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = notifier(&server).send(&repaired()).await.unwrap_err();
        assert!(matches!(
            err,
            NotificationError::Rejected {
                attempts: 3,
                status: 503
            }
        ));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = notifier(&server).send(&repaired()).await.unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { attempts: 1, .. }));
    }

    #[test]
    fn recipient_must_look_like_a_phone_number() {
        assert_eq!(normalize_recipient("+57 300-123-4567").unwrap(), "573001234567");
        assert!(normalize_recipient("12").is_err());
    }

    #[test]
    fn requires_url_and_token() {
        let missing = WhatsAppNotifier::new(&WhatsAppConfig::default());
        assert!(matches!(missing, Err(NotificationError::Config(_))));
    }
}
