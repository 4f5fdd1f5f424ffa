//! Fire-and-forget client for the notification-dispatch interface.

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub passenger_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub channels: Vec<String>,
    pub data: serde_json::Value,
}

#[derive(Clone)]
pub struct NotificationClient {
    http: reqwest::Client,
    base_url: String,
}

impl NotificationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build notification HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Delivery problems are logged, never propagated: notifications must not
    /// fail the operation that triggered them.
    pub async fn send(&self, req: &SendNotificationRequest) {
        let result = self
            .http
            .post(format!("{}/api/v1/notifications/send", self.base_url))
            .json(req)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Notification sent to {} ({})",
                    req.passenger_id, req.notification_type
                );
            }
            Ok(response) => {
                warn!(
                    "notification service returned {} for {}",
                    response.status(),
                    req.passenger_id
                );
            }
            Err(e) => warn!("failed to send notification to {}: {}", req.passenger_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> SendNotificationRequest {
        SendNotificationRequest {
            passenger_id: "P123".to_string(),
            notification_type: "WAITLIST_CHECKIN_COMPLETED".to_string(),
            channels: vec!["push".into(), "email".into(), "sms".into()],
            data: json!({"seatId": "12A"}),
        }
    }

    #[tokio::test]
    async fn delivers_to_the_dispatch_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications/send"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = NotificationClient::new(&server.uri(), Duration::from_secs(1));
        client.send(&request()).await;
    }

    #[tokio::test]
    async fn dispatch_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/notifications/send"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = NotificationClient::new(&server.uri(), Duration::from_secs(1));
        // Must not panic or surface the failure.
        client.send(&request()).await;
    }
}
