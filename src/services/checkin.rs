//! Client for the external check-in-completion interface.
//!
//! The reassignment engine calls this while walking the waitlist, so every
//! request carries the client-level timeout: a stuck check-in service fails
//! one candidate, not the whole promotion chain.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::Baggage;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCheckInRequest {
    pub check_in_id: String,
    pub passenger_id: String,
    pub seat_id: String,
    pub baggage: Baggage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCheckInResponse {
    pub state: String,
    /// Boarding artifact produced by the check-in service. Passed through to
    /// notifications and events untouched; its shape is not ours to know.
    #[serde(default)]
    pub boarding_pass: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("check-in service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct CheckInClient {
    http: reqwest::Client,
    base_url: String,
}

impl CheckInClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build check-in HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn complete_check_in(
        &self,
        req: &CompleteCheckInRequest,
    ) -> Result<CompleteCheckInResponse, CheckInError> {
        info!(
            "Completing check-in {} for seat {}",
            req.check_in_id, req.seat_id
        );

        let response = self
            .http
            .post(format!("{}/api/v1/checkin/complete", self.base_url))
            .json(req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CheckInError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompleteCheckInRequest {
        CompleteCheckInRequest {
            check_in_id: "CI_42".to_string(),
            passenger_id: "P777".to_string(),
            seat_id: "12A".to_string(),
            baggage: Baggage {
                count: 1,
                weights: Some(vec![18.5]),
            },
        }
    }

    #[tokio::test]
    async fn parses_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/checkin/complete"))
            .and(body_partial_json(json!({"checkInId": "CI_42", "seatId": "12A"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "COMPLETED",
                "boardingPass": { "seatNumber": "12A", "boardingGroup": "B" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CheckInClient::new(&server.uri(), Duration::from_secs(2));
        let response = client.complete_check_in(&request()).await.unwrap();

        assert_eq!(response.state, "COMPLETED");
        let pass = response.boarding_pass.expect("boarding pass");
        assert_eq!(pass["seatNumber"], "12A");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/checkin/complete"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = CheckInClient::new(&server.uri(), Duration::from_secs(2));
        let err = client.complete_check_in(&request()).await.unwrap_err();

        assert!(matches!(
            err,
            CheckInError::Status(status) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn slow_service_hits_the_client_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/checkin/complete"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"state": "COMPLETED"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = CheckInClient::new(&server.uri(), Duration::from_millis(200));
        let err = client.complete_check_in(&request()).await.unwrap_err();

        match err {
            CheckInError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
