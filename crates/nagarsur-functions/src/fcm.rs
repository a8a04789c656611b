//! Push gateway over the FCM legacy HTTP endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use nagarsur_types::push::{Notification, PushResult};
use nagarsur_types::{PushError, PushGateway, PushPayload, PushResponse};

pub const DEFAULT_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

#[derive(Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    notification: &'a Notification,
    data: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    multicast_id: Option<i64>,
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<PushResult>,
}

pub struct FcmClient {
    http: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmClient {
    pub fn new(server_key: String, endpoint: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            server_key,
        }
    }
}

#[async_trait]
impl PushGateway for FcmClient {
    async fn send_to_device(&self, token: &str, payload: &PushPayload) -> Result<PushResponse, PushError> {
        let body = SendRequest {
            to: token,
            notification: &payload.notification,
            data: &payload.data,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| PushError::Decode(e.to_string()))?;
        debug!("FCM accepted push, multicast id {:?}", parsed.multicast_id);

        Ok(PushResponse {
            multicast_id: parsed.multicast_id,
            success_count: parsed.success,
            failure_count: parsed.failure,
            results: parsed.results,
        })
    }
}

/// Stand-in used when no server key is configured. Every send fails, which
/// the reactions log and move past.
pub struct DisabledPush;

#[async_trait]
impl PushGateway for DisabledPush {
    async fn send_to_device(&self, _token: &str, _payload: &PushPayload) -> Result<PushResponse, PushError> {
        Err(PushError::NotConfigured)
    }
}
