//! APNs client for silent pass-refresh pushes.
//!
//! Authenticates with mutual TLS using the same pass certificate and key
//! that sign the bundles; the connection is reused across sends by the
//! underlying pool.

use async_trait::async_trait;
use serde::Deserialize;

use glowpass_core::{PassTypeId, PushToken};

use super::{PushError, PushSender};
use crate::config::{ApnsConfig, PassConfig};

/// Gateway rejection reasons that condemn the token itself.
const TOKEN_REJECTIONS: [&str; 3] = ["BadDeviceToken", "Unregistered", "DeviceTokenNotForTopic"];

/// Error body returned by the gateway on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApnsErrorBody {
    reason: String,
}

/// APNs HTTP/2 client.
#[derive(Clone)]
pub struct ApnsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ApnsClient {
    /// Create a client with the pass certificate/key as TLS identity.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Credentials` if the key material cannot be read,
    /// or `PushError::Http` if the HTTP client fails to build.
    pub fn new(config: &ApnsConfig, pass: &PassConfig) -> Result<Self, PushError> {
        let mut pem = std::fs::read(&pass.private_key_path).map_err(|e| {
            PushError::Credentials(format!("{}: {e}", pass.private_key_path.display()))
        })?;
        pem.extend(std::fs::read(&pass.certificate_path).map_err(|e| {
            PushError::Credentials(format!("{}: {e}", pass.certificate_path.display()))
        })?);
        let identity = reqwest::Identity::from_pem(&pem)?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(config.push_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl PushSender for ApnsClient {
    async fn send_silent(&self, token: &PushToken, topic: &PassTypeId) -> Result<(), PushError> {
        let url = format!("{}/3/device/{}", self.endpoint, token);

        let response = self
            .client
            .post(&url)
            .header("apns-topic", topic.as_str())
            .header("apns-push-type", "background")
            .header("apns-priority", "5")
            .json(&serde_json::json!({ "aps": { "content-available": 1 } }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(topic = %topic, "silent push accepted");
            return Ok(());
        }

        let reason = response
            .json::<ApnsErrorBody>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.reason);

        Err(classify_failure(status.as_u16(), reason))
    }
}

/// Map a gateway rejection to the error taxonomy: token-condemning reasons
/// are terminal for the token, everything else is a gateway error.
fn classify_failure(status: u16, reason: String) -> PushError {
    if TOKEN_REJECTIONS.contains(&reason.as_str()) {
        PushError::InvalidToken { reason }
    } else {
        PushError::Gateway { status, reason }
    }
}
