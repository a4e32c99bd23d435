//! Management API handlers: pass generation and update notification.
//!
//! These sit behind `/api` for the loyalty backend, not the wallet client.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use glowpass_core::CustomerId;

use crate::error::AppError;
use crate::models::Customer;
use crate::services::NotifyOutcome;
use crate::state::AppState;

/// Response for a generated pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Download URL for the built container.
    pub pass_url: String,
    pub serial_number: CustomerId,
}

/// Request body for a notify call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyBody {
    pub customer_id: CustomerId,
}

/// Response for a notify call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// POST /api/passes/generate
///
/// Upserts the customer's business fields and builds a fresh container.
/// Wallet linkage and the update watermark on an existing record are left
/// untouched; only the registration flow writes those.
#[instrument(skip_all, fields(customer = %customer.id))]
pub async fn generate(
    State(state): State<AppState>,
    Json(customer): Json<Customer>,
) -> Result<Json<GenerateResponse>, AppError> {
    if customer.id.as_str().is_empty() {
        return Err(AppError::BadRequest("customer id must not be empty".into()));
    }

    state.customers().upsert(&customer).await?;
    let artifact = state.builder().build(&customer).await?;

    let pass_url = format!(
        "{}/passes/{}",
        state.config().base_url.trim_end_matches('/'),
        artifact.file_name
    );
    Ok(Json(GenerateResponse {
        pass_url,
        serial_number: customer.id,
    }))
}

/// POST /api/passes/notify
///
/// Marks the customer's pass as updated and sends the silent push. Delivery
/// failure is reported in the response body, not as an HTTP error; the
/// update itself has already been recorded.
#[instrument(skip_all, fields(customer = %body.customer_id))]
pub async fn notify(
    State(state): State<AppState>,
    Json(body): Json<NotifyBody>,
) -> Result<Json<NotifyResponse>, AppError> {
    let outcome = state.dispatcher().notify_update(&body.customer_id).await?;

    let response = match outcome {
        NotifyOutcome::Delivered => NotifyResponse {
            status: "delivered",
            reason: None,
        },
        NotifyOutcome::NoPushTarget => NotifyResponse {
            status: "noPushTarget",
            reason: None,
        },
        NotifyOutcome::DeliveryFailed { reason } => NotifyResponse {
            status: "deliveryFailed",
            reason: Some(reason),
        },
    };
    Ok(Json(response))
}
