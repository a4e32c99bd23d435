//! Wallet device-registration protocol handlers.
//!
//! The wallet client authenticates the register, unregister, and pass
//! endpoints with `Authorization: ApplePass <token>`. An invalid or missing
//! token is always 401, whether or not the pass exists; auth never leaks
//! existence.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId, PushToken};

use crate::error::{AppError, ProtocolError};
use crate::services::{ListOutcome, RegisterOutcome};
use crate::state::AppState;

/// Bearer scheme the wallet client uses.
const AUTH_SCHEME: &str = "ApplePass";

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub push_token: PushToken,
}

/// Query parameters for the updated-serials poll.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub passes_updated_since: Option<String>,
}

/// Extract the token from an `ApplePass` authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(AUTH_SCHEME) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Check the header token against the serial's derived token.
fn authorized(state: &AppState, headers: &HeaderMap, serial: &CustomerId) -> bool {
    bearer_token(headers).is_some_and(|token| state.registry().verify_token(serial, token))
}

/// POST /v1/devices/{device}/registrations/{passType}/{serial}
///
/// 201 on registration (idempotent: re-registering with a new token rotates
/// it in place), 404 for an unknown serial, 401 on bad auth.
#[instrument(skip_all, fields(device = %device, serial = %serial))]
pub async fn register(
    State(state): State<AppState>,
    Path((device, pass_type, serial)): Path<(DeviceLibraryId, PassTypeId, CustomerId)>,
    headers: HeaderMap,
    Json(body): Json<RegisterBody>,
) -> Result<StatusCode, ProtocolError> {
    if !authorized(&state, &headers, &serial) {
        return Ok(StatusCode::UNAUTHORIZED);
    }

    let outcome = state
        .registry()
        .register(&device, &pass_type, &serial, body.push_token)
        .await?;

    Ok(match outcome {
        RegisterOutcome::Registered => StatusCode::CREATED,
        RegisterOutcome::SerialNotFound => StatusCode::NOT_FOUND,
    })
}

/// DELETE /v1/devices/{device}/registrations/{passType}/{serial}
///
/// Always 200 on valid auth; unregistering an unknown registration is not
/// an error.
#[instrument(skip_all, fields(device = %device, serial = %serial))]
pub async fn unregister(
    State(state): State<AppState>,
    Path((device, pass_type, serial)): Path<(DeviceLibraryId, PassTypeId, CustomerId)>,
    headers: HeaderMap,
) -> Result<StatusCode, ProtocolError> {
    if !authorized(&state, &headers, &serial) {
        return Ok(StatusCode::UNAUTHORIZED);
    }

    state
        .registry()
        .unregister(&device, &pass_type, &serial)
        .await?;
    Ok(StatusCode::OK)
}

/// GET /v1/devices/{device}/registrations/{passType}?passesUpdatedSince=...
///
/// Unauthenticated per the protocol: the response only names serials the
/// device itself registered. 200 with the serial list, 204 when nothing
/// changed, 404 for a device with no registrations.
#[instrument(skip_all, fields(device = %device))]
pub async fn list_updated(
    State(state): State<AppState>,
    Path((device, pass_type)): Path<(DeviceLibraryId, PassTypeId)>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ProtocolError> {
    let since = match query.passes_updated_since {
        Some(raw) => Some(parse_since(&raw)?),
        None => None,
    };

    let outcome = state
        .registry()
        .list_updated_serials(&device, &pass_type, since)
        .await?;

    Ok(match outcome {
        ListOutcome::DeviceNotRegistered => StatusCode::NOT_FOUND.into_response(),
        ListOutcome::NoMatches => StatusCode::NO_CONTENT.into_response(),
        ListOutcome::Updates {
            serial_numbers,
            last_updated,
        } => Json(serde_json::json!({
            "serialNumbers": serial_numbers,
            "lastUpdated": last_updated.to_rfc3339(),
        }))
        .into_response(),
    })
}

/// GET /v1/passes/{passType}/{serial}
///
/// Rebuilds the container from the current customer state and serves it;
/// never a stale cached file.
#[instrument(skip_all, fields(serial = %serial))]
pub async fn latest_pass(
    State(state): State<AppState>,
    Path((pass_type, serial)): Path<(PassTypeId, CustomerId)>,
    headers: HeaderMap,
) -> Result<Response, ProtocolError> {
    if !authorized(&state, &headers, &serial) {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    // This service issues exactly one pass type.
    if &pass_type != state.builder().pass_type_id() {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let Some(artifact) = state.registry().fetch_latest_pass(&serial).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let bytes = tokio::fs::read(&artifact.path)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read built pass: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/vnd.apple.pkpass".to_owned()),
            (header::LAST_MODIFIED, http_date(artifact.built_at)),
        ],
        bytes,
    )
        .into_response())
}

/// POST /v1/log
///
/// Relay of wallet-client error logs. Always 200; the body is logged as-is.
pub async fn device_log(Json(body): Json<serde_json::Value>) -> StatusCode {
    if let Some(entries) = body.get("logs").and_then(|v| v.as_array()) {
        for entry in entries {
            tracing::info!(entry = %entry, "wallet client log");
        }
    } else {
        tracing::info!(body = %body, "wallet client log");
    }
    StatusCode::OK
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::BadRequest(format!("invalid passesUpdatedSince: {e}")))
}

/// RFC 7231 HTTP-date (IMF-fixdate) for the `Last-Modified` header.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
