//! HTTP route handlers for the wallet service.
//!
//! # Route Structure
//!
//! ```text
//! # Wallet device-registration protocol (bearer-authenticated)
//! POST   /v1/devices/{device}/registrations/{passType}/{serial} - Register device
//! DELETE /v1/devices/{device}/registrations/{passType}/{serial} - Unregister device
//! GET    /v1/devices/{device}/registrations/{passType}          - Updated serials
//! GET    /v1/passes/{passType}/{serial}                         - Latest pass bundle
//! POST   /v1/log                                                - Device log relay
//!
//! # Management API (CORS-enabled)
//! POST /api/passes/generate - Upsert customer and build a pass
//! POST /api/passes/notify   - Push a silent update to a customer's device
//! ```
//!
//! The wallet-protocol handlers answer with bare status codes; the client
//! only interprets 200/201/204/401/404, never a response body shape beyond
//! the documented JSON for the list and pass endpoints.

pub mod passes;
pub mod wallet;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Create the wallet device-registration protocol router.
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/devices/{device}/registrations/{pass_type}/{serial}",
            post(wallet::register).delete(wallet::unregister),
        )
        .route(
            "/devices/{device}/registrations/{pass_type}",
            get(wallet::list_updated),
        )
        .route("/passes/{pass_type}/{serial}", get(wallet::latest_pass))
        .route("/log", post(wallet::device_log))
}

/// Create the management API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/passes/generate", post(passes::generate))
        .route("/passes/notify", post(passes::notify))
        .layer(CorsLayer::permissive())
}

/// Create all routes for the wallet service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/v1", wallet_routes())
        .nest("/api", api_routes())
}
