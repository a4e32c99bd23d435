//! Database operations for the wallet service.
//!
//! The customer/loyalty store is an external collaborator: the wallet core
//! only talks to it through the narrow [`CustomerStore`] and
//! [`RegistrationStore`] traits. The `PostgreSQL` implementations here are
//! the production backend; tests inject the in-memory doubles from
//! [`memory`].
//!
//! ## Tables
//!
//! - `customer` - loyalty record plus mirrored wallet-linkage fields
//! - `device_registration` - one row per (device, pass type, serial) tuple
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/server/migrations/` and run on
//! startup via [`run_migrations`].

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod customers;
pub mod registrations;

#[cfg(test)]
pub mod memory;

pub use customers::{CustomerStore, PgCustomerStore};
pub use registrations::{PgRegistrationStore, RegistrationStore};

/// Errors from the store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row violates a model invariant.
    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
