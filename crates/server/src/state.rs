//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WalletConfig;
use crate::db::{CustomerStore, PgCustomerStore, PgRegistrationStore, RegistrationStore};
use crate::pass::{OpensslCliSigner, PassBuilder, ZipArchiver};
use crate::push::{ApnsClient, PushError, PushSender};
use crate::services::{RegistrationRegistry, UpdateDispatcher};

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("push client error: {0}")]
    Push(#[from] PushError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores, the pass builder, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WalletConfig,
    pool: Option<PgPool>,
    builder: Arc<PassBuilder>,
    customers: Arc<dyn CustomerStore>,
    registry: RegistrationRegistry,
    dispatcher: UpdateDispatcher,
}

impl AppState {
    /// Create the production state: `PostgreSQL` stores, the `openssl`
    /// signer, and the APNs client, all wired from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the push client cannot load its credentials.
    pub fn new(config: WalletConfig, pool: PgPool) -> Result<Self, StateError> {
        let customers: Arc<dyn CustomerStore> = Arc::new(PgCustomerStore::new(pool.clone()));
        let registrations: Arc<dyn RegistrationStore> =
            Arc::new(PgRegistrationStore::new(pool.clone()));

        let signer = Arc::new(OpensslCliSigner::from_config(&config.pass));
        let builder = Arc::new(PassBuilder::new(
            config.pass.clone(),
            &config.base_url,
            signer,
            Arc::new(ZipArchiver),
        ));
        let push: Arc<dyn PushSender> = Arc::new(ApnsClient::new(&config.apns, &config.pass)?);

        Ok(Self::assemble(
            config,
            Some(pool),
            customers,
            registrations,
            builder,
            push,
        ))
    }

    /// Assemble state from pre-built parts. Used by tests to inject
    /// in-memory stores and fake signers/senders.
    pub fn from_parts(
        config: WalletConfig,
        customers: Arc<dyn CustomerStore>,
        registrations: Arc<dyn RegistrationStore>,
        builder: Arc<PassBuilder>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self::assemble(config, None, customers, registrations, builder, push)
    }

    fn assemble(
        config: WalletConfig,
        pool: Option<PgPool>,
        customers: Arc<dyn CustomerStore>,
        registrations: Arc<dyn RegistrationStore>,
        builder: Arc<PassBuilder>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        let registry = RegistrationRegistry::new(
            customers.clone(),
            registrations.clone(),
            builder.clone(),
        );
        let dispatcher =
            UpdateDispatcher::new(customers.clone(), registrations, builder.clone(), push);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                builder,
                customers,
                registry,
                dispatcher,
            }),
        }
    }

    /// Get a reference to the wallet configuration.
    #[must_use]
    pub fn config(&self) -> &WalletConfig {
        &self.inner.config
    }

    /// Get the database connection pool, if the state is backed by one.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the pass builder.
    #[must_use]
    pub fn builder(&self) -> &Arc<PassBuilder> {
        &self.inner.builder
    }

    /// Get a reference to the customer store.
    #[must_use]
    pub fn customers(&self) -> &Arc<dyn CustomerStore> {
        &self.inner.customers
    }

    /// Get a reference to the registration registry.
    #[must_use]
    pub fn registry(&self) -> &RegistrationRegistry {
        &self.inner.registry
    }

    /// Get a reference to the update dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &UpdateDispatcher {
        &self.inner.dispatcher
    }
}
