//! Update dispatcher: mark a customer's pass as changed and nudge the
//! registered device with a silent push.
//!
//! The update watermark is advanced before the push is attempted. The push
//! only tells the device to poll; if delivery fails, the next poll (or the
//! next notify) still sees the new watermark, so an update is delayed but
//! never lost.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use glowpass_core::{CustomerId, PushToken};

use crate::db::{CustomerStore, RegistrationStore, StoreError};
use crate::models::{Customer, WalletLink};
use crate::pass::{BuildError, PassBuilder};
use crate::push::PushSender;

/// Errors from the notify flow.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("pass rebuild failed: {0}")]
    Build(#[from] BuildError),
}

/// Result of a notify call for a customer that exists.
#[derive(Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Watermark advanced, container rebuilt, push accepted.
    Delivered,
    /// No device is registered and no token is mirrored; nothing was changed.
    NoPushTarget,
    /// Watermark advanced and container rebuilt, but the gateway refused the
    /// push. The device picks the update up on its next poll.
    DeliveryFailed { reason: String },
}

/// Drives the pass-update flow after a loyalty change.
pub struct UpdateDispatcher {
    customers: Arc<dyn CustomerStore>,
    registrations: Arc<dyn RegistrationStore>,
    builder: Arc<PassBuilder>,
    push: Arc<dyn PushSender>,
}

impl UpdateDispatcher {
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        registrations: Arc<dyn RegistrationStore>,
        builder: Arc<PassBuilder>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            customers,
            registrations,
            builder,
            push,
        }
    }

    /// Notify the customer's registered device that its pass changed.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the customer is unknown, a store access
    /// fails, or the rebuild fails. Push delivery failure is not an error;
    /// it surfaces as [`NotifyOutcome::DeliveryFailed`].
    pub async fn notify_update(&self, id: &CustomerId) -> Result<NotifyOutcome, NotifyError> {
        let customer = self
            .customers
            .get(id)
            .await?
            .ok_or_else(|| NotifyError::CustomerNotFound(id.clone()))?;

        let Some(token) = self.resolve_push_target(&customer).await? else {
            tracing::info!(customer = %id, "no push target, skipping notify");
            return Ok(NotifyOutcome::NoPushTarget);
        };

        // Watermark first. The device's poll compares against this value, so
        // it must be on disk before the gateway can trigger a poll.
        self.customers.touch_last_pass_update(id, Utc::now()).await?;
        let refreshed = self
            .customers
            .get(id)
            .await?
            .ok_or_else(|| NotifyError::CustomerNotFound(id.clone()))?;

        let artifact = self.builder.build(&refreshed).await?;
        tracing::debug!(customer = %id, file = %artifact.file_name, "rebuilt for notify");

        match self
            .push
            .send_silent(&token, self.builder.pass_type_id())
            .await
        {
            Ok(()) => {
                tracing::info!(customer = %id, "update push delivered");
                Ok(NotifyOutcome::Delivered)
            }
            Err(err) => {
                tracing::warn!(customer = %id, error = %err, "update push failed");
                Ok(NotifyOutcome::DeliveryFailed {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Pick the push token to use, repairing mirror drift along the way.
    ///
    /// The registry's copy is authoritative: when a registration exists, its
    /// token wins, and a stale customer mirror is rewritten to match. The
    /// mirror is only trusted on its own when no registration is found.
    async fn resolve_push_target(
        &self,
        customer: &Customer,
    ) -> Result<Option<PushToken>, StoreError> {
        if let Some(registration) = self.registrations.latest_for_serial(&customer.id).await? {
            let link = WalletLink {
                push_token: registration.push_token.clone(),
                pass_type_id: registration.pass_type_id.clone(),
                device_library_id: registration.device_library_id.clone(),
            };
            if customer.wallet_link.as_ref() != Some(&link) {
                tracing::warn!(customer = %customer.id, "wallet link drifted, repairing mirror");
                self.customers.set_wallet_link(&customer.id, &link).await?;
            }
            return Ok(Some(registration.push_token));
        }

        Ok(customer.push_token().cloned())
    }
}
