//! Device Registration Registry: the four wallet-protocol operations.
//!
//! Registrations are keyed by the composite `(device, passType, serial)`
//! identity — a device may hold several passes, so a bare device key would
//! silently drop all but one of them. Re-registration is an idempotent
//! upsert; push-token rotation overwrites in place.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId, PushToken};

use crate::db::{CustomerStore, RegistrationStore, StoreError};
use crate::models::{DeviceRegistration, WalletLink};
use crate::pass::{BuildError, PassArtifact, PassBuilder, authentication_token};

/// Errors from registry operations that involve more than the stores.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("pass rebuild failed: {0}")]
    Build(#[from] BuildError),
}

/// Result of a register call.
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Upserted; also covers re-registration with a rotated token.
    Registered,
    /// The serial does not correspond to any customer; no dangling
    /// registration is created.
    SerialNotFound,
}

/// Result of a list-updated-serials call.
#[derive(Debug, PartialEq, Eq)]
pub enum ListOutcome {
    /// The device has no registration at all for this pass type.
    DeviceNotRegistered,
    /// Registered, but nothing changed since the given watermark.
    NoMatches,
    /// Serials with newer pass content, plus the new watermark.
    Updates {
        serial_numbers: Vec<CustomerId>,
        last_updated: DateTime<Utc>,
    },
}

/// The registration registry service.
pub struct RegistrationRegistry {
    customers: Arc<dyn CustomerStore>,
    registrations: Arc<dyn RegistrationStore>,
    builder: Arc<PassBuilder>,
}

impl RegistrationRegistry {
    /// Create a registry over injected stores and the pass builder.
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        registrations: Arc<dyn RegistrationStore>,
        builder: Arc<PassBuilder>,
    ) -> Self {
        Self {
            customers,
            registrations,
            builder,
        }
    }

    /// Validate a presented bearer token against the serial's derived token.
    ///
    /// Pure derivation, no store access: the result is identical whether or
    /// not the serial exists, so an auth failure leaks nothing.
    #[must_use]
    pub fn verify_token(&self, serial: &CustomerId, presented: &str) -> bool {
        presented == authentication_token(self.builder.pass_type_id(), serial)
    }

    /// Register a device's interest in a pass.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the registration upsert fails. The mirror
    /// write onto the customer record is best-effort and only logged.
    pub async fn register(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
        serial: &CustomerId,
        push_token: PushToken,
    ) -> Result<RegisterOutcome, StoreError> {
        if self.customers.get(serial).await?.is_none() {
            tracing::warn!(serial = %serial, "registration for unknown serial");
            return Ok(RegisterOutcome::SerialNotFound);
        }

        let registration = DeviceRegistration {
            device_library_id: device.clone(),
            pass_type_id: pass_type.clone(),
            serial_number: serial.clone(),
            push_token,
            last_updated: Utc::now(),
        };
        self.registrations.upsert(&registration).await?;

        // Redundant copy for the dispatcher's fallback lookup. The registry
        // row is authoritative, so a failed mirror is drift, not data loss.
        let link = WalletLink {
            push_token: registration.push_token.clone(),
            pass_type_id: pass_type.clone(),
            device_library_id: device.clone(),
        };
        if let Err(err) = self.customers.set_wallet_link(serial, &link).await {
            tracing::warn!(serial = %serial, error = %err, "wallet link mirror failed");
        }

        tracing::info!(device = %device, serial = %serial, "device registered");
        Ok(RegisterOutcome::Registered)
    }

    /// Remove a registration. Idempotent: a missing registration is success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a store write fails.
    pub async fn unregister(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
        serial: &CustomerId,
    ) -> Result<(), StoreError> {
        self.registrations.delete(device, pass_type, serial).await?;
        // Only clears when the mirror still points at this device; another
        // device's linkage is never touched.
        self.customers.clear_wallet_link(serial, device).await?;

        tracing::info!(device = %device, serial = %serial, "device unregistered");
        Ok(())
    }

    /// Serials of this device's passes whose content changed after `since`
    /// (absent `since` means all of them).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a store read fails.
    pub async fn list_updated_serials(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
        since: Option<DateTime<Utc>>,
    ) -> Result<ListOutcome, StoreError> {
        let serials: BTreeSet<CustomerId> = self
            .registrations
            .serials_for_device(device, pass_type)
            .await?
            .into_iter()
            .collect();

        if serials.is_empty() {
            return Ok(ListOutcome::DeviceNotRegistered);
        }

        let mut matched = Vec::new();
        let mut watermark: Option<DateTime<Utc>> = None;
        for serial in serials {
            let Some(customer) = self.customers.get(&serial).await? else {
                continue;
            };
            let include = match (since, customer.last_pass_update) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(since), Some(updated)) => updated > since,
            };
            if include {
                watermark = watermark.max(customer.last_pass_update);
                matched.push(serial);
            }
        }

        if matched.is_empty() {
            return Ok(ListOutcome::NoMatches);
        }

        Ok(ListOutcome::Updates {
            serial_numbers: matched,
            last_updated: watermark.unwrap_or_else(Utc::now),
        })
    }

    /// Rebuild and return the latest container for a serial.
    ///
    /// Always regenerates from the current customer snapshot; this endpoint
    /// never serves a stale cached file.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the store read or the rebuild fails.
    pub async fn fetch_latest_pass(
        &self,
        serial: &CustomerId,
    ) -> Result<Option<PassArtifact>, RegistryError> {
        let Some(customer) = self.customers.get(serial).await? else {
            return Ok(None);
        };
        let artifact = self.builder.build(&customer).await?;
        Ok(Some(artifact))
    }
}
