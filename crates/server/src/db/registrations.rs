//! Device registration store keyed by the composite protocol identity.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId, PushToken};

use super::StoreError;
use crate::models::DeviceRegistration;

/// Persistence for device registrations.
///
/// Identity is `(device_library_id, pass_type_id, serial_number)`; upserting
/// the same identity overwrites the push token and `last_updated` rather than
/// creating a duplicate.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Idempotent upsert by composite identity.
    async fn upsert(&self, registration: &DeviceRegistration) -> Result<(), StoreError>;

    /// Delete one registration; deleting a missing row is not an error.
    async fn delete(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
        serial: &CustomerId,
    ) -> Result<(), StoreError>;

    /// Serial numbers this device is registered for, scoped to one pass type.
    async fn serials_for_device(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
    ) -> Result<Vec<CustomerId>, StoreError>;

    /// Most recently updated registration for a serial, across devices.
    ///
    /// The dispatcher uses this as the authoritative push-token source when
    /// the customer record's mirror is missing or stale.
    async fn latest_for_serial(
        &self,
        serial: &CustomerId,
    ) -> Result<Option<DeviceRegistration>, StoreError>;
}

/// `PostgreSQL`-backed registration store.
#[derive(Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    /// Create a new registration store on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn upsert(&self, registration: &DeviceRegistration) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO device_registration
                (device_library_id, pass_type_id, serial_number, push_token, last_updated)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (device_library_id, pass_type_id, serial_number) DO UPDATE SET
                push_token = EXCLUDED.push_token,
                last_updated = EXCLUDED.last_updated
            ",
        )
        .bind(registration.device_library_id.as_str())
        .bind(registration.pass_type_id.as_str())
        .bind(registration.serial_number.as_str())
        .bind(registration.push_token.as_str())
        .bind(registration.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
        serial: &CustomerId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            DELETE FROM device_registration
            WHERE device_library_id = $1 AND pass_type_id = $2 AND serial_number = $3
            ",
        )
        .bind(device.as_str())
        .bind(pass_type.as_str())
        .bind(serial.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn serials_for_device(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
    ) -> Result<Vec<CustomerId>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT serial_number
            FROM device_registration
            WHERE device_library_id = $1 AND pass_type_id = $2
            ",
        )
        .bind(device.as_str())
        .bind(pass_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let serial: String = row.try_get("serial_number")?;
                Ok(CustomerId::new(serial))
            })
            .collect()
    }

    async fn latest_for_serial(
        &self,
        serial: &CustomerId,
    ) -> Result<Option<DeviceRegistration>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT device_library_id, pass_type_id, serial_number, push_token, last_updated
            FROM device_registration
            WHERE serial_number = $1
            ORDER BY last_updated DESC
            LIMIT 1
            ",
        )
        .bind(serial.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(registration_from_row).transpose()
    }
}

fn registration_from_row(row: &PgRow) -> Result<DeviceRegistration, StoreError> {
    let device: String = row.try_get("device_library_id")?;
    let pass_type: String = row.try_get("pass_type_id")?;
    let serial: String = row.try_get("serial_number")?;
    let token: String = row.try_get("push_token")?;

    Ok(DeviceRegistration {
        device_library_id: DeviceLibraryId::new(device),
        pass_type_id: PassTypeId::new(pass_type),
        serial_number: CustomerId::new(serial),
        push_token: PushToken::new(token),
        last_updated: row.try_get("last_updated")?,
    })
}
