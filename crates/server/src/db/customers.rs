//! Customer store: the narrow interface the wallet core needs from the
//! external loyalty data store, plus the `PostgreSQL` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId, PushToken};

use super::StoreError;
use crate::models::{Customer, WalletLink};

/// Read/write access to customer records, limited to what the wallet core
/// uses: lookups by serial, payload upserts, and the mirrored linkage fields.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Fetch a customer by id (= pass serial number).
    async fn get(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError>;

    /// Insert or update a customer's business fields.
    ///
    /// Wallet-linkage fields and `last_pass_update` are owned by the registry
    /// and dispatcher; an upsert of an existing row must not clobber them.
    async fn upsert(&self, customer: &Customer) -> Result<(), StoreError>;

    /// Mirror a device registration onto the customer record.
    async fn set_wallet_link(&self, id: &CustomerId, link: &WalletLink) -> Result<(), StoreError>;

    /// Clear the mirrored linkage, but only if it points at `device` —
    /// unregistering one device must never clear another device's linkage.
    async fn clear_wallet_link(
        &self,
        id: &CustomerId,
        device: &DeviceLibraryId,
    ) -> Result<(), StoreError>;

    /// Record that the pass content changed at `at`.
    async fn touch_last_pass_update(
        &self,
        id: &CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// `PostgreSQL`-backed customer store.
#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    /// Create a new customer store on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn get(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, visits, next_reward, redeemed_rewards,
                   push_token, pass_type_id, device_library_id, last_pass_update
            FROM customer
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn upsert(&self, customer: &Customer) -> Result<(), StoreError> {
        let visits = i32::try_from(customer.visits).map_err(|_| {
            StoreError::DataCorruption(format!(
                "visit count {} out of range for customer {}",
                customer.visits, customer.id
            ))
        })?;

        sqlx::query(
            r"
            INSERT INTO customer (id, name, email, visits, next_reward, redeemed_rewards)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                visits = EXCLUDED.visits,
                next_reward = EXCLUDED.next_reward,
                redeemed_rewards = EXCLUDED.redeemed_rewards
            ",
        )
        .bind(customer.id.as_str())
        .bind(&customer.name)
        .bind(customer.email.as_deref())
        .bind(visits)
        .bind(customer.next_reward.as_deref())
        .bind(&customer.redeemed_rewards)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_wallet_link(&self, id: &CustomerId, link: &WalletLink) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE customer
            SET push_token = $2, pass_type_id = $3, device_library_id = $4
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .bind(link.push_token.as_str())
        .bind(link.pass_type_id.as_str())
        .bind(link.device_library_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_wallet_link(
        &self,
        id: &CustomerId,
        device: &DeviceLibraryId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE customer
            SET push_token = NULL, pass_type_id = NULL, device_library_id = NULL
            WHERE id = $1 AND device_library_id = $2
            ",
        )
        .bind(id.as_str())
        .bind(device.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch_last_pass_update(
        &self,
        id: &CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE customer SET last_pass_update = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Map a customer row, reconstructing the all-or-nothing wallet link.
fn customer_from_row(row: &PgRow) -> Result<Customer, StoreError> {
    let id: String = row.try_get("id")?;
    let visits: i32 = row.try_get("visits")?;
    let visits = u32::try_from(visits)
        .map_err(|_| StoreError::DataCorruption(format!("negative visit count for {id}")))?;

    let push_token: Option<String> = row.try_get("push_token")?;
    let pass_type_id: Option<String> = row.try_get("pass_type_id")?;
    let device_library_id: Option<String> = row.try_get("device_library_id")?;
    let wallet_link = match (push_token, pass_type_id, device_library_id) {
        (Some(token), Some(pass_type), Some(device)) => Some(WalletLink {
            push_token: PushToken::new(token),
            pass_type_id: PassTypeId::new(pass_type),
            device_library_id: DeviceLibraryId::new(device),
        }),
        (None, None, None) => None,
        _ => {
            return Err(StoreError::DataCorruption(format!(
                "partial wallet link on customer {id}"
            )));
        }
    };

    Ok(Customer {
        id: CustomerId::new(id),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        visits,
        next_reward: row.try_get("next_reward")?,
        redeemed_rewards: row.try_get("redeemed_rewards")?,
        wallet_link,
        last_pass_update: row.try_get("last_pass_update")?,
    })
}
