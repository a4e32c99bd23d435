//! In-memory store doubles for tests.
//!
//! These implement the same traits as the `PostgreSQL` stores and are
//! injected through [`crate::state::AppState::from_parts`].

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId};

use super::{CustomerStore, RegistrationStore, StoreError};
use crate::models::{Customer, DeviceRegistration, WalletLink};

/// In-memory customer store.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: Mutex<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerStore {
    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let store = Self::default();
        {
            let mut map = store.customers.lock().unwrap();
            for customer in customers {
                map.insert(customer.id.clone(), customer);
            }
        }
        store
    }

    /// Snapshot a customer for assertions.
    pub fn snapshot(&self, id: &CustomerId) -> Option<Customer> {
        self.customers.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn get(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.customers.lock().unwrap().get(id).cloned())
    }

    async fn upsert(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut map = self.customers.lock().unwrap();
        match map.get_mut(&customer.id) {
            Some(existing) => {
                // Business fields only; linkage and last_pass_update are
                // owned by the registry/dispatcher.
                existing.name.clone_from(&customer.name);
                existing.email.clone_from(&customer.email);
                existing.visits = customer.visits;
                existing.next_reward.clone_from(&customer.next_reward);
                existing
                    .redeemed_rewards
                    .clone_from(&customer.redeemed_rewards);
            }
            None => {
                // New rows start unlinked, as in the production store:
                // upsert never writes linkage or the watermark.
                let stored = Customer {
                    wallet_link: None,
                    last_pass_update: None,
                    ..customer.clone()
                };
                map.insert(customer.id.clone(), stored);
            }
        }
        Ok(())
    }

    async fn set_wallet_link(&self, id: &CustomerId, link: &WalletLink) -> Result<(), StoreError> {
        if let Some(customer) = self.customers.lock().unwrap().get_mut(id) {
            customer.wallet_link = Some(link.clone());
        }
        Ok(())
    }

    async fn clear_wallet_link(
        &self,
        id: &CustomerId,
        device: &DeviceLibraryId,
    ) -> Result<(), StoreError> {
        if let Some(customer) = self.customers.lock().unwrap().get_mut(id)
            && customer
                .wallet_link
                .as_ref()
                .is_some_and(|link| &link.device_library_id == device)
        {
            customer.wallet_link = None;
        }
        Ok(())
    }

    async fn touch_last_pass_update(
        &self,
        id: &CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(customer) = self.customers.lock().unwrap().get_mut(id) {
            customer.last_pass_update = Some(at);
        }
        Ok(())
    }
}

type RegistrationKey = (DeviceLibraryId, PassTypeId, CustomerId);

/// In-memory registration store.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    registrations: Mutex<HashMap<RegistrationKey, DeviceRegistration>>,
}

impl InMemoryRegistrationStore {
    /// Number of stored registrations.
    pub fn len(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn upsert(&self, registration: &DeviceRegistration) -> Result<(), StoreError> {
        let key = (
            registration.device_library_id.clone(),
            registration.pass_type_id.clone(),
            registration.serial_number.clone(),
        );
        self.registrations
            .lock()
            .unwrap()
            .insert(key, registration.clone());
        Ok(())
    }

    async fn delete(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
        serial: &CustomerId,
    ) -> Result<(), StoreError> {
        let key = (device.clone(), pass_type.clone(), serial.clone());
        self.registrations.lock().unwrap().remove(&key);
        Ok(())
    }

    async fn serials_for_device(
        &self,
        device: &DeviceLibraryId,
        pass_type: &PassTypeId,
    ) -> Result<Vec<CustomerId>, StoreError> {
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .values()
            .filter(|reg| &reg.device_library_id == device && &reg.pass_type_id == pass_type)
            .map(|reg| reg.serial_number.clone())
            .collect())
    }

    async fn latest_for_serial(
        &self,
        serial: &CustomerId,
    ) -> Result<Option<DeviceRegistration>, StoreError> {
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .values()
            .filter(|reg| &reg.serial_number == serial)
            .max_by_key(|reg| reg.last_updated)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use glowpass_core::PushToken;

    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_upsert_never_writes_linkage_on_insert() {
        let store = InMemoryCustomerStore::default();

        let mut customer = testing::customer("C1", 2);
        customer.wallet_link = Some(WalletLink {
            push_token: PushToken::new("tok"),
            pass_type_id: PassTypeId::new("pass.com.glowpass"),
            device_library_id: DeviceLibraryId::new("device-1"),
        });
        customer.last_pass_update = Some(Utc::now());

        store.upsert(&customer).await.unwrap();

        let stored = store.snapshot(&customer.id).unwrap();
        assert!(stored.wallet_link.is_none());
        assert!(stored.last_pass_update.is_none());
        assert_eq!(stored.visits, 2);
    }

    #[tokio::test]
    async fn test_upsert_preserves_linkage_on_update() {
        let store = InMemoryCustomerStore::with_customers(vec![testing::customer("C1", 2)]);
        let id = CustomerId::new("C1");
        let link = WalletLink {
            push_token: PushToken::new("tok"),
            pass_type_id: PassTypeId::new("pass.com.glowpass"),
            device_library_id: DeviceLibraryId::new("device-1"),
        };
        store.set_wallet_link(&id, &link).await.unwrap();

        store.upsert(&testing::customer("C1", 3)).await.unwrap();

        let stored = store.snapshot(&id).unwrap();
        assert_eq!(stored.visits, 3);
        assert_eq!(stored.wallet_link, Some(link));
    }
}
