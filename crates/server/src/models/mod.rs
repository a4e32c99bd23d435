//! Domain models for the wallet service.

pub mod customer;
pub mod registration;

pub use customer::{Customer, WalletLink};
pub use registration::DeviceRegistration;
