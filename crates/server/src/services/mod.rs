//! Wallet-protocol services: the registration registry and the update
//! notification dispatcher.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{NotifyError, NotifyOutcome, UpdateDispatcher};
pub use registry::{ListOutcome, RegisterOutcome, RegistrationRegistry, RegistryError};
