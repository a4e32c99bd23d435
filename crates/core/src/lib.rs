//! Glowpass Core - Shared types library.
//!
//! This crate provides common types used across the Glowpass components:
//! - `server` - Wallet web service and pass builder
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for wallet identifiers and reward progress

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
