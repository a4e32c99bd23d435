//! Glowpass server library.
//!
//! This crate provides the wallet pass service as a library, allowing it to
//! be tested and reused. The binary in `main.rs` is a thin bootstrap.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pass;
pub mod push;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
