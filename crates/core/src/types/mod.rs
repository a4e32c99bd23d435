//! Core types for Glowpass.
//!
//! This module provides type-safe wrappers for the wallet protocol's
//! identifier vocabulary and the loyalty program's reward progress.

pub mod id;
pub mod progress;

pub use id::*;
pub use progress::RewardProgress;
