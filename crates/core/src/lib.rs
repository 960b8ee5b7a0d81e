//! Green Canopy Core - Shared types library.
//!
//! This crate provides common types used across all Green Canopy components:
//! - `cart` - Cart reconciliation engine
//! - `integration-tests` - End-to-end engine scenarios
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices, plus the
//!   cart entry, product snapshot, and identity domain types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
