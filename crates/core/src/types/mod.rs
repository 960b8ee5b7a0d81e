//! Core types for Green Canopy.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;

pub use cart::CartEntry;
pub use id::*;
pub use identity::IdentityState;
pub use price::Price;
pub use product::ProductSnapshot;
