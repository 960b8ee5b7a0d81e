//! Green Canopy Cart - client-side cart reconciliation engine.
//!
//! The cart keeps a minimal durable representation (product ID + quantity)
//! in a key-value store scoped to the current identity, resolves full
//! product details through an asynchronous catalog lookup, and reconciles
//! stored quantities against the stock levels those details report.
//!
//! # Architecture
//!
//! - [`storage`] - The [`CartStorage`] seam for durable key-value storage,
//!   plus the bundled [`MemoryStorage`] backend
//! - [`catalog`] - The [`ProductLookup`] seam and the session-scoped
//!   snapshot cache with its generation counter
//! - [`reconcile`] - The pure stock-clamping pass
//! - [`context`] - [`CartContext`], the public engine object
//!
//! Data flows one way: entry mutations persist the minimal list, the
//! detail cache resolves whatever the list references, and the reconciler
//! reacts to cache changes only. The reconciler never reacts to its own
//! entry writes, which is what keeps the loop from feeding back.
//!
//! Nothing in the engine is fatal. Corrupt storage loads as an empty cart,
//! failed product fetches cache a discontinued placeholder, and quantities
//! above stock are clamped silently. The public API is infallible; errors
//! exist only at the collaborator seams.
//!
//! # Example
//!
//! ```rust,ignore
//! use green_canopy_cart::{CartContext, MemoryStorage};
//! use green_canopy_core::IdentityState;
//!
//! let cart = CartContext::new(MemoryStorage::new(), catalog);
//! cart.set_identity(IdentityState::Guest).await;
//! cart.add_to_cart(&product, 2).await;
//! cart.resolve_details().await;
//! let total = cart.cart_total().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod context;
pub mod error;
pub mod reconcile;
pub mod storage;

pub use catalog::ProductLookup;
pub use context::{CartContext, CartEvent, CartItem, SubscriptionId};
pub use error::{LookupError, StorageError};
pub use storage::{CartStorage, MemoryStorage};
