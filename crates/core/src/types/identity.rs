//! Identity state for cart scoping.

use serde::{Deserialize, Serialize};

use crate::types::id::UserId;

/// The current authenticated identity, as reported by the identity provider.
///
/// Identity is a tri-state: until the provider finishes its initial
/// resolution the cart has no key space at all and suspends every
/// operation, rather than reading or writing the wrong user's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IdentityState {
    /// The identity provider has not yet resolved the session.
    #[default]
    Resolving,
    /// No authenticated user.
    Guest,
    /// Authenticated as the given user.
    User(UserId),
}

impl IdentityState {
    /// The storage key for this identity's cart, or `None` while resolving.
    ///
    /// A pure function of the identity: key spaces are fully disjoint and
    /// carts are never merged across identities.
    #[must_use]
    pub fn storage_key(&self) -> Option<String> {
        match self {
            Self::Resolving => None,
            Self::Guest => Some("cart:guest".to_string()),
            Self::User(id) => Some(format!("cart:user:{id}")),
        }
    }

    /// Whether the identity provider has finished resolving.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Resolving)
    }
}
