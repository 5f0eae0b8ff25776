//! Type-safe identifiers for remote entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Assigned by | Scope |
//! |------|-------------|-------|
//! | [`SessionId`] | Remote end | One Classic session |
//! | [`ElementId`] | Remote end | Elements of one session |
//! | [`BrowsingContextId`] | Remote end | Tabs / windows / frames |
//! | [`InterceptId`] | Remote end | Network intercepts |
//! | [`CommandId`] | Local end | BiDi command correlation |
//! | [`ListenerId`] | Local end | BiDi event listeners |
//! | [`SubscriptionId`] | Local end | Log monitor subscribers |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// String Identifiers (remote end)
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a server-assigned identifier.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id! {
    /// Classic WebDriver session identifier.
    ///
    /// Opaque string returned by the session-creation handshake.
    SessionId
}

string_id! {
    /// Web element reference scoped to a session.
    ///
    /// May go stale at any time; staleness surfaces only as a protocol error.
    ElementId
}

string_id! {
    /// BiDi browsing context (tab, window or frame).
    ///
    /// For top-level contexts this equals the Classic window handle.
    BrowsingContextId
}

string_id! {
    /// Network intercept registered with the remote end.
    InterceptId
}

// ============================================================================
// Numeric Identifiers (local end)
// ============================================================================

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from a raw value.
            #[inline]
            #[must_use]
            pub const fn from_raw(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

counter_id! {
    /// BiDi command identifier.
    ///
    /// Assigned monotonically per connection; responses are correlated by it.
    CommandId
}

counter_id! {
    /// Handle for a registered BiDi event listener.
    ListenerId
}

counter_id! {
    /// Handle for a log monitor subscriber.
    SubscriptionId
}

// ============================================================================
// IdSequence
// ============================================================================

/// Monotonic counter producing numeric identifiers, starting at 1.
#[derive(Debug)]
pub(crate) struct IdSequence(AtomicU64);

impl IdSequence {
    /// Creates a sequence whose first value is 1.
    pub(crate) const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Returns the next raw value.
    #[inline]
    pub(crate) fn next_raw(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
