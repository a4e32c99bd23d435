//! Newtype IDs for type-safe wallet identifiers.
//!
//! The wallet protocol traffics in several opaque strings: the pass serial
//! number (which doubles as the customer id), the device library identifier,
//! the pass type identifier, and the push token. Mixing them up compiles fine
//! with bare `String`s and fails silently at runtime, so each gets a newtype.

/// Macro to define a type-safe wrapper around an opaque protocol string.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use glowpass_core::define_string_id;
/// define_string_id!(CustomerId);
/// define_string_id!(DeviceLibraryId);
///
/// let customer = CustomerId::new("C1");
/// let device = DeviceLibraryId::new("device-abc");
///
/// // These are different types, so this won't compile:
/// // let _: CustomerId = device;
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

// The customer id acts as the wallet "serial number"; there is deliberately
// no separate SerialNumber type so the two can never drift apart.
define_string_id!(CustomerId);
define_string_id!(DeviceLibraryId);
define_string_id!(PassTypeId);
define_string_id!(PushToken);
