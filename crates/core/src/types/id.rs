//! Newtype IDs for type-safe entity references.
//!
//! Upstream records are inconsistent about identifier types: the same product
//! may arrive as `"42"`, `42`, or a Mongo-style hex string. Every ID here is
//! therefore backed by a `String`, and deserialization accepts either a
//! non-empty string or a number.

use serde_json::Value;

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` from a string or a number
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`, `from_json()`
/// - `Display`, `AsRef<str>`, `From<String>` and `From<&str>`
///
/// # Example
///
/// ```rust
/// # use creamery_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(RouteId);
///
/// let warehouse = WarehouseId::new("w-1");
/// let route: RouteId = serde_json::from_str("17").unwrap();
///
/// assert_eq!(warehouse.as_str(), "w-1");
/// assert_eq!(route.as_str(), "17");
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = route;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Build an ID from a loosely typed JSON value.
            ///
            /// Returns `None` for blank strings, `null`, booleans, arrays and objects.
            #[must_use]
            pub fn from_json(value: &::serde_json::Value) -> Option<Self> {
                $crate::types::id::identifier_from_json(value).map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
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

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let value = <::serde_json::Value as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::from_json(&value).ok_or_else(|| {
                    <D::Error as ::serde::de::Error>::custom(concat!(
                        "invalid ",
                        stringify!($name),
                        ": expected a non-empty string or a number"
                    ))
                })
            }
        }
    };
}

/// Normalize a loosely typed JSON identifier into its string form.
///
/// Strings are trimmed; numbers use their JSON rendering. Everything else,
/// including a string that is blank after trimming, yields `None`.
#[must_use]
pub fn identifier_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(UserId);
define_id!(OrderId);
