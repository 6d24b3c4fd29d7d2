//! User profile records.
//!
//! The same shape is cached under the `user` storage key at sign-in and
//! returned by `GET /user/profile`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use creamery_core::UserId;

use super::lenient;

/// A user's profile, as far as the storefront cares about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
}

impl UserProfile {
    /// Identifier from `id`, falling back to `_id`.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        [&self.id, &self.mongo_id]
            .into_iter()
            .flatten()
            .find_map(UserId::from_json)
    }
}
