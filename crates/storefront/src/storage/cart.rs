//! Cart partitions on top of a [`KeyValueStore`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use creamery_core::UserId;

use super::{KeyValueStore, StorageError};
use crate::models::CartLineItem;

/// Key prefix for cart partitions; also the anonymous key on its own.
const CART_KEY: &str = "cart";

/// Storage key of one identity's cart partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// `cart:<id>` for a resolved identity, `cart` for an anonymous session.
    #[must_use]
    pub fn for_owner(owner: Option<&UserId>) -> Self {
        match owner {
            Some(id) => Self(format!("{CART_KEY}:{id}")),
            None => Self(CART_KEY.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A partition could not be read back.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored value is not a JSON array.
    #[error("cart partition is not a JSON array: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON encoding of cart partitions.
#[derive(Clone)]
pub struct CartStorage {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for CartStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStorage").finish_non_exhaustive()
    }
}

impl CartStorage {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying key-value store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Load the line items stored under `key`.
    ///
    /// An absent key is an empty cart. Individual records that fail to
    /// decode are logged and dropped; the rest of the partition survives.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if the store cannot be read or the value is not
    /// a JSON array.
    pub fn load(&self, key: &PartitionKey) -> Result<Vec<CartLineItem>, DecodeError> {
        let Some(raw) = self.store.get(key.as_str())? else {
            return Ok(Vec::new());
        };

        let records: Vec<Value> = serde_json::from_str(&raw)?;
        let total = records.len();
        let items: Vec<CartLineItem> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(partition = %key, index, error = %e, "Dropping undecodable cart item");
                    None
                }
            })
            .collect();

        if items.len() < total {
            warn!(
                partition = %key,
                kept = items.len(),
                dropped = total - items.len(),
                "Cart partition partially decoded"
            );
        }
        Ok(items)
    }

    /// Overwrite `key` with the full list of `items`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub fn save(&self, key: &PartitionKey, items: &[CartLineItem]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(items)?;
        self.store.set(key.as_str(), &encoded)
    }
}
