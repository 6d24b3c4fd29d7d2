//! The cart store.
//!
//! [`CartStore`] is the single in-memory source of truth for the current
//! identity's line items. Every mutation runs mutate → persist → notify
//! under one lock, then hands subscribers a snapshot once the lock is
//! released. Operations never fail: storage problems are logged and the
//! in-memory cart carries on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use creamery_core::{ProductId, UserId};

use crate::models::{self, CartEntry, CartLineItem};
use crate::services::identity::IdentityResolver;
use crate::storage::{CartStorage, PartitionKey};

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Everything a presentation surface needs to render the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Identity the snapshot belongs to; `None` when anonymous.
    pub owner: Option<UserId>,
    /// Visible line items, in insertion order.
    pub items: Vec<CartLineItem>,
    pub item_count: u64,
    pub total: Decimal,
    /// Whether the cart drawer is open.
    pub is_open: bool,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

type Subscriber = Arc<dyn Fn(&CartSnapshot) + Send + Sync>;

/// Shared cart handle.
///
/// Cheaply cloneable; every clone sees the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    storage: CartStorage,
    identity: IdentityResolver,
    state: Mutex<CartState>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

struct CartState {
    owner: Option<UserId>,
    items: Vec<CartLineItem>,
    is_open: bool,
}

impl CartState {
    fn visible(&self) -> impl Iterator<Item = &CartLineItem> {
        self.items.iter().filter(|item| item.owner_id == self.owner)
    }

    fn snapshot(&self) -> CartSnapshot {
        let items: Vec<CartLineItem> = self.visible().cloned().collect();
        CartSnapshot {
            owner: self.owner.clone(),
            item_count: models::item_count(&items),
            total: models::total(&items),
            items,
            is_open: self.is_open,
        }
    }

    fn position(&self, item_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| &item.item_id == item_id && item.owner_id == self.owner)
    }

    fn line_mut(&mut self, item_id: &ProductId) -> Option<&mut CartLineItem> {
        let owner = &self.owner;
        self.items
            .iter_mut()
            .find(|item| &item.item_id == item_id && item.owner_id == *owner)
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("CartStore")
            .field("owner", &state.owner)
            .field("items", &state.items.len())
            .field("is_open", &state.is_open)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store and load the partition of the identity that resolves
    /// right now.
    #[must_use]
    pub fn new(storage: CartStorage, identity: IdentityResolver) -> Self {
        let owner = identity.resolve();
        let items = load_partition(&storage, owner.as_ref());
        debug!(owner = ?owner, items = items.len(), "Cart store initialized");

        Self {
            inner: Arc::new(CartStoreInner {
                storage,
                identity,
                state: Mutex::new(CartState {
                    owner,
                    items,
                    is_open: false,
                }),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    /// The identity resolver this store partitions by.
    #[must_use]
    pub fn identity(&self) -> &IdentityResolver {
        &self.inner.identity
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// A quantity of 0 is treated as 1.
    #[instrument(skip_all, fields(item_id = %entry.item_id, quantity = quantity))]
    pub fn add_item(&self, entry: CartEntry, quantity: u32) {
        let quantity = quantity.max(1);
        self.mutate(|state| {
            if let Some(line) = state.line_mut(&entry.item_id) {
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                let line = CartLineItem::new(entry, state.owner.clone(), quantity);
                state.items.push(line);
            }
        });
    }

    /// Remove the current identity's line for `item_id`, if any.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub fn remove_item(&self, item_id: &ProductId) {
        self.mutate(|state| {
            if let Some(index) = state.position(item_id) {
                state.items.remove(index);
            }
        });
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// Zero or below removes the line; a missing line is left alone.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub fn set_quantity(&self, item_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(item_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.mutate(|state| {
            if let Some(line) = state.line_mut(item_id) {
                line.quantity = quantity;
            }
        });
    }

    /// Remove every line belonging to the current identity.
    ///
    /// Other identities' partitions are not touched.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.mutate(|state| {
            let owner = state.owner.clone();
            state.items.retain(|item| item.owner_id != owner);
        });
    }

    /// Flip the drawer flag. Not persisted.
    pub fn toggle_visibility(&self) {
        let snapshot = {
            let mut state = self.synced_state();
            state.is_open = !state.is_open;
            state.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Re-read the current identity's partition from storage.
    ///
    /// Call this when another writer may have changed the backing store.
    #[instrument(skip(self))]
    pub fn reload(&self) {
        let snapshot = {
            let mut state = self.lock_state();
            let owner = self.inner.identity.resolve();
            state.items = load_partition(&self.inner.storage, owner.as_ref());
            state.owner = owner;
            state.snapshot()
        };
        debug!(owner = ?snapshot.owner, count = snapshot.item_count, "Cart reloaded");
        self.notify(&snapshot);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Line items of the current identity.
    #[must_use]
    pub fn visible_items(&self) -> Vec<CartLineItem> {
        self.snapshot().items
    }

    /// Sum of quantities over visible items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        let state = self.synced_state();
        state.visible().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `unit_price * quantity` over visible items.
    #[must_use]
    pub fn total(&self) -> Decimal {
        let state = self.synced_state();
        models::total(state.visible())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock_state().is_open
    }

    /// Consistent view of the current identity's cart.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.synced_state().snapshot()
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register a callback invoked with a snapshot after every mutation.
    ///
    /// Callbacks run after the store lock is released and may call back
    /// into the store.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers().push((id, Arc::new(callback)));
        id
    }

    /// Drop a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock_subscribers().retain(|(existing, _)| *existing != id);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state, swapping in another partition if the identity moved.
    fn synced_state(&self) -> MutexGuard<'_, CartState> {
        let mut state = self.lock_state();
        let owner = self.inner.identity.resolve();
        if owner != state.owner {
            info!(from = ?state.owner, to = ?owner, "Identity changed, switching cart partition");
            state.items = load_partition(&self.inner.storage, owner.as_ref());
            state.owner = owner;
        }
        state
    }

    fn mutate<F>(&self, apply: F)
    where
        F: FnOnce(&mut CartState),
    {
        let snapshot = {
            let mut state = self.synced_state();
            apply(&mut state);

            let key = PartitionKey::for_owner(state.owner.as_ref());
            if let Err(e) = self.inner.storage.save(&key, &state.items) {
                warn!(partition = %key, error = %e, "Failed to persist cart");
            }
            state.snapshot()
        };
        debug!(
            owner = ?snapshot.owner,
            lines = snapshot.items.len(),
            count = snapshot.item_count,
            "Cart updated"
        );
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &CartSnapshot) {
        let subscribers: Vec<Subscriber> = self
            .lock_subscribers()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in subscribers {
            callback(snapshot);
        }
    }
}

fn load_partition(storage: &CartStorage, owner: Option<&UserId>) -> Vec<CartLineItem> {
    let key = PartitionKey::for_owner(owner);
    match storage.load(&key) {
        Ok(items) => items,
        Err(e) => {
            warn!(partition = %key, error = %e, "Unreadable cart partition, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::models::PresentationFields;
    use crate::services::identity::tests::token_for;
    use crate::storage::{KeyValueStore, MemoryStore, StorageError};

    fn entry(id: &str, cents: i64) -> CartEntry {
        CartEntry {
            item_id: ProductId::new(id),
            unit_price: Decimal::new(cents, 2),
            presentation: PresentationFields {
                name: format!("Product {id}"),
                ..PresentationFields::default()
            },
        }
    }

    fn store_with(kv: &Arc<MemoryStore>) -> CartStore {
        CartStore::new(
            CartStorage::new(kv.clone()),
            IdentityResolver::new(kv.clone()),
        )
    }

    fn sign_in(kv: &MemoryStore, id: &str) {
        kv.set("user", &json!({ "id": id }).to_string()).unwrap();
    }

    fn sign_out(kv: &MemoryStore) {
        kv.remove("user").unwrap();
        kv.remove("token").unwrap();
    }

    #[test]
    fn test_extreme_stored_prices_saturate_instead_of_panicking() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            "cart",
            &json!([{ "itemId": "a", "unitPrice": "79228162514264337593543950335", "quantity": 2 }])
                .to_string(),
        )
        .unwrap();
        let cart = store_with(&kv);

        assert_eq!(cart.visible_items().len(), 1);
        assert_eq!(cart.total(), Decimal::MAX);
        assert_eq!(cart.snapshot().total, Decimal::MAX);

        cart.add_item(entry("b", 100), 1);
        cart.set_quantity(&ProductId::new("a"), i64::MAX);
        assert_eq!(cart.total(), Decimal::MAX);
        assert_eq!(cart.item_count(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_quantity_change_cannot_overflow_in_range_price() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        let huge = CartEntry {
            unit_price: Decimal::MAX / Decimal::TWO,
            ..entry("a", 0)
        };

        cart.add_item(huge, 1);
        assert_eq!(cart.total(), Decimal::MAX / Decimal::TWO);
        cart.set_quantity(&ProductId::new("a"), 3);
        assert_eq!(cart.total(), Decimal::MAX);
        cart.add_item(entry("a", 0), 5);
        assert_eq!(cart.visible_items()[0].quantity, 8);
        assert_eq!(cart.total(), Decimal::MAX);
    }

    #[test]
    fn test_add_merges_and_totals() {
        let kv = Arc::new(MemoryStore::new());
        sign_in(&kv, "U1");
        let cart = store_with(&kv);

        cart.add_item(entry("A", 3599), 2);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Decimal::new(7198, 2));

        cart.add_item(entry("A", 3599), 3);
        let items = cart.visible_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(items[0].owner_id, Some(UserId::new("U1")));
        assert_eq!(cart.total(), Decimal::new(17995, 2));

        cart.set_quantity(&ProductId::new("A"), 0);
        assert!(cart.visible_items().is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_zero_quantity_add_counts_as_one() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        cart.add_item(entry("A", 100), 0);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_every_mutation_persists() {
        let kv = Arc::new(MemoryStore::new());
        sign_in(&kv, "U1");
        let cart = store_with(&kv);

        cart.add_item(entry("A", 100), 1);
        let stored = kv.get("cart:U1").unwrap().unwrap();
        let decoded: Vec<CartLineItem> = serde_json::from_str(&stored).unwrap();
        assert_eq!(decoded, cart.visible_items());

        cart.remove_item(&ProductId::new("missing"));
        let stored = kv.get("cart:U1").unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Vec<CartLineItem>>(&stored).unwrap().len(), 1);
    }

    #[test]
    fn test_set_quantity() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        cart.add_item(entry("A", 100), 1);

        cart.set_quantity(&ProductId::new("A"), 7);
        assert_eq!(cart.item_count(), 7);

        cart.set_quantity(&ProductId::new("A"), i64::MAX);
        assert_eq!(cart.item_count(), u64::from(u32::MAX));

        cart.set_quantity(&ProductId::new("B"), 3);
        assert_eq!(cart.visible_items().len(), 1);

        cart.set_quantity(&ProductId::new("A"), -4);
        assert!(cart.visible_items().is_empty());
    }

    #[test]
    fn test_anonymous_items_stay_in_anonymous_partition() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);

        cart.add_item(entry("B", 250), 1);
        assert_eq!(cart.visible_items()[0].owner_id, None);

        sign_in(&kv, "U2");
        assert!(cart.visible_items().is_empty());
        assert_eq!(cart.snapshot().owner, Some(UserId::new("U2")));

        let anonymous: Vec<CartLineItem> =
            serde_json::from_str(&kv.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(anonymous.len(), 1);
        assert_eq!(anonymous[0].item_id.as_str(), "B");
    }

    #[test]
    fn test_identity_switch_is_disjoint_and_preserving() {
        let kv = Arc::new(MemoryStore::new());
        sign_in(&kv, "U1");
        let cart = store_with(&kv);
        cart.add_item(entry("A", 100), 2);

        kv.set("token", &token_for(&json!({ "userId": "U2" }))).unwrap();
        kv.remove("user").unwrap();
        cart.add_item(entry("C", 500), 1);
        let visible = cart.visible_items();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].item_id.as_str(), "C");

        sign_in(&kv, "U1");
        let visible = cart.visible_items();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].item_id.as_str(), "A");
        assert_eq!(visible[0].quantity, 2);
    }

    #[test]
    fn test_clear_only_current_identity() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        cart.add_item(entry("B", 100), 1);

        sign_in(&kv, "U1");
        cart.add_item(entry("A", 100), 1);
        cart.clear();
        assert!(cart.visible_items().is_empty());
        assert_eq!(kv.get("cart:U1").unwrap().as_deref(), Some("[]"));

        sign_out(&kv);
        assert_eq!(cart.visible_items().len(), 1);
    }

    #[test]
    fn test_clear_keeps_foreign_lines_in_partition() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            "cart",
            &json!([
                {"itemId": "A", "unitPrice": "1", "quantity": 1},
                {"itemId": "B", "userId": "legacy", "price": 2, "quantity": 1}
            ])
            .to_string(),
        )
        .unwrap();
        let cart = store_with(&kv);
        assert_eq!(cart.visible_items().len(), 1);

        cart.clear();
        let stored: Vec<CartLineItem> =
            serde_json::from_str(&kv.get("cart").unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].item_id.as_str(), "B");
    }

    #[test]
    fn test_loads_existing_partition_on_construction() {
        let kv = Arc::new(MemoryStore::new());
        sign_in(&kv, "U1");
        store_with(&kv).add_item(entry("A", 100), 3);

        let cart = store_with(&kv);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_corrupt_partition_starts_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("cart", "{{{").unwrap();
        let cart = store_with(&kv);
        assert!(cart.visible_items().is_empty());

        cart.add_item(entry("A", 100), 1);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_subscribers_see_post_mutation_snapshot() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let recorder = Arc::clone(&seen);
        let id = cart.subscribe(move |snapshot| {
            recorder.lock().unwrap().push((snapshot.item_count, snapshot.is_open));
        });

        cart.add_item(entry("A", 100), 2);
        cart.toggle_visibility();
        cart.unsubscribe(id);
        cart.clear();

        assert_eq!(*seen.lock().unwrap(), vec![(2, false), (2, true)]);
        assert!(cart.is_open());
    }

    #[test]
    fn test_subscriber_may_query_store() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = cart.clone();
        let counter = Arc::clone(&calls);
        cart.subscribe(move |snapshot| {
            assert_eq!(handle.item_count(), snapshot.item_count);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cart.add_item(entry("A", 100), 1);
        cart.remove_item(&ProductId::new("A"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let kv = Arc::new(MemoryStore::new());
        let cart = store_with(&kv);
        cart.add_item(entry("A", 100), 1);

        let other = store_with(&kv);
        other.add_item(entry("B", 100), 1);

        assert_eq!(cart.visible_items().len(), 1);
        cart.reload();
        assert_eq!(cart.visible_items().len(), 2);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn test_storage_failures_do_not_surface() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(FailingStore);
        let cart = CartStore::new(CartStorage::new(kv.clone()), IdentityResolver::new(kv));

        cart.add_item(entry("A", 3599), 2);
        assert_eq!(cart.total(), Decimal::new(7198, 2));
        cart.clear();
        assert_eq!(cart.item_count(), 0);
    }
}
