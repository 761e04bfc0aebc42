//! Key-value observation store
//!
//! A dependency-injectable store with exactly three capabilities: read the
//! current value, write or remove, and subscribe to per-key change
//! notifications. The engine bridges change notifications into messages so
//! the update handlers can mirror store state.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

/// Capacity of each per-key notification channel
const CHANNEL_CAPACITY: usize = 32;

/// A change notification for one key
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    /// New value; `None` means the key was removed
    pub value: Option<Value>,
}

/// Key-value observation capability
///
/// Implementations target the `Send` variant so action tasks can write
/// from spawned contexts; `LocalKeyValueStore` exists for single-threaded
/// callers.
#[trait_variant::make(KeyValueStore: Send)]
pub trait LocalKeyValueStore {
    /// Current value for a key
    async fn get(&self, key: &str) -> Option<Value>;

    /// Set a key, notifying subscribers of that key
    async fn set(&self, key: &str, value: Value);

    /// Remove a key, notifying subscribers of that key
    async fn remove(&self, key: &str);

    /// Subscribe to change notifications for one key
    async fn subscribe(&self, key: &str) -> broadcast::Receiver<StoreChange>;
}

/// In-memory store backed by a `RwLock<HashMap>` with one broadcast
/// channel per subscribed key.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    channels: RwLock<HashMap<String, broadcast::Sender<StoreChange>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn notify(&self, key: &str, value: Option<Value>) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(key) {
            // send() errs only when there are no receivers -- that's fine
            let _ = tx.send(StoreChange {
                key: key.to_string(),
                value,
            });
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.values.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.clone());
        self.notify(key, Some(value)).await;
    }

    async fn remove(&self, key: &str) {
        let removed = self.values.write().await.remove(key);
        if removed.is_some() {
            self.notify(key, None).await;
        }
    }

    async fn subscribe(&self, key: &str) -> broadcast::Receiver<StoreChange> {
        let mut channels = self.channels.write().await;
        channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{KeyValueStore, MemoryStore};

    #[tokio::test]
    async fn test_get_returns_latest_value() {
        let store = MemoryStore::new();

        assert!(store.get("k").await.is_none());

        store.set("k", json!(1)).await;
        assert_eq!(store.get("k").await, Some(json!(1)));

        store.set("k", json!(2)).await;
        assert_eq!(store.get("k").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_remove_clears_value() {
        let store = MemoryStore::new();
        store.set("k", json!("v")).await;

        store.remove("k").await;

        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_observes_set_and_remove() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("k").await;

        store.set("k", json!({"a": 1})).await;
        store.remove("k").await;

        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.value, Some(json!({"a": 1})));

        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.value, None);
    }

    #[tokio::test]
    async fn test_subscriber_does_not_observe_other_keys() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("mine").await;

        store.set("other", json!(1)).await;
        store.set("another", json!(2)).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_missing_key_does_not_notify() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("k").await;

        store.remove("k").await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let store = MemoryStore::new();
        let mut rx1 = store.subscribe("k").await;
        let mut rx2 = store.subscribe("k").await;

        store.set("k", json!(true)).await;

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_past_changes() {
        let store = MemoryStore::new();
        store.set("k", json!(1)).await;

        let mut rx = store.subscribe("k").await;
        assert!(rx.try_recv().is_err());

        // But current value is readable
        assert_eq!(store.get("k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_set_without_subscribers_is_fine() {
        let store = MemoryStore::new();
        store.set("k", json!("no one listening")).await;
        assert_eq!(store.get("k").await, Some(json!("no one listening")));
    }
}
