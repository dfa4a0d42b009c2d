//! Named cache stores keyed by request URL.
//!
//! Entries keep insertion order; `put` on an existing key replaces the
//! entry and moves it to the newest position.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::http::Response;
use crate::error::StorageError;
use crate::logging::{log_failure, Domain};

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Store names in creation order.
    async fn store_names(&self) -> Result<Vec<String>, StorageError>;
    /// Create the store if it does not exist.
    async fn open(&self, store: &str) -> Result<(), StorageError>;
    async fn delete_store(&self, store: &str) -> Result<bool, StorageError>;
    async fn get(&self, store: &str, key: &str) -> Result<Option<Response>, StorageError>;
    async fn put(&self, store: &str, key: &str, response: Response) -> Result<(), StorageError>;
    async fn delete(&self, store: &str, key: &str) -> Result<bool, StorageError>;
    /// Keys oldest-inserted first.
    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError>;

    /// First hit across all stores, in store creation order. A corrupt
    /// entry counts as a miss for that store only.
    async fn match_any(&self, key: &str) -> Result<Option<Response>, StorageError> {
        for store in self.store_names().await? {
            match self.get(&store, key).await {
                Ok(Some(resp)) => return Ok(Some(resp)),
                Ok(None) => {}
                Err(err @ StorageError::Corrupt(_)) => {
                    log_failure(Domain::Cache, "corrupt_entry_skipped", key, &err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Clone)]
struct NamedStore {
    name: String,
    entries: Vec<(String, Response)>,
}

/// In-process stores. `set_failing(true)` makes every operation fail,
/// which is how tests exercise the storage-failure paths.
#[derive(Default)]
pub struct MemoryCacheStorage {
    stores: Mutex<Vec<NamedStore>>,
    failing: AtomicBool,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn with_stores<T>(
        &self,
        f: impl FnOnce(&mut Vec<NamedStore>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;
        f(&mut stores)
    }
}

fn find<'a>(stores: &'a mut [NamedStore], name: &str) -> Option<&'a mut NamedStore> {
    stores.iter_mut().find(|s| s.name == name)
}

fn find_or_create<'a>(stores: &'a mut Vec<NamedStore>, name: &str) -> &'a mut NamedStore {
    let idx = match stores.iter().position(|s| s.name == name) {
        Some(idx) => idx,
        None => {
            stores.push(NamedStore {
                name: name.to_string(),
                entries: Vec::new(),
            });
            stores.len() - 1
        }
    };
    &mut stores[idx]
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn store_names(&self) -> Result<Vec<String>, StorageError> {
        self.with_stores(|stores| Ok(stores.iter().map(|s| s.name.clone()).collect()))
    }

    async fn open(&self, store: &str) -> Result<(), StorageError> {
        self.with_stores(|stores| {
            find_or_create(stores, store);
            Ok(())
        })
    }

    async fn delete_store(&self, store: &str) -> Result<bool, StorageError> {
        self.with_stores(|stores| {
            let before = stores.len();
            stores.retain(|s| s.name != store);
            Ok(stores.len() != before)
        })
    }

    async fn get(&self, store: &str, key: &str) -> Result<Option<Response>, StorageError> {
        self.with_stores(|stores| {
            Ok(find(stores, store).and_then(|s| {
                s.entries
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, resp)| resp.clone())
            }))
        })
    }

    async fn put(&self, store: &str, key: &str, response: Response) -> Result<(), StorageError> {
        self.with_stores(|stores| {
            let s = find_or_create(stores, store);
            s.entries.retain(|(k, _)| k != key);
            s.entries.push((key.to_string(), response));
            Ok(())
        })
    }

    async fn delete(&self, store: &str, key: &str) -> Result<bool, StorageError> {
        self.with_stores(|stores| {
            let Some(s) = find(stores, store) else {
                return Ok(false);
            };
            let before = s.entries.len();
            s.entries.retain(|(k, _)| k != key);
            Ok(s.entries.len() != before)
        })
    }

    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
        self.with_stores(|stores| {
            Ok(find(stores, store)
                .map(|s| s.entries.iter().map(|(k, _)| k.clone()).collect())
                .unwrap_or_default())
        })
    }
}
