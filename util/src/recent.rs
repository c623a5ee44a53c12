use crate::store::{KeyValueStore, StoreError};
use std::sync::Arc;
use tracing::warn;

pub const RECENT_KEY: &str = "recentlyViewed";
pub const DEFAULT_CAPACITY: usize = 10;

/// Last viewed product ids, most recent first, without duplicates.
#[derive(Clone)]
pub struct RecentlyViewed {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
}

impl RecentlyViewed {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        RecentlyViewed {
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn list(&self) -> Vec<String> {
        match self.store.get(RECENT_KEY) {
            None => vec![],
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("ignoring malformed {RECENT_KEY} entry: {err}");
                vec![]
            }),
        }
    }

    pub fn push<S: AsRef<str>>(&self, id: S) -> Result<Vec<String>, StoreError> {
        let id = id.as_ref();
        let mut ids = self.list();
        ids.retain(|existing| existing != id);
        ids.insert(0, id.to_string());
        ids.truncate(self.capacity);

        self.store.set(RECENT_KEY, serde_json::to_string(&ids)?)?;
        Ok(ids)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(RECENT_KEY)
    }
}
