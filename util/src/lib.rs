pub mod claims;
pub mod id;
pub mod recent;
pub mod store;

pub use id::*;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

pub use recent::RecentlyViewed;
