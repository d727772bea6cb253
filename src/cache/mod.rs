pub mod maintenance;
pub mod models;
pub mod store;
pub mod ttl;

pub use maintenance::{start_cache_maintenance, CacheMaintenanceConfig};
pub use models::CacheEntry;
pub use store::{CacheStore, InMemoryCacheStore};
pub use ttl::TtlPolicy;
