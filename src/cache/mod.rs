//! Folio Cache Layer
//!
//! In-memory time-to-live cache for pages, content blobs, folder views, site
//! configuration and the external version lookup.
//!
//! - [`CacheContext`] owns every entry and offers read-through helpers.
//! - [`CacheTrigger`] turns write-side mutations into invalidations.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_ttl_seconds = 300
//! version_ttl_seconds = 3600
//! ```

mod config;
mod entry;
mod events;
mod keys;
mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use entry::{CacheEntry, Clock, ManualClock, SystemClock};
pub use events::MutationEvent;
pub use keys::{CacheKey, SingletonKey};
pub use planner::InvalidationPlan;
pub use store::{CacheContext, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS};
pub use trigger::CacheTrigger;
