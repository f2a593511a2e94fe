//! archgate-cache: time-bounded architecture cache.
//!
//! Maps an image reference to the architectures a registry reported for it,
//! so the filter hot path does not hit the registry on every decision.
//!
//! # Components
//!
//! - **`cache`**: [`ArchCache`], a sharded concurrent map with per-entry expiry
//! - **`clock`**: [`Clock`] abstraction; [`ManualClock`] drives expiry in tests
//!
//! Expiry is lazy: a read past an entry's deadline behaves as a miss and
//! removes the entry. [`ArchCache::run_sweeper`] optionally purges expired
//! entries in the background without changing what readers observe.

pub mod cache;
pub mod clock;

pub use cache::{ArchCache, ArchCacheConfig, CacheStats};
pub use clock::{Clock, ManualClock, SystemClock};
