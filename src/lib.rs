//! A sharded in-process key/value cache with pluggable eviction policies.
//!
//! Keys hash onto a fixed set of shards, each owning its item table and one
//! eviction policy instance (Simple, LRU, LFU, or ARC) behind its own lock.
//! Entries carry a TTL; expired entries are removed eagerly on lookup and a
//! background sweeper reclaims what nobody reads. A remote second-level
//! cache can sit behind the local tier, and a loader-through protocol fills
//! local misses from a user-supplied source.
//!
//! ```
//! use tiercache::{Cache, PolicyKind};
//!
//! let cache = Cache::builder(1000, PolicyKind::Lru).build();
//! cache.set("answer", 42).unwrap();
//! assert_eq!(**cache.get("answer").unwrap().value(), 42);
//! ```

pub mod builder;
pub mod clock;
pub mod error;
pub mod options;
pub mod policy;
pub mod remote;

mod entry;
mod handle;
mod loader;
mod metrics;
mod shared;
mod store;
mod task;

pub use builder::CacheBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BoxError, CacheError, Result};
pub use handle::{Cache, Fetched};
pub use loader::{LoaderFn, MultiLoaderFn};
pub use metrics::MetricsSnapshot;
pub use options::Options;
pub use policy::{CachePolicy, PolicyKind};
pub use remote::{DecodeFn, EncodeFn, RemoteCache};
