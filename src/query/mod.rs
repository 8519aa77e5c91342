//! Query cache
//!
//! Server data is held under [`QueryKey`]s. Reads follow a
//! stale-while-revalidate policy, writes may update the cached value
//! optimistically and roll back on failure. Clearing the cache discards any
//! fetch or rollback still in flight.

pub mod cache;
pub mod key;
pub mod mutation;

pub use cache::{fetcher, CacheEvent, EntrySnapshot, EntryStatus, Fetcher, QueryCache, ReadOptions};
pub use key::QueryKey;
pub use mutation::{InvalidatePolicy, MutateOptions, OptimisticUpdate};
