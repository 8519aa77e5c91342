//! Mutation options and in-flight mutation records

use super::key::QueryKey;
use serde_json::Value;
use uuid::Uuid;

/// Synchronous local transform applied to the cached value before the
/// network call settles
pub type OptimisticUpdate = Box<dyn FnOnce(&Value) -> Value + Send>;

/// When a settled mutation marks its key stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidatePolicy {
    /// After success and after failure
    #[default]
    Always,
    /// Only after success
    OnSuccess,
    /// Never; the caller reconciles the cache itself
    Never,
}

impl InvalidatePolicy {
    pub fn applies(&self, succeeded: bool) -> bool {
        match self {
            InvalidatePolicy::Always => true,
            InvalidatePolicy::OnSuccess => succeeded,
            InvalidatePolicy::Never => false,
        }
    }
}

/// How `QueryCache::mutate` treats the cache around a write
#[derive(Default)]
pub struct MutateOptions {
    pub(crate) optimistic: Option<OptimisticUpdate>,
    pub(crate) invalidate: InvalidatePolicy,
    pub(crate) also_invalidate: Vec<QueryKey>,
}

impl MutateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` to the cached value right away, rolling back if the
    /// mutation fails. Skipped when nothing is cached yet.
    pub fn optimistic<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&Value) -> Value + Send + 'static,
    {
        self.optimistic = Some(Box::new(update));
        self
    }

    pub fn invalidate(mut self, policy: InvalidatePolicy) -> Self {
        self.invalidate = policy;
        self
    }

    /// Also mark `prefix` stale when the mutation settles
    pub fn also_invalidate(mut self, prefix: QueryKey) -> Self {
        self.also_invalidate.push(prefix);
        self
    }
}

/// A write in flight
#[derive(Debug)]
pub(crate) struct PendingMutation {
    pub id: Uuid,
    pub key: QueryKey,
    /// Counted in the entry's pending total
    pub tracked: bool,
    pub applied: bool,
    pub epoch: u64,
}

/// An optimistic value on an entry together with the value it replaced
#[derive(Debug)]
pub(crate) struct AppliedWrite {
    pub id: Uuid,
    pub snapshot: Value,
    pub superseded: bool,
}

impl AppliedWrite {
    pub fn new(id: Uuid, snapshot: Value) -> Self {
        Self {
            id,
            snapshot,
            superseded: false,
        }
    }
}
