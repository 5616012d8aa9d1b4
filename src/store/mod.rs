//! An abstract KV store with conditional put, point get, secondary-index
//! range query, atomic update and stream subscription. The
//! storage engine itself is out of scope for this crate; this module only
//! specifies and implements the interface the rest of the system needs.

pub mod memory;

use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("item not found")]
    NotFound,
    #[error("conditional check failed")]
    Conflict,
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown index: {0} on table {1}")]
    UnknownIndex(String, String),
    #[error("transient storage error: {0}")]
    Transient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A secondary index: partition items by `partition_field`, order each
/// partition by `sort_field`.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: &'static str,
    pub partition_field: &'static str,
    pub sort_field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventKind {
    Insert,
    Modify,
    Remove,
}

/// One record of the at-least-once, per-partition-ordered change stream
/// (the stream contract every Store implementation must honor).
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub table: String,
    pub kind: StreamEventKind,
    pub new_image: Option<Value>,
    pub old_image: Option<Value>,
}

pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Value + Send>;

/// The Store interface. Implementors decide what "transient" vs
/// "conditional failure" means for their backend; callers must retry the
/// former with jittered backoff and must not retry the latter.
pub trait Store: Send + Sync {
    fn put_if_absent(&self, table: &str, key: &str, item: Value) -> Result<PutOutcome, StoreError>;

    fn get(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError>;

    fn delete_returning_old(&self, table: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Apply `update` to the current item (or `None` if absent) and store
    /// the result. Always succeeds for an in-process store; a networked
    /// backend would implement this with a compare-and-swap loop.
    fn atomic_update(&self, table: &str, key: &str, update: UpdateFn) -> Result<Value, StoreError>;

    fn query_index(
        &self,
        table: &str,
        index: &str,
        partition_value: &str,
        limit: usize,
        direction: Direction,
    ) -> Result<Vec<Value>, StoreError>;

    fn subscribe(&self, table: &str) -> Result<broadcast::Receiver<StreamRecord>, StoreError>;
}
