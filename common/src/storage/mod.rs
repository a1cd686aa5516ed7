// Key-value persistence for reminder state
//
// The engine keeps one JSON blob under a fixed key. Calls are synchronous:
// both backends are local and finish without waiting on the network.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::StorageError;

/// Fixed key the reminder engine reads at startup and writes on every mutation
pub const STORAGE_KEY: &str = "medicationAlerts";

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`; `Ok(None)` when nothing has been written yet
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value for `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value for `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
