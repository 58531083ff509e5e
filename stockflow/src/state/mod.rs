//! Key-value run state and the watermark built on it.
//!
//! [`StateStore`] is the process-wide configuration/state store the
//! watermark lives in: string values addressed by name, absent keys read
//! as `None`. The store is handed to the orchestrator explicitly; there is
//! no ambient global. A single writer is assumed; nothing here locks
//! across processes.

mod file;
mod memory;
mod watermark;

pub use file::JsonFileStateStore;
pub use memory::InMemoryStateStore;
pub use watermark::Watermark;

use crate::errors::StateError;

/// Storage contract for named state entries.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn StateStore>`.
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Reads a value. Returns `Ok(None)` when the key was never set.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] on storage failure.
    fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] on storage failure.
    fn set(&self, key: &str, value: &str) -> Result<(), StateError>;

    /// Deletes a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] on storage failure.
    fn remove(&self, key: &str) -> Result<(), StateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn StateStore) {}
    }
}
