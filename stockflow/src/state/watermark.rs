//! The last-successful-run watermark.

use super::StateStore;
use crate::errors::StateError;
use crate::utils::now_unix_seconds;
use std::sync::Arc;
use tracing::info;

/// Handle on the watermark entry of a [`StateStore`].
///
/// The value is Unix seconds stored as a decimal string. It is read once
/// at the start of a run and written once, after the whole chain succeeds.
#[derive(Debug, Clone)]
pub struct Watermark {
    store: Arc<dyn StateStore>,
    key: String,
}

impl Watermark {
    /// Creates a handle on `key` in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Returns the state key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the watermark. `None` means no run has ever succeeded.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Corrupt` if the stored value is not a finite
    /// number, or the store's own error.
    pub fn read(&self) -> Result<Option<f64>, StateError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(StateError::Corrupt {
                key: self.key.clone(),
                value: raw,
            }),
        }
    }

    /// Sets the watermark to an explicit value.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Corrupt` for non-finite values, or the store's
    /// own error.
    pub fn set(&self, value: f64) -> Result<(), StateError> {
        if !value.is_finite() {
            return Err(StateError::Corrupt {
                key: self.key.clone(),
                value: value.to_string(),
            });
        }
        self.store.set(&self.key, &value.to_string())
    }

    /// Sets the watermark to the current wall-clock time and returns it.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn advance_to_now(&self) -> Result<f64, StateError> {
        let now = now_unix_seconds();
        self.set(now)?;
        info!(key = %self.key, watermark = now, "Updated last successful run timestamp");
        Ok(now)
    }

    /// Removes the watermark so the next run sees it unset.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn clear(&self) -> Result<(), StateError> {
        self.store.remove(&self.key)
    }
}
