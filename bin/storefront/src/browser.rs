//! Browser-side storage.

use agrokart_platform_access::{KeyValueStore, StorageError};
use rootcause::Report;

/// `window.localStorage`, looked up on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStore;

fn local_storage() -> Result<web_sys::Storage, Report<StorageError>> {
    let unavailable = |details: String| StorageError::Unavailable { details };

    let window = web_sys::window().ok_or_else(|| unavailable("no window".to_string()))?;
    let storage = window
        .local_storage()
        .map_err(|e| unavailable(format!("{e:?}")))?
        .ok_or_else(|| unavailable("localStorage is disabled".to_string()))?;
    Ok(storage)
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        local_storage()?.get_item(key).map_err(|e| {
            StorageError::ReadFailed {
                key: key.to_string(),
                details: format!("{e:?}"),
            }
            .into()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Report<StorageError>> {
        local_storage()?.set_item(key, value).map_err(|e| {
            StorageError::WriteFailed {
                key: key.to_string(),
                details: format!("{e:?}"),
            }
            .into()
        })
    }

    fn remove(&self, key: &str) -> Result<(), Report<StorageError>> {
        local_storage()?.remove_item(key).map_err(|e| {
            StorageError::WriteFailed {
                key: key.to_string(),
                details: format!("{e:?}"),
            }
            .into()
        })
    }
}
