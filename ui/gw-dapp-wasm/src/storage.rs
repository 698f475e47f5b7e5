//! `localStorage` backing for the session and referral keys.

use anyhow::anyhow;
use gloo_storage::{LocalStorage, Storage};
use gw_storage::KeyValueStore;

/// Plain string values, so keys stay readable from devtools.
pub struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|_| anyhow!("localStorage rejected {key}"))
    }

    fn remove(&self, key: &str) {
        LocalStorage::delete(key);
    }
}
