use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

pub const WALLET_ADDRESS_KEY: &str = "gw_wallet_address";
pub const WALLET_CONNECTED_KEY: &str = "gw_wallet_connected";
pub const LANGUAGE_KEY: &str = "gw_language";
pub const PENDING_SPONSOR_KEY: &str = "gw_pending_sponsor";

/// Durable client-side string storage (browser `localStorage` in the dApp).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.read().ok()?;
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("in-memory store poisoned"))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.entries.write() {
            guard.remove(key);
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// Typed view over the dApp's persisted keys.
pub struct SessionStore<S> {
    inner: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Stored address, only if the connected flag is also set.
    pub fn connected_wallet(&self) -> Option<String> {
        let connected = self.inner.get(WALLET_CONNECTED_KEY)?;
        if connected != "true" {
            return None;
        }
        self.inner
            .get(WALLET_ADDRESS_KEY)
            .filter(|address| !address.trim().is_empty())
    }

    pub fn save_wallet(&self, address: &str) -> Result<()> {
        self.inner.set(WALLET_ADDRESS_KEY, address)?;
        self.inner.set(WALLET_CONNECTED_KEY, "true")?;
        Ok(())
    }

    pub fn clear_wallet(&self) {
        self.inner.remove(WALLET_ADDRESS_KEY);
        self.inner.remove(WALLET_CONNECTED_KEY);
    }

    pub fn language(&self) -> Option<String> {
        self.inner.get(LANGUAGE_KEY)
    }

    pub fn set_language(&self, language: &str) -> Result<()> {
        self.inner.set(LANGUAGE_KEY, language)
    }

    pub fn pending_sponsor(&self) -> Option<String> {
        self.inner
            .get(PENDING_SPONSOR_KEY)
            .filter(|sponsor| !sponsor.trim().is_empty())
    }

    pub fn set_pending_sponsor(&self, sponsor: &str) -> Result<()> {
        self.inner.set(PENDING_SPONSOR_KEY, sponsor.trim())
    }

    pub fn clear_pending_sponsor(&self) {
        self.inner.remove(PENDING_SPONSOR_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_keys_require_connected_flag() -> Result<()> {
        let store = SessionStore::new(InMemoryStore::default());
        assert_eq!(store.connected_wallet(), None);

        store.inner().set(WALLET_ADDRESS_KEY, "0xabc")?;
        assert_eq!(store.connected_wallet(), None);

        store.save_wallet("0xabc")?;
        assert_eq!(store.connected_wallet().as_deref(), Some("0xabc"));
        Ok(())
    }

    #[test]
    fn clearing_wallet_keeps_language_and_sponsor() -> Result<()> {
        let store = SessionStore::new(InMemoryStore::default());
        store.save_wallet("0xabc")?;
        store.set_language("ru")?;
        store.set_pending_sponsor(" GW0000007 ")?;

        store.clear_wallet();

        assert_eq!(store.connected_wallet(), None);
        assert_eq!(store.language().as_deref(), Some("ru"));
        assert_eq!(store.pending_sponsor().as_deref(), Some("GW0000007"));

        store.clear_pending_sponsor();
        assert_eq!(store.pending_sponsor(), None);
        Ok(())
    }
}
