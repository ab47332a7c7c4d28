use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;

/// Document-store capability consumed by the engines. Production
/// handlers pass the Spin key-value store; tests pass [`MemoryStore`].
pub trait KvStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set_raw(key, &serde_json::to_vec(value)?)
    }
}

impl KvStore for spin_sdk::key_value::Store {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.get(key)?)
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.set(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        spin_sdk::key_value::Store::delete(self, key)?;
        Ok(())
    }
}

/// In-memory store used by the test suites.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }
}
