//! Durable local persistence.
//!
//! The storage medium is a plain key/value store ([`KeyValueStore`]). Goals of
//! one user live under a single key derived from the user id and the schema
//! tag, so bumping [`SCHEMA_VERSION`] leaves older data untouched and unread.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{EngineError, Goal, ResultEngine};

/// Tag baked into every goal storage key.
pub const SCHEMA_VERSION: &str = "v2";

/// Synchronous get/set access to a durable medium.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ResultEngine<Option<String>>;

    fn set(&self, key: &str, value: &str) -> ResultEngine<()>;
}

/// Process-local store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyValueStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> ResultEngine<Option<String>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| EngineError::Persistence("memory store poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ResultEngine<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| EngineError::Persistence("memory store poisoned".to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a root directory.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> ResultEngine<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
            && !key.starts_with('.');
        if !valid {
            return Err(EngineError::Persistence(format!(
                "invalid storage key: {key}"
            )));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> ResultEngine<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> ResultEngine<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        fs::write(path, value)?;
        Ok(())
    }
}

/// Storage key holding every goal of `user_id`.
pub fn storage_key(user_id: &str) -> String {
    format!("savings_{SCHEMA_VERSION}_{user_id}")
}

/// Loads and saves the full goal set of a user.
#[derive(Clone, Debug)]
pub struct GoalStore<S> {
    kv: S,
}

impl<S: KeyValueStore> GoalStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Returns the stored goals, or an empty list when the user has none.
    pub fn load(&self, user_id: &str) -> ResultEngine<Vec<Goal>> {
        match self.kv.get(&storage_key(user_id))? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save<'a>(
        &self,
        user_id: &str,
        goals: impl IntoIterator<Item = &'a Goal>,
    ) -> ResultEngine<()> {
        let goals: Vec<&Goal> = goals.into_iter().collect();
        let payload = serde_json::to_string(&goals)?;
        self.kv.set(&storage_key(user_id), &payload)
    }
}
