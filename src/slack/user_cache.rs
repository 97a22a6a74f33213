use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

/// Process-wide cache of user id -> display name.
///
/// Shared by every concurrent pipeline. Population is insert-if-absent, so two
/// invocations racing on the same id both end up with the first stored name.
#[derive(Debug, Default)]
pub struct UserNameCache {
    names: RwLock<HashMap<String, String>>,
}

impl UserNameCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    /// Stores `name` unless a name is already cached; returns the cached value.
    pub fn insert_if_absent(&self, user_id: &str, name: String) -> String {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_insert(name)
            .clone()
    }

    /// Returns the cached name, or runs `resolve` and caches its success.
    ///
    /// Errors are returned to the caller and are not cached. No lock is held
    /// while `resolve` runs.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error.
    pub async fn get_or_try_populate<F, Fut, E>(&self, user_id: &str, resolve: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(name) = self.get(user_id) {
            return Ok(name);
        }

        let name = resolve().await?;
        Ok(self.insert_if_absent(user_id, name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
