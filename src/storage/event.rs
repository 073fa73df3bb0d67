/// A change to a storage area made by some other context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key, or `None` when the whole area was cleared.
    pub key: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change; `None` when the entry was removed.
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// An entry was written.
    pub fn set(key: impl Into<String>, old_value: Option<String>, new_value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value: Some(new_value.into()),
        }
    }

    /// An entry was removed.
    pub fn removed(key: impl Into<String>, old_value: Option<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value: None,
        }
    }

    /// The whole area was cleared.
    pub fn cleared() -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
        }
    }

    /// Whether this event affects `key`. A clear affects every key.
    pub fn affects(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}
