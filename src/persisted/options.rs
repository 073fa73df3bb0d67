/// Configuration for a [`PersistedStore`](super::PersistedStore).
///
/// ```
/// use keepsake::PersistOptions;
///
/// let options = PersistOptions::new("theme", String::from("light"));
/// assert!(options.persist);
///
/// // Server-side rendering has no storage area to talk to.
/// let options = options.persist(false);
/// assert!(!options.persist);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOptions<T> {
    /// Storage slot name. Must be non-empty and unique within the area.
    pub key: String,
    /// Value used when nothing valid is stored.
    pub default: T,
    /// Whether to talk to the storage area at all. Defaults to `true`.
    pub persist: bool,
}

impl<T> PersistOptions<T> {
    /// Options for `key` with the given default, persistence enabled.
    pub fn new(key: impl Into<String>, default: T) -> Self {
        Self {
            key: key.into(),
            default,
            persist: true,
        }
    }

    /// Turn persistence on or off.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}
