use tokio::sync::broadcast;

/// Notification that a storage slot was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    /// New serialized value, or `None` when the slot was cleared.
    pub new_value: Option<String>,
}

impl StorageChange {
    #[must_use]
    pub fn updated(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn cleared(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: None,
        }
    }
}

/// Publish/subscribe channel shared by every open view of the progress store.
///
/// Delivery is best effort: a subscriber that falls behind by more than the
/// channel capacity sees a lag and should re-read from storage.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<StorageChange>,
}

impl ChangeFeed {
    pub const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Broadcast a change. Returns the number of subscribers reached.
    pub fn publish(&self, change: StorageChange) -> usize {
        // No subscribers is not an error.
        self.sender.send(change).unwrap_or(0)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
