use super::LogTransport;
use std::sync::Arc;
use tokio::sync::Notify;

/// [`LogTransport`] that wakes an async sync loop.
///
/// Requests arriving while the loop is busy coalesce into a single wakeup.
#[derive(Debug, Clone, Default)]
pub struct SignalTransport {
    notify: Arc<Notify>,
}

impl SignalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a sync was requested since the last wakeup.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

impl LogTransport for SignalTransport {
    fn sync(&self) {
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sync_before_wait_is_not_lost() {
        let transport = SignalTransport::new();
        transport.sync();
        transport.sync();

        tokio::time::timeout(Duration::from_millis(100), transport.notified())
            .await
            .expect("stored permit should wake the waiter");

        // Both requests collapsed into one permit.
        let second = tokio::time::timeout(Duration::from_millis(20), transport.notified()).await;
        assert!(second.is_err());
    }
}
