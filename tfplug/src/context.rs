//! Request-scoped context passed to every provider, resource, and data
//! source operation. Carries a cancellation signal, an optional deadline,
//! and arbitrary keyed values.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
    cancel_tx: watch::Sender<bool>,
    cancelled_rx: watch::Receiver<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Derives a context that cancels itself once the timeout elapses
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let ctx = Self::build(Some(deadline));
        let tx = ctx.inner.cancel_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline.into()).await;
            let _ = tx.send(true);
        });
        ctx
    }

    fn build(deadline: Option<Instant>) -> Self {
        let (cancel_tx, cancelled_rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                deadline,
                values: RwLock::new(HashMap::new()),
                cancel_tx,
                cancelled_rx,
            }),
        }
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        self.inner
            .values
            .write()
            .await
            .insert(key.to_string(), Box::new(value));
        self
    }

    /// Returns a clone of the stored value when the key exists and the type
    /// matches
    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.inner.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled_rx.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Receiver that flips to true on cancellation; await `changed()` on it
    /// to react without polling
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.cancelled_rx.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.cancel_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_are_shared_across_clones() {
        let ctx = Context::new()
            .with_value("base_dn", "DC=example,DC=com".to_string())
            .await;
        let cloned = ctx.clone();

        assert_eq!(
            cloned.get_value::<String>("base_dn").await.as_deref(),
            Some("DC=example,DC=com")
        );
        assert!(cloned.get_value::<String>("missing").await.is_none());
    }

    #[tokio::test]
    async fn timeout_sets_deadline_and_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(20));
        assert!(ctx.deadline().is_some());
        assert!(!ctx.is_cancelled());

        let mut done = ctx.done();
        done.changed().await.unwrap();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn manual_cancel_is_visible_to_clones() {
        let ctx = Context::new();
        let watcher = ctx.clone();
        assert!(!watcher.is_cancelled());

        ctx.cancel();
        assert!(watcher.is_cancelled());
    }
}
