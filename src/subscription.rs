//! Subscription handles.
//!
//! A `Subscription` is returned for every attached observer. Disposing it
//! flips a shared `DisposeFlag` that the source checks before each delivery,
//! then runs the source's teardown (for a subject, removing the observer from
//! its registry). Dropping the handle disposes it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a subscription.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared cancellation flag between a handle and the source delivering to it.
#[derive(Debug, Clone, Default)]
pub struct DisposeFlag(Arc<AtomicBool>);

impl DisposeFlag {
    /// A live flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark disposed. Returns true only for the call that flipped the flag.
    pub fn dispose(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Whether the flag has been flipped.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle to an attached observer.
#[must_use = "dropping a Subscription disposes it"]
pub struct Subscription {
    id: SubscriptionId,
    flag: DisposeFlag,
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, flag: DisposeFlag, teardown: Option<Teardown>) -> Self {
        Self {
            id,
            flag,
            teardown: Mutex::new(teardown),
        }
    }

    /// A handle that is already disposed.
    ///
    /// Returned by sources that terminate the observer during `subscribe`.
    pub fn empty() -> Self {
        let flag = DisposeFlag::new();
        flag.dispose();
        Self::new(SubscriptionId::new(), flag, None)
    }

    /// The subscription id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether this subscription no longer receives signals.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.flag.is_disposed()
    }

    /// Stop delivery to the attached observer. Idempotent.
    ///
    /// Takes effect before the next signal the source delivers.
    pub fn dispose(&self) {
        if !self.flag.dispose() {
            return;
        }

        tracing::debug!(subscription_id = %self.id, "subscription disposed");

        let teardown = self
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_subscription() -> (Subscription, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let sub = Subscription::new(
            SubscriptionId::new(),
            DisposeFlag::new(),
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        (sub, runs)
    }

    #[test]
    fn dispose_runs_teardown_once() {
        let (sub, runs) = counting_subscription();
        assert!(!sub.is_disposed());

        sub.dispose();
        sub.dispose();

        assert!(sub.is_disposed());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_disposes() {
        let (sub, runs) = counting_subscription();
        drop(sub);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn flag_is_shared() {
        let flag = DisposeFlag::new();
        let sub = Subscription::new(SubscriptionId::new(), flag.clone(), None);
        sub.dispose();
        assert!(flag.is_disposed());
        assert!(!flag.dispose());
    }

    #[test]
    fn empty_is_disposed() {
        assert!(Subscription::empty().is_disposed());
    }

    #[test]
    fn id_serializes_as_plain_uuid() {
        let uuid = Uuid::new_v4();
        let id = SubscriptionId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
        assert_eq!(id.to_string(), uuid.to_string());
    }
}
