//! Recording observer for tests.
//!
//! `TestObserver` records every signal it receives. Clones share the same
//! recording, so one clone can be handed to a source while the test keeps
//! another for assertions. The `assert_*` helpers panic with a descriptive
//! message on mismatch.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::observer::{Notification, Observer};
use crate::source::{Observable, ObservableExt};
use crate::subscription::{DisposeFlag, Subscription};

struct Recorded<T, E> {
    notifications: Vec<Notification<T, E>>,
    subscription: Option<Subscription>,
}

/// Observer that records what it receives.
pub struct TestObserver<T, E> {
    state: Arc<Mutex<Recorded<T, E>>>,
    disposed: DisposeFlag,
}

impl<T, E> Clone for TestObserver<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            disposed: self.disposed.clone(),
        }
    }
}

impl<T, E> Default for TestObserver<T, E> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(Recorded {
                notifications: Vec::new(),
                subscription: None,
            })),
            disposed: DisposeFlag::new(),
        }
    }
}

impl<T: Debug, E: Debug> Debug for TestObserver<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestObserver")
            .field("notifications", &self.lock().notifications)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T, E> TestObserver<T, E> {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe a clone of this observer to `source` and keep the
    /// subscription so `dispose` can cancel it.
    pub fn subscribe_to<S>(&self, source: &S)
    where
        S: Observable<Item = T, Error = E> + ?Sized,
        T: Send + 'static,
        E: Send + 'static,
    {
        let subscription = source.subscribe(self.clone());
        let previous = self.lock().subscription.replace(subscription);
        drop(previous);
    }

    /// Stop recording and cancel the subscription made by `subscribe_to`.
    pub fn dispose(&self) {
        self.disposed.dispose();
        let subscription = self.lock().subscription.take();
        if let Some(subscription) = subscription {
            subscription.dispose();
        }
    }

    /// Whether `dispose` has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    /// Number of values received.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.lock()
            .notifications
            .iter()
            .filter(|n| matches!(n, Notification::Next(_)))
            .count()
    }

    /// Number of completions received. More than one is a protocol violation.
    #[must_use]
    pub fn completion_count(&self) -> usize {
        self.lock()
            .notifications
            .iter()
            .filter(|n| matches!(n, Notification::Complete))
            .count()
    }

    /// Number of errors received. More than one is a protocol violation.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.lock()
            .notifications
            .iter()
            .filter(|n| matches!(n, Notification::Error(_)))
            .count()
    }

    /// Whether a completion was received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion_count() > 0
    }

    /// Whether a completion or an error was received.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.lock().notifications.iter().any(Notification::is_terminal)
    }
}

impl<T: Clone, E: Clone> TestObserver<T, E> {
    /// Every recorded signal, in arrival order.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification<T, E>> {
        self.lock().notifications.clone()
    }

    /// Received values, in order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.lock()
            .notifications
            .iter()
            .filter_map(|n| n.value().cloned())
            .collect()
    }

    /// The first received error.
    #[must_use]
    pub fn error(&self) -> Option<E> {
        self.lock().notifications.iter().find_map(|n| match n {
            Notification::Error(e) => Some(e.clone()),
            _ => None,
        })
    }
}

impl<T, E> TestObserver<T, E>
where
    T: Clone + PartialEq + Debug,
    E: Clone + Debug,
{
    /// Assert the exact value sequence.
    #[track_caller]
    pub fn assert_values(&self, expected: &[T]) -> &Self {
        assert_eq!(self.values(), expected, "unexpected values");
        self
    }

    /// Assert the number of values received.
    #[track_caller]
    pub fn assert_value_count(&self, expected: usize) -> &Self {
        assert_eq!(self.value_count(), expected, "unexpected value count: {:?}", self.notifications());
        self
    }

    /// Assert no value was received.
    #[track_caller]
    pub fn assert_no_values(&self) -> &Self {
        self.assert_value_count(0)
    }

    /// Assert exactly one completion and no error.
    #[track_caller]
    pub fn assert_complete(&self) -> &Self {
        assert_eq!(self.completion_count(), 1, "expected completion: {:?}", self.notifications());
        self.assert_no_errors()
    }

    /// Assert no completion was received.
    #[track_caller]
    pub fn assert_not_complete(&self) -> &Self {
        assert_eq!(self.completion_count(), 0, "unexpected completion: {:?}", self.notifications());
        self
    }

    /// Assert no error was received.
    #[track_caller]
    pub fn assert_no_errors(&self) -> &Self {
        assert_eq!(self.error_count(), 0, "unexpected error: {:?}", self.notifications());
        self
    }

    /// Assert a terminal signal was received.
    #[track_caller]
    pub fn assert_terminated(&self) -> &Self {
        assert!(self.is_terminated(), "expected termination: {:?}", self.notifications());
        self
    }
}

impl<T: Send, E: Send> Observer<T, E> for TestObserver<T, E> {
    fn on_next(&mut self, value: T) {
        if !self.is_disposed() {
            self.lock().notifications.push(Notification::Next(value));
        }
    }

    fn on_error(&mut self, error: E) {
        if !self.is_disposed() {
            self.lock().notifications.push(Notification::Error(error));
        }
    }

    fn on_complete(&mut self) {
        if !self.is_disposed() {
            self.lock().notifications.push(Notification::Complete);
        }
    }
}
