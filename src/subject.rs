//! Hot multicast source.
//!
//! `PublishSubject` owns a registry of attached observers and pushes every
//! signal it is fed to the ones that are still live. Subscribers only see
//! signals emitted after they attached. Once terminated, the subject drops
//! further values and hands the stored terminal signal to late subscribers.
//!
//! The registry lock is never held while an observer runs, so observers may
//! dispose subscriptions (their own or others') from inside a callback.
//! An observer may also feed the subject it is attached to: the nested signal
//! is queued on its slot and delivered once the current callback returns.
//! Other subscribers receive it immediately.
//!
//! Once a slot has delivered its terminal signal, its subscription reports
//! disposed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use crate::observer::{BoxObserver, Notification, Observer};
use crate::source::Observable;
use crate::subscription::{DisposeFlag, Subscription, SubscriptionId};

#[derive(Debug, Clone)]
enum Terminal<E> {
    Completed,
    Failed(E),
}

struct Slot<T, E> {
    flag: DisposeFlag,
    observer: Mutex<BoxObserver<T, E>>,
    pending: Mutex<VecDeque<Notification<T, E>>>,
}

impl<T, E> Slot<T, E> {
    fn new(flag: DisposeFlag, observer: BoxObserver<T, E>) -> Self {
        Self {
            flag,
            observer: Mutex::new(observer),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Notification<T, E>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `signal` and drain the queue unless another delivery to this
    /// slot is in progress, in which case that delivery drains it before
    /// returning. Signals reach the observer one at a time, in order.
    fn deliver(&self, signal: Notification<T, E>) {
        if self.flag.is_disposed() {
            return;
        }
        self.queue().push_back(signal);

        loop {
            let mut observer = match self.observer.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            loop {
                if self.flag.is_disposed() {
                    self.queue().clear();
                    break;
                }
                let Some(next) = self.queue().pop_front() else {
                    break;
                };
                let terminal = next.is_terminal();
                next.dispatch(&mut *observer);
                if terminal {
                    self.flag.dispose();
                }
            }
            drop(observer);

            // A signal queued between the last pop and the unlock found the
            // observer busy and left it to us.
            if self.queue().is_empty() {
                return;
            }
        }
    }
}

struct Registry<T, E> {
    slots: Vec<(SubscriptionId, Arc<Slot<T, E>>)>,
    terminal: Option<Terminal<E>>,
}

impl<T, E> Registry<T, E> {
    fn remove(&mut self, id: SubscriptionId) -> Option<Arc<Slot<T, E>>> {
        let pos = self.slots.iter().position(|(sid, _)| *sid == id)?;
        Some(self.slots.swap_remove(pos).1)
    }
}

/// A source that is also an observer: whatever it is fed is multicast to its
/// current subscribers.
///
/// Cloning yields another handle to the same subject.
pub struct PublishSubject<T, E> {
    registry: Arc<Mutex<Registry<T, E>>>,
}

impl<T, E> Clone for PublishSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T, E> Default for PublishSubject<T, E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                slots: Vec::new(),
                terminal: None,
            })),
        }
    }
}

impl<T, E> std::fmt::Debug for PublishSubject<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg = self.lock();
        f.debug_struct("PublishSubject")
            .field("subscribers", &reg.slots.len())
            .field("terminated", &reg.terminal.is_some())
            .finish()
    }
}

impl<T, E> PublishSubject<T, E> {
    /// A fresh subject with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T, E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of attached, non-disposed subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .slots
            .iter()
            .filter(|(_, slot)| !slot.flag.is_disposed())
            .count()
    }

    /// Whether `complete` or `fail` has been called.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.lock().terminal.is_some()
    }

    fn snapshot(&self) -> Option<Vec<Arc<Slot<T, E>>>> {
        let reg = self.lock();
        if reg.terminal.is_some() {
            return None;
        }
        Some(reg.slots.iter().map(|(_, slot)| Arc::clone(slot)).collect())
    }

    fn terminate(&self, terminal: Terminal<E>) -> Option<Vec<Arc<Slot<T, E>>>> {
        let mut reg = self.lock();
        if reg.terminal.is_some() {
            return None;
        }
        reg.terminal = Some(terminal);
        Some(std::mem::take(&mut reg.slots).into_iter().map(|(_, slot)| slot).collect())
    }
}

impl<T, E> PublishSubject<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Push `value` to every live subscriber. Dropped after termination.
    pub fn emit(&self, value: T) {
        let Some(slots) = self.snapshot() else {
            tracing::trace!("value dropped: subject already terminated");
            return;
        };
        for slot in slots {
            slot.deliver(Notification::Next(value.clone()));
        }
    }

    /// Fail every live subscriber with `error` and terminate the subject.
    pub fn fail(&self, error: E) {
        let Some(slots) = self.terminate(Terminal::Failed(error.clone())) else {
            tracing::trace!("error dropped: subject already terminated");
            return;
        };
        tracing::debug!(subscribers = slots.len(), "subject failed");
        for slot in slots {
            slot.deliver(Notification::Error(error.clone()));
        }
    }

    /// Complete every live subscriber and terminate the subject.
    pub fn complete(&self) {
        let Some(slots) = self.terminate(Terminal::Completed) else {
            return;
        };
        tracing::debug!(subscribers = slots.len(), "subject completed");
        for slot in slots {
            slot.deliver(Notification::Complete);
        }
    }
}

impl<T, E> Observable for PublishSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Item = T;
    type Error = E;

    fn subscribe_boxed(&self, mut observer: BoxObserver<T, E>) -> Subscription {
        let id = SubscriptionId::new();
        let flag = DisposeFlag::new();

        let mut reg = self.lock();
        if let Some(terminal) = reg.terminal.clone() {
            drop(reg);
            tracing::debug!(subscription_id = %id, "late subscriber to terminated subject");
            match terminal {
                Terminal::Completed => observer.on_complete(),
                Terminal::Failed(e) => observer.on_error(e),
            }
            return Subscription::empty();
        }

        reg.slots.push((
            id,
            Arc::new(Slot::new(flag.clone(), observer)),
        ));
        drop(reg);
        tracing::debug!(subscription_id = %id, "subscribed");

        let registry: Weak<Mutex<Registry<T, E>>> = Arc::downgrade(&self.registry);
        Subscription::new(
            id,
            flag,
            Some(Box::new(move || {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                // Drop the removed slot only after releasing the lock: its
                // observer may own another subscription to this subject.
                let removed = registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(id);
                drop(removed);
            })),
        )
    }
}

impl<T, E> Observer<T, E> for PublishSubject<T, E>
where
    T: Clone + Send,
    E: Clone + Send,
{
    fn on_next(&mut self, value: T) {
        self.emit(value);
    }

    fn on_error(&mut self, error: E) {
        self.fail(error);
    }

    fn on_complete(&mut self) {
        self.complete();
    }
}
