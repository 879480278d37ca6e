use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::config::SemaphoreConfig;
use crate::error::{SemaphoreError, SemaphoreResult};
use crate::observer::{Notification, Observer};
use crate::source::{Observable, ObservableExt};
use crate::subscription::{Subscription, SubscriptionId};

const STREAM_PATH: &str = "notification_stream";

/// Pull-based view of a subscription.
///
/// Signals are buffered in a bounded channel. Delivery never blocks the
/// source: when the buffer is full the signal is dropped and counted.
/// Dropping this stream disposes the underlying subscription.
#[derive(Debug)]
pub struct NotificationStream<T, E> {
    subscription: Subscription,
    rx: Receiver<Notification<T, E>>,
    dropped: Arc<AtomicU64>,
}

struct ChannelObserver<T, E> {
    tx: Sender<Notification<T, E>>,
    dropped: Arc<AtomicU64>,
}

impl<T: Send, E: Send> ChannelObserver<T, E> {
    fn push(&self, notification: Notification<T, E>) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(terminal = n.is_terminal(), "notification stream full, signal dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<T: Send, E: Send> Observer<T, E> for ChannelObserver<T, E> {
    fn on_next(&mut self, value: T) {
        self.push(Notification::Next(value));
    }

    fn on_error(&mut self, error: E) {
        self.push(Notification::Error(error));
    }

    fn on_complete(&mut self) {
        self.push(Notification::Complete);
    }
}

impl<T, E> NotificationStream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Subscribe to `source` with a buffer sized by `config`.
    pub fn subscribe<S>(source: &S, config: &SemaphoreConfig) -> SemaphoreResult<Self>
    where
        S: Observable<Item = T, Error = E> + ?Sized,
    {
        config.validate()?;

        let (tx, rx) = bounded(config.stream_capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let subscription = source.subscribe(ChannelObserver {
            tx,
            dropped: Arc::clone(&dropped),
        });

        Ok(Self {
            subscription,
            rx,
            dropped,
        })
    }
}

impl<T, E> NotificationStream<T, E> {
    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Stop receiving new signals. Already buffered ones remain readable.
    pub fn unsubscribe(&self) {
        self.subscription.dispose();
    }

    /// Signals dropped because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Receive the next signal (blocking).
    ///
    /// Fails with `Disconnected` once the buffer is drained and the source has
    /// released its end (after termination or unsubscribe).
    pub fn recv(&self) -> SemaphoreResult<Notification<T, E>> {
        self.rx.recv().map_err(|_| SemaphoreError::disconnected(STREAM_PATH))
    }

    /// Receive the next signal with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> SemaphoreResult<Notification<T, E>> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => SemaphoreError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            },
            RecvTimeoutError::Disconnected => SemaphoreError::disconnected(STREAM_PATH),
        })
    }

    /// Receive a buffered signal without blocking.
    pub fn try_recv(&self) -> SemaphoreResult<Option<Notification<T, E>>> {
        match self.rx.try_recv() {
            Ok(n) => Ok(Some(n)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SemaphoreError::disconnected(STREAM_PATH)),
        }
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<Notification<T, E>> {
        self.rx.try_iter().collect()
    }
}
