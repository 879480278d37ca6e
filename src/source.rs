//! Observable sources and operator composition.

use std::sync::Arc;

use crate::observer::{BoxObserver, FnObserver, Observer, SafeObserver};
use crate::semaphore::Semaphore;
use crate::subscription::{DisposeFlag, Subscription, SubscriptionId};

/// A push-based source of values.
///
/// Implementations deliver synchronously on the thread that drives the source
/// and must check the returned subscription's disposal before every delivery.
pub trait Observable {
    /// Value type.
    type Item: Send + 'static;
    /// Error type carried by terminal failures.
    type Error: Send + 'static;

    /// Attach an already boxed observer.
    fn subscribe_boxed(&self, observer: BoxObserver<Self::Item, Self::Error>) -> Subscription;
}

impl<S> Observable for &S
where
    S: Observable + ?Sized,
{
    type Item = S::Item;
    type Error = S::Error;

    fn subscribe_boxed(&self, observer: BoxObserver<Self::Item, Self::Error>) -> Subscription {
        (**self).subscribe_boxed(observer)
    }
}

impl<S> Observable for Arc<S>
where
    S: Observable + ?Sized,
{
    type Item = S::Item;
    type Error = S::Error;

    fn subscribe_boxed(&self, observer: BoxObserver<Self::Item, Self::Error>) -> Subscription {
        (**self).subscribe_boxed(observer)
    }
}

/// Turns one source into another (the `compose` seam).
pub trait Transformer<S> {
    /// The resulting source.
    type Output;

    /// Wrap `upstream`.
    fn apply(&self, upstream: S) -> Self::Output;
}

/// Convenience methods available on every `Observable`.
pub trait ObservableExt: Observable {
    /// Attach `observer`. Signals after the first terminal one are dropped.
    fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<Self::Item, Self::Error> + 'static,
    {
        self.subscribe_boxed(Box::new(SafeObserver::new(observer)))
    }

    /// Attach a value callback.
    ///
    /// Completion is ignored. An upstream error is logged at `warn` level and
    /// discarded; use [`subscribe`](Self::subscribe) with a full observer to
    /// handle it.
    fn subscribe_fn<F>(&self, next: F) -> Subscription
    where
        F: FnMut(Self::Item) + Send + 'static,
    {
        self.subscribe(FnObserver::<F, Self::Item>::new(next))
    }

    /// Apply `transformer` to this source.
    fn compose<X>(self, transformer: X) -> X::Output
    where
        Self: Sized,
        X: Transformer<Self>,
    {
        transformer.apply(self)
    }

    /// Shorthand for `compose(SemaphoreTransformer::new())`.
    fn lock_state(self) -> Semaphore<Self>
    where
        Self: Sized + Observable<Item = bool>,
    {
        Semaphore::new(self)
    }
}

impl<S> ObservableExt for S where S: Observable + ?Sized {}

/// Cold source that replays a fixed sequence to every subscriber, then
/// terminates with completion or with the configured error.
#[derive(Debug, Clone)]
pub struct IterSource<T, E> {
    items: Vec<T>,
    error: Option<E>,
}

impl<T, E> IterSource<T, E> {
    /// Replay `items` and complete.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            error: None,
        }
    }

    /// Replay the items, then fail with `error` instead of completing.
    #[must_use]
    pub fn ending_with_error(mut self, error: E) -> Self {
        self.error = Some(error);
        self
    }
}

impl<T, E> Observable for IterSource<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Item = T;
    type Error = E;

    fn subscribe_boxed(&self, mut observer: BoxObserver<T, E>) -> Subscription {
        let id = SubscriptionId::new();
        let flag = DisposeFlag::new();
        tracing::trace!(subscription_id = %id, items = self.items.len(), "replaying sequence");

        for item in &self.items {
            observer.on_next(item.clone());
        }

        match &self.error {
            Some(e) => observer.on_error(e.clone()),
            None => observer.on_complete(),
        }
        flag.dispose();
        Subscription::new(id, flag, None)
    }
}
