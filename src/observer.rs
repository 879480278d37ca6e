//! Observer contract and stream notifications.
//!
//! Sources push three kinds of signals into an observer: zero or more values,
//! then at most one terminal signal (an error or a completion). Nothing may be
//! delivered after a terminal signal; `SafeObserver` enforces that rule for
//! every observer attached through `ObservableExt::subscribe`.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Receiver of pushed stream signals.
pub trait Observer<T, E>: Send {
    /// A value was produced.
    fn on_next(&mut self, value: T);

    /// The stream failed. Terminal.
    fn on_error(&mut self, error: E);

    /// The stream finished. Terminal.
    fn on_complete(&mut self);
}

/// Owned, type-erased observer as stored by sources.
pub type BoxObserver<T, E> = Box<dyn Observer<T, E>>;

impl<T, E, O> Observer<T, E> for Box<O>
where
    O: Observer<T, E> + ?Sized,
{
    fn on_next(&mut self, value: T) {
        (**self).on_next(value);
    }

    fn on_error(&mut self, error: E) {
        (**self).on_error(error);
    }

    fn on_complete(&mut self) {
        (**self).on_complete();
    }
}

/// A single materialized stream signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Notification<T, E> {
    /// A value.
    Next(T),
    /// Terminal failure carrying the upstream error.
    Error(E),
    /// Terminal completion.
    Complete,
}

impl<T, E> Notification<T, E> {
    /// Returns true for `Error` and `Complete`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Complete)
    }

    /// The carried value, if this is `Next`.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Replays this signal into `observer`.
    pub fn dispatch<O>(self, observer: &mut O)
    where
        O: Observer<T, E> + ?Sized,
    {
        match self {
            Self::Next(v) => observer.on_next(v),
            Self::Error(e) => observer.on_error(e),
            Self::Complete => observer.on_complete(),
        }
    }
}

/// Drops every signal that arrives after the first terminal one.
#[derive(Debug)]
pub struct SafeObserver<O> {
    inner: O,
    done: bool,
}

impl<O> SafeObserver<O> {
    /// Wrap `inner`.
    #[must_use]
    pub const fn new(inner: O) -> Self {
        Self { inner, done: false }
    }

    /// Whether a terminal signal has been forwarded.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Unwrap the inner observer.
    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<T, E, O> Observer<T, E> for SafeObserver<O>
where
    O: Observer<T, E>,
{
    fn on_next(&mut self, value: T) {
        if !self.done {
            self.inner.on_next(value);
        }
    }

    fn on_error(&mut self, error: E) {
        if !self.done {
            self.done = true;
            self.inner.on_error(error);
        }
    }

    fn on_complete(&mut self) {
        if !self.done {
            self.done = true;
            self.inner.on_complete();
        }
    }
}

/// Observer backed by a closure over values.
///
/// Completion is ignored. An error is logged at `warn` level and then
/// discarded, since the closure has no way to receive it.
pub struct FnObserver<F, T> {
    next: F,
    _marker: PhantomData<fn(T)>,
}

impl<F, T> FnObserver<F, T>
where
    F: FnMut(T) + Send,
{
    /// Wrap a value callback.
    pub const fn new(next: F) -> Self {
        Self {
            next,
            _marker: PhantomData,
        }
    }
}

impl<F, T> std::fmt::Debug for FnObserver<F, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnObserver").finish_non_exhaustive()
    }
}

impl<F, T, E> Observer<T, E> for FnObserver<F, T>
where
    F: FnMut(T) + Send,
{
    fn on_next(&mut self, value: T) {
        (self.next)(value);
    }

    fn on_error(&mut self, _error: E) {
        tracing::warn!("upstream error discarded by value-only observer");
    }

    fn on_complete(&mut self) {}
}
