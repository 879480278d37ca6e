//! The lock-state operator.
//!
//! Upstream carries lock requests (`true`) and unlock requests (`false`).
//! Each subscription keeps its own balance, created at zero when it
//! subscribes, and after every request emits whether the gate is open:
//!
//! | balance | state      | emitted |
//! |---------|------------|---------|
//! | <= 0    | `Unlocked` | `true`  |
//! | > 0     | `Locked`   | `false` |
//!
//! One value is emitted per upstream value, with no deduplication. Errors and
//! completion pass through untouched. Surplus unlocks never raise an error;
//! `UnderflowPolicy` decides whether they are remembered.

use serde::{Deserialize, Serialize};

use crate::config::SemaphoreConfig;
use crate::observer::{BoxObserver, Observer};
use crate::source::{Observable, Transformer};
use crate::subscription::Subscription;

/// An upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockSignal {
    /// Acquire (`true` on the wire).
    Lock,
    /// Release (`false` on the wire).
    Unlock,
}

impl From<bool> for LockSignal {
    fn from(value: bool) -> Self {
        if value {
            Self::Lock
        } else {
            Self::Unlock
        }
    }
}

impl From<LockSignal> for bool {
    fn from(signal: LockSignal) -> Self {
        matches!(signal, LockSignal::Lock)
    }
}

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// At least one outstanding lock.
    Locked,
    /// No outstanding locks.
    Unlocked,
}

impl LockState {
    /// The boolean emitted downstream: `false` while locked, `true` once open.
    #[must_use]
    pub const fn emitted(self) -> bool {
        matches!(self, Self::Unlocked)
    }

    /// Inverse of [`LockState::emitted`].
    #[must_use]
    pub const fn from_emitted(value: bool) -> Self {
        if value {
            Self::Unlocked
        } else {
            Self::Locked
        }
    }

    /// Returns true for `Locked`.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }
}

/// What an unlock does when no lock is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderflowPolicy {
    /// Keep a signed balance: surplus unlocks offset later locks.
    #[default]
    Carry,
    /// Clamp at zero: surplus unlocks are forgotten.
    Saturate,
}

/// Lock balance for a single subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockCounter {
    balance: i64,
    policy: UnderflowPolicy,
}

impl LockCounter {
    /// A counter at zero using the default policy.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_policy(UnderflowPolicy::Carry)
    }

    /// A counter at zero using `policy`.
    #[must_use]
    pub const fn with_policy(policy: UnderflowPolicy) -> Self {
        Self { balance: 0, policy }
    }

    /// Locks minus unlocks. Never negative under `Saturate`.
    #[must_use]
    pub const fn balance(&self) -> i64 {
        self.balance
    }

    /// The underflow policy.
    #[must_use]
    pub const fn policy(&self) -> UnderflowPolicy {
        self.policy
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LockState {
        if self.balance > 0 {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    /// Apply one request and return the resulting state.
    pub fn apply(&mut self, signal: LockSignal) -> LockState {
        self.balance = match (signal, self.policy) {
            (LockSignal::Lock, _) => self.balance.saturating_add(1),
            (LockSignal::Unlock, UnderflowPolicy::Carry) => self.balance.saturating_sub(1),
            (LockSignal::Unlock, UnderflowPolicy::Saturate) => (self.balance - 1).max(0),
        };
        self.state()
    }
}

/// Per-subscription half of the operator. Owns the counter.
pub struct SemaphoreObserver<E> {
    counter: LockCounter,
    downstream: BoxObserver<bool, E>,
}

impl<E> SemaphoreObserver<E> {
    /// Start a fresh counter in front of `downstream`.
    pub fn new(downstream: BoxObserver<bool, E>, policy: UnderflowPolicy) -> Self {
        Self {
            counter: LockCounter::with_policy(policy),
            downstream,
        }
    }

    /// The counter as it stands.
    #[must_use]
    pub const fn counter(&self) -> LockCounter {
        self.counter
    }
}

impl<E> std::fmt::Debug for SemaphoreObserver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreObserver")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl<E> Observer<bool, E> for SemaphoreObserver<E> {
    fn on_next(&mut self, value: bool) {
        let signal = LockSignal::from(value);
        let state = self.counter.apply(signal);
        tracing::trace!(?signal, ?state, balance = self.counter.balance(), "lock request applied");
        self.downstream.on_next(state.emitted());
    }

    fn on_error(&mut self, error: E) {
        self.downstream.on_error(error);
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }
}

/// Source produced by [`SemaphoreTransformer`]: `upstream` with every
/// subscription routed through its own `SemaphoreObserver`.
#[derive(Debug, Clone)]
pub struct Semaphore<S> {
    upstream: S,
    policy: UnderflowPolicy,
}

impl<S> Semaphore<S> {
    /// Wrap `upstream` with the default policy.
    pub const fn new(upstream: S) -> Self {
        Self::with_policy(upstream, UnderflowPolicy::Carry)
    }

    /// Wrap `upstream` with `policy`.
    pub const fn with_policy(upstream: S, policy: UnderflowPolicy) -> Self {
        Self { upstream, policy }
    }

    /// The wrapped source.
    pub const fn upstream(&self) -> &S {
        &self.upstream
    }

    /// Policy handed to each new subscription.
    pub const fn policy(&self) -> UnderflowPolicy {
        self.policy
    }

    /// Unwrap.
    pub fn into_inner(self) -> S {
        self.upstream
    }
}

impl<S> Observable for Semaphore<S>
where
    S: Observable<Item = bool>,
{
    type Item = bool;
    type Error = S::Error;

    fn subscribe_boxed(&self, observer: BoxObserver<bool, S::Error>) -> Subscription {
        self.upstream
            .subscribe_boxed(Box::new(SemaphoreObserver::new(observer, self.policy)))
    }
}

/// Converts a stream of lock/unlock requests into a stream of gate states.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemaphoreTransformer {
    policy: UnderflowPolicy,
}

impl SemaphoreTransformer {
    /// The transformer with the default policy. All state lives in
    /// subscriptions.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_policy(UnderflowPolicy::Carry)
    }

    /// The transformer with `policy`.
    #[must_use]
    pub const fn with_policy(policy: UnderflowPolicy) -> Self {
        Self { policy }
    }

    /// Built from configuration.
    #[must_use]
    pub const fn from_config(config: &SemaphoreConfig) -> Self {
        Self::with_policy(config.underflow)
    }
}

impl<S> Transformer<S> for SemaphoreTransformer
where
    S: Observable<Item = bool>,
{
    type Output = Semaphore<S>;

    fn apply(&self, upstream: S) -> Semaphore<S> {
        Semaphore::with_policy(upstream, self.policy)
    }
}

/// Iterator form of the operator, for finite in-memory sequences.
#[derive(Debug, Clone)]
pub struct LockStates<I> {
    signals: I,
    counter: LockCounter,
}

/// Map each request in `signals` to the emitted gate value.
pub fn lock_states<I>(signals: I) -> LockStates<I::IntoIter>
where
    I: IntoIterator<Item = bool>,
{
    lock_states_with(signals, UnderflowPolicy::Carry)
}

/// [`lock_states`] with an explicit policy.
pub fn lock_states_with<I>(signals: I, policy: UnderflowPolicy) -> LockStates<I::IntoIter>
where
    I: IntoIterator<Item = bool>,
{
    LockStates {
        signals: signals.into_iter(),
        counter: LockCounter::with_policy(policy),
    }
}

impl<I> Iterator for LockStates<I>
where
    I: Iterator<Item = bool>,
{
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let value = self.signals.next()?;
        Some(self.counter.apply(LockSignal::from(value)).emitted())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.signals.size_hint()
    }
}

impl<I> ExactSizeIterator for LockStates<I> where I: ExactSizeIterator<Item = bool> {}
