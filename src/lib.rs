//! # rxsemaphore - a counting-semaphore gate for push-based streams
//!
//! rxsemaphore turns a stream of lock requests into a stream of gate states.
//! Every `true` upstream is a lock request and every `false` an unlock
//! request; after each one the operator emits whether the gate is open
//! (`true`) or held (`false`).
//!
//! ## Core Concepts
//!
//! - **Observable**: a push-based source; `PublishSubject` is the hot,
//!   multicast one
//! - **Subscription**: an attached observer's handle; disposing it (or
//!   dropping it) stops delivery
//! - **SemaphoreTransformer**: the operator, applied with `compose`
//! - **LockCounter**: the per-subscription balance behind each emitted value
//!
//! ## Usage
//!
//! ```rust
//! use rxsemaphore::{ObservableExt, PublishSubject, SemaphoreTransformer, TestObserver};
//!
//! let lock: PublishSubject<bool, String> = PublishSubject::new();
//! let gate = lock.clone().compose(SemaphoreTransformer::new());
//!
//! let observer = TestObserver::new();
//! observer.subscribe_to(&gate);
//!
//! lock.emit(true);
//! lock.emit(false);
//!
//! observer.assert_values(&[false, true]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observer;
pub mod semaphore;
pub mod source;
pub mod stream;
pub mod subject;
pub mod subscription;
pub mod testing;

// Re-export primary types at crate root for convenience
pub use config::SemaphoreConfig;
pub use error::{ConfigError, SemaphoreError, SemaphoreResult};
pub use observer::{BoxObserver, FnObserver, Notification, Observer, SafeObserver};
pub use semaphore::{
	lock_states, lock_states_with, LockCounter, LockSignal, LockState, LockStates, Semaphore,
	SemaphoreObserver, SemaphoreTransformer, UnderflowPolicy,
};
pub use source::{IterSource, Observable, ObservableExt, Transformer};
pub use stream::NotificationStream;
pub use subject::PublishSubject;
pub use subscription::{DisposeFlag, Subscription, SubscriptionId};
pub use testing::TestObserver;
