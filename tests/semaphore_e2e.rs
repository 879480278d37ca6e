use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rxsemaphore::{
    lock_states, IterSource, Observable, ObservableExt, Observer, PublishSubject, Semaphore,
    SemaphoreTransformer, TestObserver, UnderflowPolicy,
};

#[derive(Debug, PartialEq, Eq)]
struct Failure(&'static str);

type Lock = PublishSubject<bool, Arc<Failure>>;

fn setup() -> (Lock, Semaphore<Lock>, TestObserver<bool, Arc<Failure>>) {
    let lock = Lock::new();
    let observable = lock.clone().compose(SemaphoreTransformer::new());
    let observer = TestObserver::new();
    observer.subscribe_to(&observable);
    (lock, observable, observer)
}

#[test]
fn single_event_result_locked() {
    let (lock, _observable, observer) = setup();

    lock.emit(true);

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_value_count(1)
        .assert_values(&[false]);
}

#[test]
fn lock_and_unlock_result_unlocked() {
    let (lock, _observable, observer) = setup();

    lock.emit(true);
    lock.emit(false);

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_values(&[false, true]);
}

#[test]
fn multiple_lock_single_unlock_result_locked() {
    let (lock, _observable, observer) = setup();

    for v in [true, true, true, false] {
        lock.emit(v);
    }

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_values(&[false, false, false, false]);
}

#[test]
fn multiple_lock_multiple_unlock_result_unlocked() {
    let (lock, _observable, observer) = setup();

    for v in [true, true, true, false, false, false] {
        lock.emit(v);
    }

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_values(&[false, false, false, false, false, true]);
}

#[test]
fn single_lock_multiple_unlock_result_unlocked() {
    let (lock, _observable, observer) = setup();

    for v in [true, false, false, false] {
        lock.emit(v);
    }

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_values(&[false, true, true, true]);
}

#[test]
fn single_lock_then_complete_drops_later_values() {
    let (lock, _observable, observer) = setup();

    lock.emit(true);
    lock.complete();
    lock.emit(false);

    observer.assert_complete().assert_no_errors().assert_values(&[false]);
}

#[test]
fn single_lock_then_error_forwards_same_error() {
    let (lock, _observable, observer) = setup();
    let failure = Arc::new(Failure("upstream"));

    lock.emit(true);
    lock.fail(Arc::clone(&failure));
    lock.emit(false);

    observer.assert_terminated().assert_values(&[false]);
    assert_eq!(observer.error_count(), 1);
    let received = observer.error().expect("error forwarded");
    assert!(Arc::ptr_eq(&received, &failure));
}

#[test]
fn multiple_unlock_single_lock_result_unlocked() {
    let (lock, _observable, observer) = setup();

    for v in [false, false, false, true] {
        lock.emit(v);
    }

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_values(&[true, true, true, true]);
}

#[test]
fn disposed_observer_result_no_events() {
    let (lock, _observable, mut observer) = setup();

    observer.on_complete();
    observer.dispose();

    lock.emit(true);

    observer.assert_no_errors().assert_complete().assert_no_values();
    assert_eq!(lock.subscriber_count(), 0);
}

#[test]
fn unlock_multiple_subscribers_disposed_result_no_values_emitted() {
    let (lock, observable, observer) = setup();
    let observer2 = TestObserver::new();
    observer2.subscribe_to(&observable);

    observer.dispose();
    observer2.dispose();
    lock.emit(false);

    observer.assert_no_values().assert_no_errors();
    observer2.assert_no_values().assert_no_errors();
}

#[test]
fn unlock_single_subscriber_disposed_result_values_emitted_for_one() {
    let (lock, observable, observer) = setup();
    let observer2 = TestObserver::new();
    observer2.subscribe_to(&observable);

    lock.emit(true);
    observer2.dispose();
    lock.emit(false);

    observer
        .assert_not_complete()
        .assert_no_errors()
        .assert_values(&[false, true]);
    observer2.assert_no_errors().assert_values(&[false]);
}

#[test]
fn late_subscriber_starts_from_zero() {
    let (lock, observable, observer) = setup();

    lock.emit(true);
    lock.emit(true);

    let late = TestObserver::new();
    late.subscribe_to(&observable);
    lock.emit(false);

    observer.assert_values(&[false, false, false]);
    late.assert_values(&[true]);
}

#[test]
fn subscribers_keep_independent_balances_under_load() {
    let (lock, observable, observer) = setup();
    lock.emit(true);

    let second = TestObserver::new();
    second.subscribe_to(&observable);
    lock.emit(false);
    lock.emit(true);

    observer.assert_values(&[false, true, false]);
    second.assert_values(&[true, true]);
}

#[test]
fn saturating_policy_forgets_surplus_unlocks() {
    let lock = Lock::new();
    let observable = lock
        .clone()
        .compose(SemaphoreTransformer::with_policy(UnderflowPolicy::Saturate));
    let observer = TestObserver::new();
    observer.subscribe_to(&observable);

    for v in [false, false, false, true] {
        lock.emit(v);
    }

    observer.assert_values(&[true, true, true, false]);
}

#[test]
fn lock_state_shorthand_matches_compose() {
    let source: IterSource<bool, Arc<Failure>> = IterSource::new([true, true, false, false]);
    let via_compose = TestObserver::new();
    let via_shorthand = TestObserver::new();

    via_compose.subscribe_to(&source.clone().compose(SemaphoreTransformer::new()));
    via_shorthand.subscribe_to(&source.lock_state());

    assert_eq!(via_compose.notifications(), via_shorthand.notifications());
    via_shorthand
        .assert_values(&[false, false, false, true])
        .assert_complete();
}

#[test]
fn cold_source_error_passes_through() {
    let failure = Arc::new(Failure("cold"));
    let source = IterSource::new([true]).ending_with_error(Arc::clone(&failure));
    let observer = TestObserver::new();
    observer.subscribe_to(&source.lock_state());

    observer.assert_values(&[false]).assert_not_complete();
    assert!(Arc::ptr_eq(&observer.error().unwrap(), &failure));
}

#[test]
fn nested_composition_applies_twice() {
    let lock = Lock::new();
    let twice = lock.clone().lock_state().lock_state();
    let observer = TestObserver::new();
    observer.subscribe_to(&twice);

    // The inner gate emits false (locked) -> the outer sees an unlock.
    lock.emit(true);
    // Inner emits true (unlocked) -> outer sees a lock, balance back to 0.
    lock.emit(false);

    observer.assert_values(&[true, true]);
}

#[test]
fn subscribe_fn_receives_values() {
    let lock = Lock::new();
    let observable = lock.clone().lock_state();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let sub = observable.subscribe_fn(move |v| sink.lock().unwrap().push(v));
    lock.emit(true);
    sub.dispose();
    lock.emit(false);

    assert_eq!(*seen.lock().unwrap(), vec![false]);
    assert!(sub.is_disposed());
}

#[test]
fn dropping_subscription_disposes() {
    let lock = Lock::new();
    let observable = lock.clone().lock_state();
    let observer = TestObserver::new();

    {
        let _sub = observable.subscribe(observer.clone());
        lock.emit(true);
    }
    lock.emit(false);

    observer.assert_values(&[false]);
    assert_eq!(lock.subscriber_count(), 0);
}

#[test]
fn matches_iterator_form_for_all_short_sequences() {
    for len in 0..=8u32 {
        for bits in 0..(1u32 << len) {
            let input: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();

            let source: IterSource<bool, ()> = IterSource::new(input.clone());
            let observer = TestObserver::new();
            observer.subscribe_to(&source.lock_state());

            let expected: Vec<bool> = lock_states(input.iter().copied()).collect();
            assert_eq!(observer.values(), expected, "input {input:?}");
            assert_eq!(expected.len(), input.len());

            let mut balance = 0i64;
            for (v, out) in input.iter().zip(&expected) {
                balance += if *v { 1 } else { -1 };
                assert_eq!(*out, balance < 1, "input {input:?}");
            }
        }
    }
}

#[test]
fn transformed_source_is_object_safe() {
    let lock = Lock::new();
    let boxed: Box<dyn Observable<Item = bool, Error = Arc<Failure>>> =
        Box::new(lock.clone().lock_state());
    let observer = TestObserver::new();
    observer.subscribe_to(&*boxed);

    lock.emit(true);
    observer.assert_values(&[false]);
}

#[test]
fn observer_can_relock_the_gate_from_its_callback() {
    let (lock, observable, observer) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let feedback = lock.clone();

    // Re-acquire the lock every time it is released.
    let _sub = observable.subscribe_fn(move |unlocked| {
        sink.lock().unwrap().push(unlocked);
        if unlocked {
            feedback.emit(true);
        }
    });

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let producer = {
        let lock = lock.clone();
        thread::spawn(move || {
            lock.emit(true);
            lock.emit(false);
            done_tx.send(()).unwrap();
        })
    };
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("emit from inside a callback returned");
    producer.join().unwrap();

    observer.assert_no_errors().assert_values(&[false, true, false]);
    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
}
