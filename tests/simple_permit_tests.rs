//! Integration tests for `SimplePermit`: the fast, hook-free, select-free
//! consuming permit.

use permit_sync::{PermitError, SimplePermit};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn grant_then_wait_succeeds_immediately() {
    let permit = SimplePermit::new(true);
    permit.wait().unwrap();
}

#[test]
fn wait_blocks_until_granted() {
    let permit = Arc::new(SimplePermit::new(false));
    let waiter = {
        let permit = permit.clone();
        thread::spawn(move || permit.wait().unwrap())
    };

    thread::sleep(Duration::from_millis(50));
    permit.grant().unwrap();
    waiter.join().unwrap();
}

#[test]
fn grant_consumed_by_exactly_one_waiter() {
    let permit = Arc::new(SimplePermit::new(false));
    let winners = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let permit = permit.clone();
            let winners = winners.clone();
            thread::spawn(move || {
                if permit.wait_for(Duration::from_millis(200)).is_ok() {
                    winners.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    permit.grant().unwrap();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(winners.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn wait_for_times_out_without_grant() {
    let permit = SimplePermit::new(false);
    let result = permit.wait_for(Duration::from_millis(20));
    assert!(matches!(result, Err(PermitError::Timeout)));
}

#[test]
fn revoke_undoes_a_grant_not_yet_waited_on() {
    let permit = SimplePermit::new(false);
    permit.grant().unwrap();
    permit.revoke();
    let result = permit.wait_for(Duration::from_millis(20));
    assert!(matches!(result, Err(PermitError::Timeout)));
}

#[test]
fn try_wait_never_blocks() {
    let permit = SimplePermit::new(false);
    assert!(!permit.try_wait());
    permit.grant().unwrap();
    assert!(permit.try_wait());
    assert!(!permit.try_wait());
}

#[test]
fn close_wakes_blocked_waiters_with_invalid() {
    let permit = Arc::new(SimplePermit::new(false));
    let waiter = {
        let permit = permit.clone();
        thread::spawn(move || permit.wait())
    };

    thread::sleep(Duration::from_millis(50));
    permit.close();

    assert!(matches!(waiter.join().unwrap(), Err(PermitError::Invalid)));
}

#[test]
fn grant_after_close_is_invalid() {
    let permit = SimplePermit::new(false);
    permit.close();
    assert!(matches!(permit.grant(), Err(PermitError::Invalid)));
}

#[test]
fn wait_with_releases_external_mutex_while_blocked() {
    let permit = Arc::new(SimplePermit::new(false));
    let mutex = Arc::new(parking_lot::Mutex::new(0u32));

    let waiter = {
        let permit = permit.clone();
        let mutex = mutex.clone();
        thread::spawn(move || {
            let mut guard = mutex.lock();
            *guard += 1;
            permit.wait_with(&mut guard).unwrap();
            *guard += 1;
        })
    };

    // The waiter must have released the mutex while blocked, or this
    // would deadlock against the waiter's own lock.
    thread::sleep(Duration::from_millis(50));
    *mutex.lock() += 10;
    permit.grant().unwrap();
    waiter.join().unwrap();

    assert_eq!(*mutex.lock(), 12);
}
