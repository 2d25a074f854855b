//! Integration tests for the select operator across multiple general
//! permits.

use permit_sync::{select, NonConsumingPermit, Permit, PermitError, SelectTarget};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn select_picks_the_already_granted_permit() {
    let a = Permit::new(false);
    let b = Permit::new(true);

    let mut targets = [SelectTarget::Consuming(&a), SelectTarget::Consuming(&b)];
    let winner = select(&mut targets, None).unwrap();
    assert_eq!(winner, Some(1));
}

#[test]
fn select_blocks_until_one_permit_is_granted() {
    let a = Arc::new(Permit::new(false));
    let b = Arc::new(Permit::new(false));

    let (a2, b2) = (a.clone(), b.clone());
    let handle = thread::spawn(move || {
        let mut targets = [
            SelectTarget::Consuming(&a2),
            SelectTarget::Consuming(&b2),
        ];
        select(&mut targets, Some(std::time::Instant::now() + Duration::from_secs(2)))
    });

    thread::sleep(Duration::from_millis(50));
    b.grant().unwrap();

    assert_eq!(handle.join().unwrap().unwrap(), Some(1));
}

#[test]
fn select_times_out_when_nothing_is_granted() {
    let a = Permit::new(false);
    let b = Permit::new(false);
    let mut targets = [SelectTarget::Consuming(&a), SelectTarget::Consuming(&b)];

    let result = select(
        &mut targets,
        Some(std::time::Instant::now() + Duration::from_millis(30)),
    );
    assert!(matches!(result, Err(PermitError::Timeout)));
}

#[test]
fn select_mixes_consuming_and_non_consuming_permits() {
    let a = Permit::new(false);
    let b = NonConsumingPermit::new(true);
    let mut targets = [SelectTarget::Consuming(&a), SelectTarget::NonConsuming(&b)];

    let winner = select(&mut targets, None).unwrap();
    assert_eq!(winner, Some(1));
}

#[test]
fn select_on_an_all_empty_slice_succeeds_with_no_winner() {
    let mut targets: [SelectTarget<'_>; 2] = [SelectTarget::Empty, SelectTarget::Empty];
    assert_eq!(select(&mut targets, None).unwrap(), None);
}

#[test]
fn select_zeroes_out_losing_entries() {
    let a = Permit::new(true);
    let b = Permit::new(true);
    let mut targets = [SelectTarget::Consuming(&a), SelectTarget::Consuming(&b)];

    select(&mut targets, None).unwrap();
    let losers = targets
        .iter()
        .filter(|t| matches!(t, SelectTarget::Empty))
        .count();
    assert_eq!(losers, 1);
}
