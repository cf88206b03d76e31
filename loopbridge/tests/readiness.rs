mod common;

use common::{FakeLoop, FakeWatch, Scripted};
use loopbridge::context::IoCondition;
use loopbridge::{Bridge, Readiness, translate};
use std::time::Duration;

fn synced(fds: &[(i32, IoCondition)]) -> (Scripted, Bridge<Scripted, FakeWatch>) {
    let inner = Scripted::new(fds);
    let mut outer = FakeLoop::default();
    let mut bridge: Bridge<Scripted, FakeWatch> = Bridge::init(inner.clone()).unwrap();
    bridge.sync(&mut outer).unwrap();
    (inner, bridge)
}

#[test]
fn translate_maps_directions() {
    assert_eq!(translate(Readiness::default()), IoCondition::empty());
    assert_eq!(translate(Readiness::READABLE), IoCondition::IN);
    assert_eq!(translate(Readiness::WRITABLE), IoCondition::OUT);
    assert_eq!(
        translate(Readiness {
            readable: true,
            writable: true
        }),
        IoCondition::IN | IoCondition::OUT
    );
}

#[test]
fn readiness_accumulates_until_dispatch() {
    let (inner, mut bridge) = synced(&[(5, IoCondition::IN | IoCondition::OUT)]);

    bridge.ready(5, Readiness::READABLE);
    bridge.ready(5, Readiness::WRITABLE);
    bridge.ready(5, Readiness::READABLE);

    assert!(bridge.dispatch());

    let checked = inner.last_checked();
    assert_eq!(checked.len(), 1);
    assert_eq!(checked[0].fd, 5);
    assert_eq!(checked[0].revents, IoCondition::IN | IoCondition::OUT);
    assert_eq!(inner.0.borrow().dispatched, 1);
}

#[test]
fn write_ready_on_read_interest_is_dropped() {
    let (inner, mut bridge) = synced(&[(5, IoCondition::IN)]);

    bridge.ready(5, Readiness::WRITABLE);

    assert_eq!(bridge.fds()[0].revents, IoCondition::empty());
    assert!(!bridge.dispatch());
    assert_eq!(inner.last_checked()[0].revents, IoCondition::empty());
    assert_eq!(inner.0.borrow().dispatched, 1, "dispatch runs regardless");
}

#[test]
fn readiness_lands_in_matching_slot() {
    let (_inner, mut bridge) = synced(&[
        (5, IoCondition::IN),
        (9, IoCondition::OUT),
        (12, IoCondition::IN),
    ]);

    bridge.ready(9, Readiness::WRITABLE);

    let revents: Vec<_> = bridge.fds().iter().map(|p| p.revents).collect();
    assert_eq!(
        revents,
        vec![IoCondition::empty(), IoCondition::OUT, IoCondition::empty()]
    );
}

#[test]
fn unknown_descriptor_is_ignored() {
    let (_inner, mut bridge) = synced(&[(5, IoCondition::IN)]);

    bridge.ready(42, Readiness::READABLE);

    assert_eq!(bridge.fds()[0].revents, IoCondition::empty());
}

#[test]
fn next_discovery_clears_readiness() {
    let (inner, mut bridge) = synced(&[(5, IoCondition::IN)]);
    let mut outer = FakeLoop::default();

    bridge.ready(5, Readiness::READABLE);
    bridge.dispatch();

    bridge.sync(&mut outer).unwrap();

    assert_eq!(bridge.fds()[0].revents, IoCondition::empty());
    assert!(!bridge.dispatch());
    assert_eq!(inner.0.borrow().dispatched, 2);
}

#[test]
fn readiness_for_unreconciled_registration_is_ignored() {
    let (inner, mut bridge) = synced(&[(5, IoCondition::IN)]);
    let mut outer = FakeLoop::default();

    inner.set(&[]);
    inner.set_timeout(Some(Duration::ZERO));
    bridge.sync(&mut outer).unwrap();
    assert!(bridge.registration(5).is_some());

    bridge.ready(5, Readiness::READABLE);

    assert!(bridge.fds().is_empty());
    assert!(!bridge.dispatch());
}

#[test]
fn dispatch_hands_over_max_priority_entries() {
    let (inner, mut bridge) = synced(&[(5, IoCondition::IN), (9, IoCondition::IN)]);

    bridge.ready(9, Readiness::READABLE);
    bridge.dispatch();

    let checked = inner.last_checked();
    assert_eq!(checked.iter().map(|p| p.fd).collect::<Vec<_>>(), vec![5, 9]);
    assert_eq!(bridge.max_priority(), i32::MAX);
}
