// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn push_then_snapshot_in_order() {
    let ring = Ring::new(4);
    ring.push(1);
    ring.push(2);
    ring.push(3);
    assert_eq!(ring.snapshot(), vec![1, 2, 3]);
    assert_eq!(ring.len(), 3);
    assert_eq!(ring.capacity(), 4);
}

#[test]
fn push_past_capacity_evicts_oldest() {
    let ring = Ring::new(3);
    for i in 0..5 {
        ring.push(i);
    }
    assert_eq!(ring.snapshot(), vec![2, 3, 4]);
    assert_eq!(ring.len(), 3);
}

#[test]
fn pop_returns_oldest() {
    let ring = Ring::new(3);
    ring.push("a");
    ring.push("b");
    assert_eq!(ring.pop(), Some("a"));
    assert_eq!(ring.pop(), Some("b"));
    assert_eq!(ring.pop(), None);
}

#[test]
fn front_peeks_without_removing() {
    let ring = Ring::new(2);
    assert_eq!(ring.front(), None);
    ring.push(7);
    assert_eq!(ring.front(), Some(7));
    assert_eq!(ring.len(), 1);
}

#[test]
fn zero_capacity_is_bumped_to_one() {
    let ring = Ring::new(0);
    ring.push(1);
    ring.push(2);
    assert_eq!(ring.capacity(), 1);
    assert_eq!(ring.snapshot(), vec![2]);
}

#[test]
fn interleaved_push_pop_wraps_correctly() {
    let ring = Ring::new(3);
    ring.push(1);
    ring.push(2);
    assert_eq!(ring.pop(), Some(1));
    ring.push(3);
    ring.push(4);
    ring.push(5); // evicts 2
    assert_eq!(ring.snapshot(), vec![3, 4, 5]);
}

#[test]
fn fold_sums_oldest_first() {
    let ring = Ring::new(4);
    for i in 1..=4 {
        ring.push(i);
    }
    let order = ring.fold(Vec::new(), |mut acc, x| {
        acc.push(*x);
        acc
    });
    assert_eq!(order, vec![1, 2, 3, 4]);
}

#[test]
fn concurrent_pushes_preserve_capacity_bound() {
    let ring = Arc::new(Ring::new(16));
    let mut handles = Vec::new();
    for t in 0..4 {
        let ring = Arc::clone(&ring);
        handles.push(std::thread::spawn(move || {
            for i in 0..100 {
                ring.push(t * 100 + i);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(ring.len(), 16);
    assert_eq!(ring.snapshot().len(), 16);
}

proptest! {
    #[test]
    fn snapshot_equals_tail_of_pushes(pushes in prop::collection::vec(any::<u16>(), 0..64), capacity in 1usize..16) {
        let ring = Ring::new(capacity);
        for &x in &pushes {
            ring.push(x);
        }
        let expected: Vec<u16> = pushes
            .iter()
            .copied()
            .skip(pushes.len().saturating_sub(capacity))
            .collect();
        prop_assert_eq!(ring.snapshot(), expected);
    }

    #[test]
    fn pop_after_k_pushes_returns_first(pushes in prop::collection::vec(any::<u16>(), 1..16)) {
        let ring = Ring::new(16);
        for &x in &pushes {
            ring.push(x);
        }
        prop_assert_eq!(ring.pop(), Some(pushes[0]));
    }
}
