use fluvius::testing::TestSubscriber;
use fluvius::{Flux, FluxError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(1);

#[test]
fn test_collect_list() {
    let list = Flux::range(1, 5).collect_list().block(WAIT);
    assert_eq!(list, Ok(Some(vec![1, 2, 3, 4, 5])));

    let empty = Flux::<i32>::empty().collect_list().block(WAIT);
    assert_eq!(empty, Ok(Some(vec![])));
}

#[test]
fn test_collect_map_last_write_wins() {
    let animals = ["aardvark", "elephant", "koala", "eagle", "kangaroo"];

    let map = Flux::just(animals)
        .collect_map(|animal| animal.chars().next().unwrap_or_default())
        .block(WAIT)
        .expect("collect_map should succeed")
        .expect("collect_map always emits a map");

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&'a'), Some(&"aardvark"));
    assert_eq!(map.get(&'e'), Some(&"eagle"));
    assert_eq!(map.get(&'k'), Some(&"kangaroo"));
}

#[test]
fn test_collect_map_with_values() {
    let lengths = Flux::just(["dog", "bird", "anteater"])
        .collect_map_with(|word| word.to_string(), |word| word.len())
        .block(WAIT);

    let expected: HashMap<String, usize> = [("dog", 3), ("bird", 4), ("anteater", 8)]
        .into_iter()
        .map(|(word, len)| (word.to_owned(), len))
        .collect();

    assert_eq!(lengths, Ok(Some(expected)));
}

#[test]
fn test_collect_propagates_errors() {
    let items: Vec<Result<i32, &str>> = vec![Ok(1), Ok(2), Err("broken pipe")];

    let result = Flux::try_from_iter(items).collect_list().block(WAIT);

    assert_eq!(result, Err(FluxError::upstream("broken pipe")));
}

#[test]
fn test_collect_waits_for_demand() {
    let probe = TestSubscriber::<Vec<i64>>::with_demand(0);

    Flux::range(1, 3).collect_list().subscribe(probe.clone());
    assert_eq!(probe.signal_count(), 0);

    probe.request(1);
    assert_eq!(probe.values(), vec![vec![1, 2, 3]]);
    assert!(probe.is_complete());
}

#[test]
fn test_collect_rejects_zero_request_with_pending_result() {
    let probe = TestSubscriber::<Vec<i64>>::with_demand(0);

    Flux::range(1, 3).collect_list().subscribe(probe.clone());
    probe.request(0);

    assert_eq!(probe.error(), Some(FluxError::InvalidDemand(0)));
    assert!(probe.values().is_empty());
}

#[test]
fn test_all_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result = Flux::range(1, 10)
        .all(move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            *n < 3
        })
        .block(WAIT);

    assert_eq!(result, Ok(Some(false)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_any_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result = Flux::range(1, 10)
        .any(move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            *n == 2
        })
        .block(WAIT);

    assert_eq!(result, Ok(Some(true)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_quantifiers_over_full_sequences() {
    assert_eq!(Flux::range(1, 5).all(|n| *n > 0).block(WAIT), Ok(Some(true)));
    assert_eq!(Flux::range(1, 5).any(|n| *n > 5).block(WAIT), Ok(Some(false)));
}

#[test]
fn test_quantifiers_over_empty_sequence() {
    assert_eq!(Flux::<i32>::empty().all(|_| false).block(WAIT), Ok(Some(true)));
    assert_eq!(Flux::<i32>::empty().any(|_| true).block(WAIT), Ok(Some(false)));
}

#[test]
fn test_quantifier_predicate_panic() {
    let result = Flux::range(1, 3)
        .any(|n| {
            assert_ne!(*n, 2, "two");
            false
        })
        .block(WAIT);

    assert!(result.is_err_and(|error| error.is_operator()));
}
