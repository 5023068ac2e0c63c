use fluvius::testing::TestSubscriber;
use fluvius::time::VirtualClock;
use fluvius::{Flux, FluxError};
use std::time::Duration;

#[test]
fn test_skip_then_take() {
    let cases = [(0, 3, vec![0, 1, 2]), (3, 5, vec![3, 4]), (2, 2, vec![2, 3]), (6, 2, vec![])];

    for (skip, take, expected) in cases {
        let probe = TestSubscriber::<i64>::new();

        Flux::range(0, 5).skip(skip).take(take).subscribe(probe.clone());

        assert_eq!(probe.values(), expected, "skip({skip}).take({take})");
        assert!(probe.is_complete());
        assert!(probe.violations().is_empty());
    }
}

#[test]
fn test_take_zero_completes_immediately() {
    let probe = TestSubscriber::<i64>::new();

    Flux::range(0, 10).take(0).subscribe(probe.clone());

    assert!(probe.values().is_empty());
    assert!(probe.is_complete());
}

#[test]
fn test_take_stops_pulling_from_source() {
    let pulled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = pulled.clone();

    let source = (0..1_000).inspect(move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    let probe = TestSubscriber::<i32>::new();
    Flux::from_stream(source).take(3).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![0, 1, 2]);
    assert!(probe.is_complete());
    assert_eq!(pulled.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[test]
fn test_filter() {
    let probe = TestSubscriber::<i64>::new();

    Flux::range(1, 10).filter(|n| n % 2 == 0).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![2, 4, 6, 8, 10]);
    assert!(probe.is_complete());
}

#[test]
fn test_filter_replenishes_dropped_elements() {
    let probe = TestSubscriber::<i64>::with_demand(2);

    Flux::range(1, 10).filter(|n| n % 2 == 0).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![2, 4]);
    assert!(!probe.is_complete());

    probe.request(10);
    assert_eq!(probe.values(), vec![2, 4, 6, 8, 10]);
    assert!(probe.is_complete());
    assert!(probe.violations().is_empty());
}

#[test]
fn test_filter_panic_becomes_operator_error() {
    let probe = TestSubscriber::<i64>::new();

    Flux::range(1, 5)
        .filter(|n| {
            assert!(*n < 3, "three is not allowed");
            true
        })
        .subscribe(probe.clone());

    assert_eq!(probe.values(), vec![1, 2]);
    assert!(probe.error().is_some_and(|error| error.is_operator()));
}

#[test]
fn test_distinct() {
    let probe = TestSubscriber::<&str>::new();

    Flux::just(["dog", "cat", "bird", "dog", "bird", "anteater"])
        .distinct()
        .subscribe(probe.clone());

    assert_eq!(probe.values(), vec!["dog", "cat", "bird", "anteater"]);
    assert!(probe.is_complete());
}

#[test]
fn test_distinct_by_key() {
    let probe = TestSubscriber::<&str>::new();

    Flux::just(["dog", "cat", "bird", "emu", "anteater"])
        .distinct_by(|word| word.len())
        .subscribe(probe.clone());

    assert_eq!(probe.values(), vec!["dog", "bird", "anteater"]);
}

#[test]
fn test_distinct_keeps_demand_exact() {
    let probe = TestSubscriber::<i32>::with_demand(3);

    Flux::just([1, 1, 2, 2, 3, 3, 4])
        .distinct()
        .subscribe(probe.clone());

    assert_eq!(probe.values(), vec![1, 2, 3]);
    assert!(probe.violations().is_empty());
}

#[test]
fn test_delay_elements() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<i32>::new();

    Flux::just([1, 2, 3])
        .delay_elements(Duration::from_secs(1), clock.clone())
        .subscribe(probe.clone());

    assert!(probe.values().is_empty());

    clock.advance_by(Duration::from_secs(1));
    assert_eq!(probe.values(), vec![1]);

    clock.advance_by(Duration::from_secs(1));
    assert_eq!(probe.values(), vec![1, 2]);
    assert!(!probe.is_complete());

    clock.advance_by(Duration::from_secs(1));
    assert_eq!(probe.values(), vec![1, 2, 3]);
    assert!(probe.is_complete());
}

#[test]
fn test_delay_elements_respects_demand() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<i32>::with_demand(1);

    Flux::just([1, 2, 3])
        .delay_elements(Duration::from_secs(1), clock.clone())
        .subscribe(probe.clone());

    clock.advance_by(Duration::from_secs(5));
    assert_eq!(probe.values(), vec![1]);

    probe.request(2);
    clock.advance_by(Duration::from_secs(2));
    assert_eq!(probe.values(), vec![1, 2, 3]);
    assert!(probe.is_complete());
}

#[test]
fn test_skip_for_drops_early_elements() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<i64>::new();

    Flux::range(0, 5)
        .delay_elements(Duration::from_secs(1), clock.clone())
        .skip_for(Duration::from_millis(2500), clock.clone())
        .subscribe(probe.clone());

    clock.advance_by(Duration::from_secs(10));

    assert_eq!(probe.values(), vec![2, 3, 4]);
    assert!(probe.is_complete());
}

#[test]
fn test_take_for_stops_after_the_window() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<i64>::new();

    Flux::range(0, 5)
        .delay_elements(Duration::from_secs(1), clock.clone())
        .take_for(Duration::from_millis(3500), clock.clone())
        .subscribe(probe.clone());

    clock.advance_by(Duration::from_secs(3));
    assert_eq!(probe.values(), vec![0, 1, 2]);
    assert!(!probe.is_complete());

    clock.advance_by(Duration::from_secs(10));
    assert_eq!(probe.values(), vec![0, 1, 2]);
    assert!(probe.is_complete());
    assert!(probe.violations().is_empty());
}

#[test]
fn test_take_for_completes_before_slow_source() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<u64>::new();

    Flux::interval(Duration::from_secs(1), clock.clone())
        .take_for(Duration::from_millis(2500), clock.clone())
        .subscribe(probe.clone());

    clock.advance_by(Duration::from_secs(60));

    assert_eq!(probe.values(), vec![0, 1]);
    assert!(probe.is_complete());
    assert_eq!(clock.pending(), 0);
}

#[test]
fn test_take_rejects_zero_request() {
    let probe = TestSubscriber::<i64>::with_demand(0);

    Flux::range(0, 5).take(3).subscribe(probe.clone());
    probe.request(0);

    assert_eq!(probe.error(), Some(FluxError::InvalidDemand(0)));
}
