use fluvius::testing::TestSubscriber;
use fluvius::time::VirtualClock;
use fluvius::{Flux, FluxError, Mono};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(1);

#[test]
fn test_just_emits_in_order_then_completes() {
    let probe = TestSubscriber::<&str>::new();

    Flux::just(["a", "b", "c"]).subscribe(probe.clone());

    assert_eq!(probe.values(), vec!["a", "b", "c"]);
    assert!(probe.is_complete());
    assert!(probe.violations().is_empty());
}

#[test]
fn test_from_array_and_from_iterable_are_resubscribable() {
    let words = Flux::from_array(["red", "green"]);
    let numbers = Flux::from_iterable(vec![1, 2, 3]);

    for _ in 0..2 {
        let first = TestSubscriber::<&str>::new();
        let second = TestSubscriber::<i32>::new();

        words.subscribe(first.clone());
        numbers.subscribe(second.clone());

        assert_eq!(first.values(), vec!["red", "green"]);
        assert_eq!(second.values(), vec![1, 2, 3]);
        assert!(first.is_complete() && second.is_complete());
    }
}

#[test]
fn test_from_stream_is_single_use() {
    let flux = Flux::from_stream(vec![1, 2, 3]);

    let first = TestSubscriber::<i32>::new();
    flux.subscribe(first.clone());

    assert_eq!(first.values(), vec![1, 2, 3]);
    assert!(first.is_complete());

    let second = TestSubscriber::<i32>::new();
    flux.subscribe(second.clone());

    assert!(second.values().is_empty());
    assert_eq!(second.error(), Some(FluxError::SourceConsumed));
    assert!(second.error().is_some_and(|error| error.is_upstream()));
}

#[test]
fn test_try_from_iter_stops_at_first_error() {
    let items: Vec<Result<i32, &str>> = vec![Ok(1), Err("disk unplugged"), Ok(3)];
    let probe = TestSubscriber::<i32>::new();

    Flux::try_from_iter(items).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![1]);
    assert_eq!(probe.error(), Some(FluxError::upstream("disk unplugged")));
    assert!(!probe.is_complete());
}

#[test]
fn test_range() {
    let probe = TestSubscriber::<i64>::new();
    Flux::range(5, 3).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![5, 6, 7]);
    assert!(probe.is_complete());

    let empty = TestSubscriber::<i64>::new();
    Flux::range(0, 0).subscribe(empty.clone());

    assert!(empty.values().is_empty());
    assert!(empty.is_complete());
}

#[test]
fn test_range_overflow_is_rejected() {
    let probe = TestSubscriber::<i64>::new();
    Flux::range(i64::MAX, 2).subscribe(probe.clone());

    assert!(matches!(probe.error(), Some(FluxError::InvalidArgument(_))));
}

#[test]
fn test_range_longer_than_i64_max() {
    let probe = TestSubscriber::<i64>::new();
    Flux::range(-10, i64::MAX as u64 + 5)
        .take(3)
        .subscribe(probe.clone());

    assert_eq!(probe.values(), vec![-10, -9, -8]);
    assert!(probe.is_complete());

    let widest = TestSubscriber::<i64>::new();
    Flux::range(i64::MIN, u64::MAX).take(2).subscribe(widest.clone());

    assert_eq!(widest.values(), vec![i64::MIN, i64::MIN + 1]);
    assert!(widest.is_complete());
}

#[test]
fn test_range_ends_at_i64_max() {
    let probe = TestSubscriber::<i64>::new();
    Flux::range(i64::MAX - 2, 3).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![i64::MAX - 2, i64::MAX - 1, i64::MAX]);
    assert!(probe.is_complete());
}

#[test]
fn test_empty_completes_without_demand() {
    let probe = TestSubscriber::<i32>::with_demand(0);

    Flux::<i32>::empty().subscribe(probe.clone());

    assert!(probe.is_complete());
    assert_eq!(probe.signal_count(), 1);
}

#[test]
fn test_error_source() {
    let probe = TestSubscriber::<i32>::new();

    Flux::<i32>::error(FluxError::upstream("offline")).subscribe(probe.clone());

    assert_eq!(probe.error(), Some(FluxError::upstream("offline")));
    assert!(probe.values().is_empty());
}

#[test]
fn test_interval_ticks_on_virtual_clock() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<u64>::new();

    Flux::interval(Duration::from_secs(1), clock.clone())
        .take(3)
        .subscribe(probe.clone());

    clock.advance_by(Duration::from_millis(2500));
    assert_eq!(probe.values(), vec![0, 1]);
    assert!(!probe.is_complete());

    clock.advance_by(Duration::from_secs(1));
    assert_eq!(probe.values(), vec![0, 1, 2]);
    assert!(probe.is_complete());

    clock.advance_by(Duration::from_secs(5));
    assert_eq!(probe.value_count(), 3);
    assert_eq!(clock.pending(), 0);
}

#[test]
fn test_interval_retains_ticks_without_demand() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<u64>::with_demand(0);

    Flux::interval(Duration::from_secs(1), clock.clone()).subscribe(probe.clone());

    clock.advance_by(Duration::from_secs(3));
    assert!(probe.values().is_empty());

    probe.request(2);
    assert_eq!(probe.values(), vec![0, 1]);

    clock.advance_by(Duration::from_secs(1));
    assert_eq!(probe.values(), vec![0, 1]);

    probe.request(5);
    assert_eq!(probe.values(), vec![0, 1, 2, 3]);
    assert!(probe.violations().is_empty());
}

#[test]
fn test_interval_cancel_stops_the_timer() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<u64>::new();

    Flux::interval(Duration::from_secs(1), clock.clone()).subscribe(probe.clone());

    clock.advance_by(Duration::from_secs(2));
    probe.cancel();
    clock.advance_by(Duration::from_secs(10));

    assert_eq!(probe.values(), vec![0, 1]);
    assert!(!probe.is_terminated());
    assert_eq!(clock.pending(), 0);
}

#[test]
fn test_interval_with_delay() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<u64>::new();

    Flux::interval_with_delay(Duration::ZERO, Duration::from_secs(1), clock.clone())
        .subscribe(probe.clone());

    clock.advance_by(Duration::ZERO);
    assert_eq!(probe.values(), vec![0]);

    clock.advance_by(Duration::from_secs(2));
    assert_eq!(probe.values(), vec![0, 1, 2]);
}

#[test]
fn test_interval_rejects_zero_period() {
    let clock = VirtualClock::new();
    let probe = TestSubscriber::<u64>::new();

    Flux::interval(Duration::ZERO, clock).subscribe(probe.clone());

    assert!(matches!(probe.error(), Some(FluxError::InvalidArgument(_))));
}

#[test]
fn test_mono_sources() {
    assert_eq!(Mono::just("one").block(WAIT), Ok(Some("one")));
    assert_eq!(Mono::<i32>::empty().block(WAIT), Ok(None));
    assert_eq!(
        Mono::<i32>::error(FluxError::upstream("gone")).block(WAIT),
        Err(FluxError::upstream("gone"))
    );
}

#[test]
fn test_mono_from_fn_runs_per_subscription() {
    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = calls.clone();

    let mono = Mono::from_fn(move || {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
    });

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(mono.block(WAIT), Ok(Some(1)));
    assert_eq!(mono.block(WAIT), Ok(Some(2)));
}

#[test]
fn test_mono_from_fn_panic_becomes_operator_error() {
    let result = Mono::<i32>::from_fn(|| panic!("supplier exploded")).block(WAIT);

    assert_eq!(
        result,
        Err(FluxError::operator("from_fn", "supplier exploded"))
    );
}

#[test]
fn test_mono_holds_value_until_requested() {
    let probe = TestSubscriber::<&str>::with_demand(0);

    Mono::just("late").subscribe(probe.clone());
    assert!(probe.values().is_empty());
    assert!(!probe.is_complete());

    probe.request(1);
    assert_eq!(probe.values(), vec!["late"]);
    assert!(probe.is_complete());
}
