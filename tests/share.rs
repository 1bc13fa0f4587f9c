mod common;

use common::{ms, Counter, Spy};
use forked::{time, Task};

fn counted(runs: &Counter) -> Task<&'static str, usize> {
    let runs = runs.clone();
    Task::new(move |settle| {
        let value = runs.bump();
        let timer = time::set_timeout(ms(10), move || settle.resolve(value));
        forked::CancelHandle::from_fn(move || timer.cancel())
    })
}

#[test]
fn test_only_once_runs_the_computation_once() {
    let runs = Counter::default();
    let shared = counted(&runs).only_once();
    let spies: Vec<_> = (0..3).map(|_| Spy::<&str, usize>::new()).collect();

    for spy in &spies {
        spy.fork(&shared);
    }
    time::run_all();

    assert_eq!(runs.get(), 1);
    for spy in &spies {
        spy.assert_resolved(1);
    }
}

#[test]
fn test_late_forks_are_served_from_the_cache() {
    let runs = Counter::default();
    let shared = counted(&runs).share();

    let early = Spy::new();
    early.fork(&shared);
    time::run_all();

    let late = Spy::new();
    late.fork(&shared);

    late.assert_resolved(1);
    early.assert_resolved(1);
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_failure_is_cached_too() {
    let runs = Counter::default();
    let shared = Task::<String, ()>::succeed_by({
        let runs = runs.clone();
        move || Err(format!("attempt {}", runs.bump()))
    })
    .only_once();

    let first = Spy::new();
    first.fork(&shared);
    let second = Spy::new();
    second.fork(&shared);

    first.assert_rejected("attempt 1".to_string());
    second.assert_rejected("attempt 1".to_string());
}

#[test]
fn test_cancelled_subscriber_does_not_stop_the_others() {
    let runs = Counter::default();
    let shared = counted(&runs).only_once();

    let leaving = Spy::new();
    let staying = Spy::new();
    leaving.fork(&shared).cancel();
    staying.fork(&shared);

    time::run_all();

    leaving.assert_pending();
    staying.assert_resolved(1);
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_independent_shares_do_not_interfere() {
    let runs = Counter::default();
    let base = counted(&runs);
    let first = base.only_once();
    let second = base.only_once();

    let a = Spy::new();
    a.fork(&first);
    let b = Spy::new();
    b.fork(&second);
    time::run_all();

    a.assert_resolved(1);
    b.assert_resolved(2);
}
