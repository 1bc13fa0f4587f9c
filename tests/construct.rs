mod common;

use common::{ms, Counter, Spy};
use forked::{time, MaybePromise, Promise, Task};

#[test]
fn test_succeed_and_fail_settle_synchronously() {
    let ok = Spy::<&str, i32>::new();
    ok.fork(&Task::succeed(1));
    ok.assert_resolved(1);

    let err = Spy::<&str, i32>::new();
    err.fork(&Task::fail("boom"));
    err.assert_rejected("boom");
}

#[test]
fn test_empty_resolves_with_unit() {
    let spy = Spy::<(), ()>::new();
    spy.fork(&Task::empty());

    spy.assert_resolved(());
}

#[test]
fn test_succeed_in_waits_for_its_delay() {
    let spy = Spy::<(), &str>::new();
    spy.fork(&Task::succeed_in(ms(100), "done"));

    time::advance(ms(99));
    spy.assert_pending();

    time::advance(ms(1));
    spy.assert_resolved("done");
}

#[test]
fn test_fail_in_rejects_after_delay() {
    let spy = Spy::<&str, ()>::new();
    spy.fork(&Task::fail_in(ms(50), "late"));

    time::advance(ms(49));
    spy.assert_pending();

    time::advance(ms(1));
    spy.assert_rejected("late");
}

#[test]
fn test_each_fork_runs_independently() {
    let task = Task::<(), &str>::succeed_in(ms(10), "x");
    let first = Spy::new();
    let second = Spy::new();

    let handle = first.fork(&task);
    second.fork(&task);
    handle.cancel();
    time::run_all();

    first.assert_pending();
    second.assert_resolved("x");
}

#[test]
fn test_succeed_by_converts_errors_into_rejections() {
    let spy = Spy::<String, u32>::new();
    spy.fork(&Task::succeed_by(|| "nope".parse::<u32>().map_err(|e| e.to_string())));

    assert_eq!(spy.count(), 1);
    assert!(matches!(&spy.calls()[0], common::Call::Rejected(msg) if msg.contains("invalid digit")));
}

#[test]
fn test_never_never_settles() {
    let spy = Spy::<(), ()>::new();
    spy.fork(&Task::never());
    time::run_all();

    spy.assert_pending();
}

#[test]
fn test_pre_cancelled_task_does_not_run() {
    let runs = Counter::default();
    let task = Task::<(), usize>::succeed_by({
        let runs = runs.clone();
        move || Ok(runs.bump())
    });
    let clone = task.clone();

    task.cancel();
    let spy = Spy::new();
    let handle = spy.fork(&clone);

    assert!(clone.is_cancelled());
    assert!(handle.is_noop());
    assert_eq!(runs.get(), 0, "computation must not run");
    spy.assert_pending();
}

#[test]
fn test_from_promise_waits_for_pending_promise() {
    let (promise, resolver) = Promise::<&str, i32>::new();
    let spy = Spy::new();
    spy.fork(&Task::<&str, i32>::from_promise(promise));

    spy.assert_pending();
    resolver.resolve(5);
    spy.assert_resolved(5);
}

#[test]
fn test_from_promise_cancellation_detaches_continuation() {
    let (promise, resolver) = Promise::<&str, i32>::new();
    let task = Task::<&str, i32>::from_promise(promise);
    let cancelled = Spy::new();
    let live = Spy::new();

    cancelled.fork(&task).cancel();
    live.fork(&task);
    resolver.reject("gone");

    cancelled.assert_pending();
    live.assert_rejected("gone");
}

#[test]
fn test_from_promise_accepts_settled_promises_and_values() {
    let settled = Spy::<&str, i32>::new();
    settled.fork(&Task::from_promise(Promise::rejected("early")));
    settled.assert_rejected("early");

    let value = Spy::<&str, i32>::new();
    value.fork(&Task::from_promise(MaybePromise::Value(3)));
    value.assert_resolved(3);
}

#[test]
fn test_from_lazy_promise_calls_factory_per_fork() {
    let calls = Counter::default();
    let task = Task::<(), usize>::from_lazy_promise({
        let calls = calls.clone();
        move || Promise::resolved(calls.bump())
    });

    assert_eq!(calls.get(), 0, "factory must not run before fork");

    let first = Spy::new();
    first.fork(&task);
    let second = Spy::new();
    second.fork(&task);

    first.assert_resolved(1);
    second.assert_resolved(2);
}
