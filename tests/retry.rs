mod common;

use common::{ms, Counter, Spy};
use forked::{time, Backoff, Task};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Fails `failures` times, then succeeds with the attempt number. Records
/// the virtual time of every attempt.
fn flaky(failures: usize, attempts: &Rc<RefCell<Vec<Duration>>>) -> Task<String, usize> {
    let attempts = attempts.clone();
    Task::succeed_by(move || {
        attempts.borrow_mut().push(time::now());
        let n = attempts.borrow().len();
        if n <= failures {
            Err(format!("attempt {n} failed"))
        } else {
            Ok(n)
        }
    })
}

#[test]
fn test_exponential_backoff_waits_the_cumulative_delay() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();
    let start = time::now();

    spy.fork(&flaky(4, &attempts).retry_with_exponential_backoff(ms(10), 4));

    time::advance(ms(149));
    spy.assert_pending();

    time::advance(ms(1));
    spy.assert_resolved(5);

    let offsets: Vec<_> = attempts.borrow().iter().map(|t| *t - start).collect();
    assert_eq!(offsets, vec![ms(0), ms(10), ms(30), ms(70), ms(150)]);
}

#[test]
fn test_backoff_propagates_the_last_failure() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();

    spy.fork(&flaky(10, &attempts).retry_with_exponential_backoff(ms(1), 2));
    time::run_all();

    spy.assert_rejected("attempt 3 failed".to_string());
    assert_eq!(attempts.borrow().len(), 3);
}

#[test]
fn test_zero_retries_fails_immediately() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();

    spy.fork(&flaky(1, &attempts).retry_with(Backoff::new(ms(5))));

    spy.assert_rejected("attempt 1 failed".to_string());
    assert_eq!(time::pending(), 0);
}

#[test]
fn test_retry_with_respects_max_delay() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();
    let start = time::now();
    let backoff = Backoff::new(ms(10)).retries(3).factor(10).max_delay(ms(50));

    spy.fork(&flaky(3, &attempts).retry_with(backoff));
    time::run_all();

    spy.assert_resolved(4);
    let offsets: Vec<_> = attempts.borrow().iter().map(|t| *t - start).collect();
    assert_eq!(offsets, vec![ms(0), ms(10), ms(60), ms(110)]);
}

#[test]
fn test_cancelling_during_backoff_stops_retrying() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();

    let handle = spy.fork(&flaky(10, &attempts).retry_with_exponential_backoff(ms(10), 5));
    time::advance(ms(15));
    handle.cancel();
    time::run_all();

    assert_eq!(attempts.borrow().len(), 2);
    spy.assert_pending();
}

#[test]
fn test_retry_in_tries_exactly_once_more() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();

    spy.fork(&flaky(2, &attempts).retry_in(ms(100)));

    time::advance(ms(99));
    assert_eq!(attempts.borrow().len(), 1);

    time::advance(ms(1));
    spy.assert_rejected("attempt 2 failed".to_string());
    assert_eq!(attempts.borrow().len(), 2);
}

#[test]
fn test_retry_in_recovers() {
    let attempts = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new();

    spy.fork(&flaky(1, &attempts).retry_in(ms(20)));
    time::run_all();

    spy.assert_resolved(2);
}

#[test]
fn test_wait_defers_the_fork() {
    let runs = Counter::default();
    let task = Task::<(), usize>::succeed_by({
        let runs = runs.clone();
        move || Ok(runs.bump())
    });
    let spy = Spy::new();

    spy.fork(&task.wait(ms(40)));
    assert_eq!(runs.get(), 0);

    time::advance(ms(40));
    spy.assert_resolved(1);
}

#[test]
fn test_cancelling_wait_before_the_delay_skips_the_fork() {
    let runs = Counter::default();
    let task = Task::<(), usize>::succeed_by({
        let runs = runs.clone();
        move || Ok(runs.bump())
    });
    let spy = Spy::new();

    spy.fork(&task.wait(ms(40))).cancel();
    time::run_all();

    assert_eq!(runs.get(), 0);
    spy.assert_pending();
}
