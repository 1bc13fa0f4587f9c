mod common;

use common::{ms, Spy};
use forked::{from_promises, time, IntoTask, Promise, Task};

use futures::executor::block_on;

use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_to_promise_forks_immediately() {
    let promise = Task::<&str, i32>::succeed_in(ms(10), 4).to_promise();

    assert!(promise.is_pending());
    time::run_all();
    assert_eq!(promise.outcome(), Some(Ok(4)));
}

#[test]
fn test_awaiting_a_task() {
    let result = block_on(async { Task::<&str, i32>::fail("nope").await });

    assert_eq!(result, Err("nope"));
}

#[test]
fn test_awaiting_a_pending_promise_is_woken() {
    let (promise, resolver) = Promise::<(), &str>::new();
    let awaited = promise.clone();

    let mut pool = futures::executor::LocalPool::new();
    let out = Rc::new(RefCell::new(None));
    let slot = out.clone();

    futures::task::LocalSpawnExt::spawn_local(&pool.spawner(), async move {
        *slot.borrow_mut() = Some(awaited.await);
    })
    .expect("spawn on a local pool");

    pool.run_until_stalled();
    assert_eq!(*out.borrow(), None);

    resolver.resolve("woken");
    pool.run_until_stalled();
    assert_eq!(*out.borrow(), Some(Ok("woken")));
}

#[test]
fn test_then_fires_for_every_continuation() {
    let (promise, resolver) = Promise::<(), i32>::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for tag in ["a", "b"] {
        let seen = seen.clone();
        promise.then(|_| {}, move |v| seen.borrow_mut().push((tag, v)));
    }
    resolver.resolve(1);

    let late = seen.clone();
    promise.then(|_| {}, move |v| late.borrow_mut().push(("late", v)));

    assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("late", 1)]);
}

#[test]
fn test_with_executor_runs_eagerly() {
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();

    let promise = Promise::<(), ()>::with_executor(move |resolver| {
        *flag.borrow_mut() = true;
        resolver.resolve(());
    });

    assert!(*ran.borrow());
    assert_eq!(promise.outcome(), Some(Ok(())));
}

#[test]
fn test_promise_converts_into_a_task() {
    let spy = Spy::<&str, i32>::new();
    spy.fork(&Promise::resolved(8).into_task());

    spy.assert_resolved(8);
}

#[test]
fn test_from_promises_collects_in_input_order() {
    let (slow, resolve_slow) = Promise::<&str, i32>::new();
    let spy = Spy::new();

    spy.fork(&from_promises([slow, Promise::resolved(2)]));
    spy.assert_pending();

    resolve_slow.resolve(1);
    spy.assert_resolved(vec![1, 2]);
}

#[test]
fn test_from_promises_fails_with_the_rejection() {
    let spy = Spy::<&str, Vec<i32>>::new();
    spy.fork(&from_promises([Promise::resolved(1), Promise::rejected("down")]));

    spy.assert_rejected("down");
}

#[test]
fn test_wrapped_promise_creator_adapts_each_call() {
    let lookup = Task::wrap_promise_creator(|(name, id): (&'static str, u32)| {
        if id == 0 {
            Promise::rejected(format!("{name} has no id"))
        } else {
            Promise::resolved(format!("{name}#{id}"))
        }
    });

    let found = Spy::<String, String>::new();
    found.fork(&lookup(("test", 1)));
    found.assert_resolved("test#1".to_string());

    let missing = Spy::<String, String>::new();
    missing.fork(&lookup(("ghost", 0)));
    missing.assert_rejected("ghost has no id".to_string());
}
