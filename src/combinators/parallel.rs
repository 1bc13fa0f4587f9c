use crate::fork::{CancelHandle, Settle};
use crate::promise::Promise;
use crate::task::{IntoTask, Task};

use std::cell::RefCell;
use std::rc::Rc;

fn collect<I>(tasks: I) -> Rc<[Task<<I::Item as IntoTask>::Error, <I::Item as IntoTask>::Output>]>
where
    I: IntoIterator,
    I::Item: IntoTask,
{
    tasks.into_iter().map(IntoTask::into_task).collect()
}

/// Settles `settle` with `error` and cancels the remaining children.
fn reject_all<E: 'static, S: 'static>(settle: &Settle<E, S>, children: &CancelHandle) -> impl FnOnce(E) + 'static {
    let settle = settle.clone();
    let children = children.clone();

    move |error| {
        settle.reject(error);
        children.cancel();
    }
}

struct Applied<F, A> {
    func: Option<F>,
    arg: Option<A>,
}

/// Applies the function produced by one task to the value of another.
///
/// Both tasks run concurrently: the function task is forked first, then
/// the argument task, before either outcome is awaited. The first error
/// fails the result and cancels the other side.
pub fn ap<E, F, A, B, TF, TA>(func: TF, arg: TA) -> Task<E, B>
where
    E: 'static,
    F: FnOnce(A) -> B + 'static,
    A: 'static,
    B: 'static,
    TF: IntoTask<Error = E, Output = F>,
    TA: IntoTask<Error = E, Output = A>,
{
    let func = func.into_task();
    let arg = arg.into_task();

    Task::new(move |settle: Settle<E, B>| {
        let applied = Rc::new(RefCell::new(Applied { func: None, arg: None }));
        let children = CancelHandle::new();

        let on_func = {
            let (applied, settle) = (applied.clone(), settle.clone());
            move |f: F| {
                applied.borrow_mut().func = Some(f);
                apply(&applied, &settle);
            }
        };
        let on_arg = {
            let (applied, settle) = (applied.clone(), settle.clone());
            move |a: A| {
                applied.borrow_mut().arg = Some(a);
                apply(&applied, &settle);
            }
        };

        children.link(func.fork(reject_all(&settle, &children), on_func));
        children.link(arg.fork(reject_all(&settle, &children), on_arg));

        children
    })
}

fn apply<E: 'static, F, A, B: 'static>(applied: &Rc<RefCell<Applied<F, A>>>, settle: &Settle<E, B>)
where
    F: FnOnce(A) -> B,
{
    let ready = {
        let mut applied = applied.borrow_mut();
        match (applied.func.take(), applied.arg.take()) {
            (Some(f), Some(a)) => Some((f, a)),
            (func, arg) => {
                applied.func = func;
                applied.arg = arg;
                None
            }
        }
    };

    if let Some((f, a)) = ready {
        settle.resolve(f(a));
    }
}

/// Combines two tasks with `f` once both have succeeded.
///
/// # Examples
///
/// ```rust
/// use forked::{map2, Task};
///
/// let sum = map2(|a: i32, b: i32| a + b, Task::<(), _>::succeed(2), Task::succeed(3));
///
/// sum.fork(|_| {}, |total| assert_eq!(total, 5));
/// ```
pub fn map2<E, A, B, R, F, TA, TB>(f: F, a: TA, b: TB) -> Task<E, R>
where
    E: 'static,
    A: 'static,
    B: 'static,
    R: 'static,
    F: Fn(A, B) -> R + 'static,
    TA: IntoTask<Error = E, Output = A>,
    TB: IntoTask<Error = E, Output = B>,
{
    let f = Rc::new(f);
    let curried = a.into_task().map(move |a: A| {
        let f = f.clone();
        move |b: B| f(a, b)
    });

    ap(curried, b)
}

pub fn map3<E, A, B, C, R, F, TA, TB, TC>(f: F, a: TA, b: TB, c: TC) -> Task<E, R>
where
    E: 'static,
    A: 'static,
    B: 'static,
    C: 'static,
    R: 'static,
    F: Fn(A, B, C) -> R + 'static,
    TA: IntoTask<Error = E, Output = A>,
    TB: IntoTask<Error = E, Output = B>,
    TC: IntoTask<Error = E, Output = C>,
{
    let f = Rc::new(f);
    let curried = a.into_task().map(move |a: A| {
        let f = f.clone();
        move |b: B| move |c: C| f(a, b, c)
    });

    ap(ap(curried, b), c)
}

pub fn map4<E, A, B, C, D, R, F, TA, TB, TC, TD>(f: F, a: TA, b: TB, c: TC, d: TD) -> Task<E, R>
where
    E: 'static,
    A: 'static,
    B: 'static,
    C: 'static,
    D: 'static,
    R: 'static,
    F: Fn(A, B, C, D) -> R + 'static,
    TA: IntoTask<Error = E, Output = A>,
    TB: IntoTask<Error = E, Output = B>,
    TC: IntoTask<Error = E, Output = C>,
    TD: IntoTask<Error = E, Output = D>,
{
    let f = Rc::new(f);
    let curried = a.into_task().map(move |a: A| {
        let f = f.clone();
        move |b: B| move |c: C| move |d: D| f(a, b, c, d)
    });

    ap(ap(ap(curried, b), c), d)
}

/// Pairs the values of two tasks running concurrently.
pub fn zip<E, A, B, TA, TB>(a: TA, b: TB) -> Task<E, (A, B)>
where
    E: 'static,
    A: 'static,
    B: 'static,
    TA: IntoTask<Error = E, Output = A>,
    TB: IntoTask<Error = E, Output = B>,
{
    map2(|a, b| (a, b), a, b)
}

/// Same as [`map2`] with the tasks first.
pub fn zip_with<E, A, B, R, F, TA, TB>(a: TA, b: TB, f: F) -> Task<E, R>
where
    E: 'static,
    A: 'static,
    B: 'static,
    R: 'static,
    F: Fn(A, B) -> R + 'static,
    TA: IntoTask<Error = E, Output = A>,
    TB: IntoTask<Error = E, Output = B>,
{
    map2(f, a, b)
}

struct Collected<S> {
    slots: Vec<Option<S>>,
    remaining: usize,
}

/// Runs every task concurrently and collects their values in input order.
///
/// The first failure fails the result and cancels every other task. An
/// empty input resolves with an empty vector.
pub fn all<I>(tasks: I) -> Task<<I::Item as IntoTask>::Error, Vec<<I::Item as IntoTask>::Output>>
where
    I: IntoIterator,
    I::Item: IntoTask,
    <I::Item as IntoTask>::Error: 'static,
    <I::Item as IntoTask>::Output: 'static,
{
    all_of(collect(tasks))
}

/// Waits for every promise and collects their values in input order.
///
/// Same as [`all`] over promises: the first rejection fails the result.
pub fn from_promises<E, S, I>(promises: I) -> Task<E, Vec<S>>
where
    E: Clone + 'static,
    S: Clone + 'static,
    I: IntoIterator<Item = Promise<E, S>>,
{
    all(promises)
}

fn all_of<E: 'static, S: 'static>(tasks: Rc<[Task<E, S>]>) -> Task<E, Vec<S>> {
    Task::new(move |settle: Settle<E, Vec<S>>| {
        if tasks.is_empty() {
            settle.resolve(Vec::new());
            return CancelHandle::noop();
        }

        let collected = Rc::new(RefCell::new(Collected {
            slots: (0..tasks.len()).map(|_| None).collect(),
            remaining: tasks.len(),
        }));
        let children = CancelHandle::new();

        for (index, task) in tasks.iter().enumerate() {
            let on_value = {
                let (collected, settle) = (collected.clone(), settle.clone());
                move |value: S| {
                    let values = {
                        let mut collected = collected.borrow_mut();
                        collected.slots[index] = Some(value);
                        collected.remaining -= 1;

                        (collected.remaining == 0)
                            .then(|| collected.slots.drain(..).flatten().collect::<Vec<_>>())
                    };

                    if let Some(values) = values {
                        settle.resolve(values);
                    }
                }
            };

            children.link(task.fork(reject_all(&settle, &children), on_value));
        }

        children
    })
}

/// Runs every task concurrently and collects the values of those that
/// succeed, in completion order.
///
/// Never fails. Settles once every task has settled.
pub fn all_successes<I>(tasks: I) -> Task<<I::Item as IntoTask>::Error, Vec<<I::Item as IntoTask>::Output>>
where
    I: IntoIterator,
    I::Item: IntoTask,
    <I::Item as IntoTask>::Error: 'static,
    <I::Item as IntoTask>::Output: 'static,
{
    all_successes_of(collect(tasks))
}

fn all_successes_of<E: 'static, S: 'static>(tasks: Rc<[Task<E, S>]>) -> Task<E, Vec<S>> {
    Task::new(move |settle: Settle<E, Vec<S>>| {
        let successes = Rc::new(RefCell::new(Collected {
            slots: Vec::with_capacity(tasks.len()),
            remaining: tasks.len(),
        }));

        if tasks.is_empty() {
            settle.resolve(Vec::new());
            return CancelHandle::noop();
        }

        let children = CancelHandle::new();

        for task in tasks.iter() {
            let settled = {
                let (successes, settle) = (successes.clone(), settle.clone());
                move |value: Option<S>| {
                    let values = {
                        let mut successes = successes.borrow_mut();
                        successes.slots.push(value);
                        successes.remaining -= 1;

                        (successes.remaining == 0)
                            .then(|| successes.slots.drain(..).flatten().collect::<Vec<_>>())
                    };

                    if let Some(values) = values {
                        settle.resolve(values);
                    }
                }
            };
            let failed = settled.clone();

            children.link(task.fork(move |_: E| failed(None), move |value: S| settled(Some(value))));
        }

        children
    })
}

/// Settles with whichever task settles first, success or failure, and
/// cancels the rest.
///
/// An empty input never settles.
pub fn race<I>(tasks: I) -> Task<<I::Item as IntoTask>::Error, <I::Item as IntoTask>::Output>
where
    I: IntoIterator,
    I::Item: IntoTask,
    <I::Item as IntoTask>::Error: 'static,
    <I::Item as IntoTask>::Output: 'static,
{
    race_of(collect(tasks))
}

fn race_of<E: 'static, S: 'static>(tasks: Rc<[Task<E, S>]>) -> Task<E, S> {
    Task::new(move |settle: Settle<E, S>| {
        if tasks.is_empty() {
            tracing::debug!("racing an empty set of tasks, the race never settles");
            return CancelHandle::noop();
        }

        let children = CancelHandle::new();

        for task in tasks.iter() {
            let on_value = {
                let (settle, children) = (settle.clone(), children.clone());
                move |value: S| {
                    settle.resolve(value);
                    children.cancel();
                }
            };

            children.link(task.fork(reject_all(&settle, &children), on_value));
        }

        children
    })
}

/// Resolves with the first success and cancels the rest.
///
/// Fails with every error, in arrival order, once all tasks have failed.
/// An empty input fails with an empty vector.
pub fn first_success<I>(tasks: I) -> Task<Vec<<I::Item as IntoTask>::Error>, <I::Item as IntoTask>::Output>
where
    I: IntoIterator,
    I::Item: IntoTask,
    <I::Item as IntoTask>::Error: 'static,
    <I::Item as IntoTask>::Output: 'static,
{
    first_success_of(collect(tasks))
}

fn first_success_of<E: 'static, S: 'static>(tasks: Rc<[Task<E, S>]>) -> Task<Vec<E>, S> {
    Task::new(move |settle: Settle<Vec<E>, S>| {
        if tasks.is_empty() {
            settle.reject(Vec::new());
            return CancelHandle::noop();
        }

        let errors = Rc::new(RefCell::new(Vec::with_capacity(tasks.len())));
        let children = CancelHandle::new();
        let total = tasks.len();

        for task in tasks.iter() {
            let on_error = {
                let (errors, settle) = (errors.clone(), settle.clone());
                move |error: E| {
                    let exhausted = {
                        let mut errors = errors.borrow_mut();
                        errors.push(error);
                        (errors.len() == total).then(|| std::mem::take(&mut *errors))
                    };

                    if let Some(errors) = exhausted {
                        settle.reject(errors);
                    }
                }
            };
            let on_value = {
                let (settle, children) = (settle.clone(), children.clone());
                move |value: S| {
                    settle.resolve(value);
                    children.cancel();
                }
            };

            children.link(task.fork(on_error, on_value));
        }

        children
    })
}

impl<E: 'static, F: 'static> Task<E, F> {
    /// Method form of [`ap`]: applies this task's function to `arg`.
    pub fn ap<A, B, T>(&self, arg: T) -> Task<E, B>
    where
        F: FnOnce(A) -> B,
        A: 'static,
        B: 'static,
        T: IntoTask<Error = E, Output = A>,
    {
        ap(self.clone(), arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    #[test]
    fn ap_forks_argument_after_synchronous_failure() {
        let started = Rc::new(Cell::new(false));
        let func = Task::<&str, fn(i32) -> i32>::fail("no function");
        let arg = Task::new({
            let started = started.clone();
            move |settle: Settle<&str, i32>| {
                started.set(true);
                settle.resolve(1);
                CancelHandle::noop()
            }
        });

        let failed = Rc::new(Cell::new(None));
        ap(func, arg).fork(
            {
                let failed = failed.clone();
                move |e| failed.set(Some(e))
            },
            |_| panic!("a failed function branch must not resolve"),
        );

        assert!(started.get());
        assert_eq!(failed.get(), Some("no function"));
    }

    #[test]
    fn map3_applies_in_argument_order() {
        let out = Rc::new(Cell::new(0));
        let task = map3(
            |a: i32, b: i32, c: i32| a * 100 + b * 10 + c,
            Task::<(), _>::succeed(1),
            Task::succeed(2),
            Task::succeed(3),
        );

        task.fork(|_| {}, {
            let out = out.clone();
            move |v| out.set(v)
        });

        assert_eq!(out.get(), 123);
    }
}
