use crate::error::TryError;
use crate::fork::{CancelHandle, Settle};
use crate::task::{IntoTask, Task};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Outcome of one step of [`iterate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T, S> {
    /// Run another step with this state.
    Continue(T),
    /// Stop and resolve with this value.
    Break(S),
}

type StepFn<E, T, S> = dyn Fn(T) -> Task<E, Step<T, S>>;

/// Drives the steps of one fork of [`iterate`].
///
/// Steps that settle synchronously hand their state back through `next`
/// instead of recursing, so long synchronous loops run in constant stack.
struct Trampoline<E, T, S> {
    step: Rc<StepFn<E, T, S>>,
    settle: Settle<E, S>,

    /// State for the next step, when one is due.
    next: RefCell<Option<T>>,

    /// Set while `drive` is looping on this fork.
    running: Cell<bool>,

    /// Handle of the step currently running.
    current: Rc<RefCell<CancelHandle>>,
}

impl<E: 'static, T: 'static, S: 'static> Trampoline<E, T, S> {
    fn drive(this: &Rc<Self>, state: T) {
        *this.next.borrow_mut() = Some(state);

        if this.running.replace(true) {
            return;
        }

        loop {
            let Some(state) = this.next.borrow_mut().take() else {
                break;
            };

            if !this.settle.is_live() {
                break;
            }

            let on_step = {
                let this = this.clone();
                move |step: Step<T, S>| match step {
                    Step::Continue(state) => Trampoline::drive(&this, state),
                    Step::Break(value) => this.settle.resolve(value),
                }
            };

            let handle = (this.step)(state).fork(this.settle.rejecter(), on_step);
            *this.current.borrow_mut() = handle;
        }

        this.running.set(false);
    }
}

/// Runs `step` repeatedly, threading a state through, until a step breaks.
///
/// Each step is a task; the first failing step fails the loop. Steps run
/// one after another, and cancelling the fork cancels the running step.
///
/// # Examples
///
/// ```rust
/// use forked::{iterate, Step, Task};
///
/// let countdown = iterate(
///     |n: u32| Task::<(), _>::succeed(if n == 0 { Step::Break("liftoff") } else { Step::Continue(n - 1) }),
///     10,
/// );
///
/// countdown.fork(|_| {}, |v| assert_eq!(v, "liftoff"));
/// ```
pub fn iterate<E, T, S, F, R>(step: F, initial: T) -> Task<E, S>
where
    E: 'static,
    T: Clone + 'static,
    S: 'static,
    F: Fn(T) -> R + 'static,
    R: IntoTask<Error = E, Output = Step<T, S>>,
{
    let step: Rc<StepFn<E, T, S>> = Rc::new(move |state: T| step(state).into_task());

    Task::new(move |settle: Settle<E, S>| {
        let trampoline = Rc::new(Trampoline {
            step: step.clone(),
            settle: settle.clone(),
            next: RefCell::new(None),
            running: Cell::new(false),
            current: Rc::new(RefCell::new(CancelHandle::noop())),
        });

        let current = trampoline.current.clone();
        settle.on_cancel(move || {
            let handle = current.borrow().clone();
            handle.cancel();
        });

        Trampoline::drive(&trampoline, initial.clone());

        CancelHandle::noop()
    })
}

/// Folds `items` through `f` one task at a time.
///
/// `f` receives the accumulator, the item and its index, and returns a task
/// producing the next accumulator.
pub fn reduce<E, T, V, F, R, I>(f: F, initial: V, items: I) -> Task<E, V>
where
    E: 'static,
    T: 'static,
    V: Clone + 'static,
    F: Fn(V, &T, usize) -> R + 'static,
    R: IntoTask<Error = E, Output = V>,
    I: IntoIterator<Item = T>,
{
    let items: Rc<[T]> = items.into_iter().collect();
    let f = Rc::new(f);

    iterate(
        move |(index, acc): (usize, V)| match items.get(index) {
            Some(item) => f(acc, item, index)
                .into_task()
                .map(move |next| Step::Continue((index + 1, next))),
            None => Task::succeed(Step::Break(acc)),
        },
        (0, initial),
    )
}

/// Runs the tasks one after another and collects their values in order.
///
/// The first failure stops the sequence; later tasks are never forked.
pub fn sequence<I>(tasks: I) -> Task<<I::Item as IntoTask>::Error, Vec<<I::Item as IntoTask>::Output>>
where
    I: IntoIterator,
    I::Item: IntoTask,
    <I::Item as IntoTask>::Error: 'static,
    <I::Item as IntoTask>::Output: 'static,
{
    sequence_of(tasks.into_iter().map(IntoTask::into_task).collect())
}

fn sequence_of<E: 'static, S: 'static>(tasks: Rc<[Task<E, S>]>) -> Task<E, Vec<S>> {
    Task::new(move |settle: Settle<E, Vec<S>>| {
        let values = Rc::new(RefCell::new(Vec::with_capacity(tasks.len())));
        let tasks = tasks.clone();

        let run = iterate(
            move |index: usize| -> Task<E, Step<usize, Vec<S>>> {
                let values = values.clone();

                match tasks.get(index) {
                    Some(task) => task.map(move |value| {
                        values.borrow_mut().push(value);
                        Step::Continue(index + 1)
                    }),
                    None => Task::new(move |settle| {
                        settle.resolve(Step::Break(values.take()));
                        CancelHandle::noop()
                    }),
                }
            },
            0,
        );

        run.fork(settle.rejecter(), settle.resolver())
    })
}

/// What [`try_sequence`] does after an alternative fails.
#[derive(Debug)]
pub enum Fallback<E, S> {
    /// Try the next alternative.
    Next,
    /// Give up and fail with this error.
    Abort,
    /// Settle with this task instead.
    Replace(Task<E, S>),
}

/// Tries the tasks one after another until one succeeds.
///
/// After each failure, `policy` decides what happens next. Exhausting the
/// tasks fails with [`TryError::EndOfSequence`].
pub fn try_sequence<I, P>(
    policy: P,
    tasks: I,
) -> Task<TryError<<I::Item as IntoTask>::Error>, <I::Item as IntoTask>::Output>
where
    I: IntoIterator,
    I::Item: IntoTask,
    <I::Item as IntoTask>::Error: 'static,
    <I::Item as IntoTask>::Output: 'static,
    P: Fn(&<I::Item as IntoTask>::Error) -> Fallback<<I::Item as IntoTask>::Error, <I::Item as IntoTask>::Output>
        + 'static,
{
    try_sequence_of(Rc::new(policy), tasks.into_iter().map(IntoTask::into_task).collect())
}

type Policy<E, S> = dyn Fn(&E) -> Fallback<E, S>;

fn try_sequence_of<E: 'static, S: 'static>(
    policy: Rc<Policy<E, S>>,
    tasks: Rc<[Task<E, S>]>,
) -> Task<TryError<E>, S> {
    iterate(
        move |index: usize| -> Task<TryError<E>, Step<usize, S>> {
            let Some(task) = tasks.get(index).cloned() else {
                tracing::debug!(alternatives = index, "every alternative failed");
                return Task::new(|settle| {
                    settle.reject(TryError::EndOfSequence);
                    CancelHandle::noop()
                });
            };
            let policy = policy.clone();

            Task::new(move |settle: Settle<TryError<E>, Step<usize, S>>| {
                let on_error = {
                    let (policy, settle) = (policy.clone(), settle.clone());
                    move |error: E| match policy(&error) {
                        Fallback::Next => {
                            tracing::debug!(alternative = index, "alternative failed, trying the next one");
                            settle.resolve(Step::Continue(index + 1))
                        }
                        Fallback::Abort => {
                            tracing::debug!(alternative = index, "alternative failed, aborting");
                            settle.reject(TryError::Failed(error))
                        }
                        Fallback::Replace(substitute) => {
                            tracing::debug!(alternative = index, "alternative failed, forking its replacement");
                            let (failed, succeeded) = (settle.clone(), settle.clone());
                            let child = substitute.fork(
                                move |error| failed.reject(TryError::Failed(error)),
                                move |value| succeeded.resolve(Step::Break(value)),
                            );
                            settle.link(child);
                        }
                    }
                };
                let on_value = {
                    let settle = settle.clone();
                    move |value: S| settle.resolve(Step::Break(value))
                };

                task.fork(on_error, on_value)
            })
        },
        0,
    )
}
