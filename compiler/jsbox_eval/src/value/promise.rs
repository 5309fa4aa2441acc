//! Promise settlement and the futures that wait on it.
//!
//! A promise owns at most one pending task: the body of an async function,
//! a `then` reaction, or the adoption of another promise. Tasks start
//! eagerly and are re-polled when something they wait on settles, either by
//! the host's executor through a registered waker or directly by the
//! settling promise through its dependents list.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use super::{Obj, Value, WeakObj};
use crate::errors::{thrown, type_error, EvalError, EvalResult};

/// Work that settles a promise when it completes.
pub type Task = Pin<Box<dyn Future<Output = EvalResult>>>;

pub type PromiseCell = Rc<RefCell<PromiseState>>;

#[derive(Clone, Debug, PartialEq)]
pub enum PromiseStatus {
    Pending,
    Fulfilled(Value),
    /// Rejections keep the structured error so that uncatchable errors
    /// survive a trip through an async function.
    Rejected(EvalError),
}

pub struct PromiseState {
    status: PromiseStatus,
    task: Option<Task>,
    wakers: Vec<Waker>,
    dependents: Vec<WeakObj>,
}

impl PromiseState {
    pub fn new() -> Self {
        PromiseState {
            status: PromiseStatus::Pending,
            task: None,
            wakers: Vec::new(),
            dependents: Vec::new(),
        }
    }

    pub fn status(&self) -> &PromiseStatus {
        &self.status
    }

    fn outcome(&self) -> Option<EvalResult> {
        match &self.status {
            PromiseStatus::Pending => None,
            PromiseStatus::Fulfilled(value) => Some(Ok(value.clone())),
            PromiseStatus::Rejected(err) => Some(Err(err.clone())),
        }
    }
}

impl Default for PromiseState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseState")
            .field("status", &self.status)
            .field("has_task", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

thread_local! {
    static NOOP_WAKER: Waker = Waker::from(Arc::new(NoopWake));
    /// Promises whose task is being polled, innermost last.
    static DRIVING: RefCell<Vec<Obj>> = const { RefCell::new(Vec::new()) };
}

fn noop_waker() -> Waker {
    NOOP_WAKER.with(Clone::clone)
}

/// Current state of a promise object; `None` for non-promises.
pub fn status(promise: &Obj) -> Option<PromiseStatus> {
    promise.promise().map(|cell| cell.borrow().status.clone())
}

/// Attach `task` to `promise` and run it until its first suspension.
pub(crate) fn start(promise: &Obj, task: Task) {
    if let Some(cell) = promise.promise() {
        cell.borrow_mut().task = Some(task);
    }
    drive(promise);
}

/// Poll `promise`'s task once, outside any executor.
pub(crate) fn drive(promise: &Obj) {
    let waker = noop_waker();
    drive_with(promise, &mut Context::from_waker(&waker));
}

fn drive_with(promise: &Obj, cx: &mut Context<'_>) {
    let Some(cell) = promise.promise() else {
        return;
    };
    let Some(mut task) = cell.borrow_mut().task.take() else {
        return;
    };
    DRIVING.with(|d| d.borrow_mut().push(promise.clone()));
    let poll = task.as_mut().poll(cx);
    DRIVING.with(|d| d.borrow_mut().pop());
    match poll {
        Poll::Ready(result) => settle(promise, result),
        Poll::Pending => {
            let mut state = cell.borrow_mut();
            if state.status == PromiseStatus::Pending {
                state.task = Some(task);
            }
        }
    }
}

/// Settle `promise` once. Fulfilling with another promise adopts its state.
pub(crate) fn settle(promise: &Obj, result: EvalResult) {
    let Some(cell) = promise.promise() else {
        return;
    };
    if cell.borrow().status != PromiseStatus::Pending {
        return;
    }
    if let Ok(Value::Object(inner)) = &result {
        if inner.promise().is_some() {
            if inner.ptr_eq(promise) {
                settle(
                    promise,
                    Err(type_error("Chaining cycle detected for promise")),
                );
                return;
            }
            let inner = inner.clone();
            start(promise, Box::pin(PromiseFuture::new(inner)));
            return;
        }
    }

    let (task, wakers, dependents) = {
        let mut state = cell.borrow_mut();
        state.status = match result {
            Ok(value) => PromiseStatus::Fulfilled(value),
            Err(err) => PromiseStatus::Rejected(err),
        };
        (
            state.task.take(),
            std::mem::take(&mut state.wakers),
            std::mem::take(&mut state.dependents),
        )
    };
    drop(task);
    tracing::trace!(
        wakers = wakers.len(),
        dependents = dependents.len(),
        "promise settled"
    );
    for waker in wakers {
        waker.wake();
    }
    for dependent in dependents {
        if let Some(dependent) = dependent.upgrade() {
            drive(&dependent);
        }
    }
}

/// Future that completes when a promise settles.
pub struct PromiseFuture {
    promise: Obj,
}

impl PromiseFuture {
    pub fn new(promise: Obj) -> Self {
        PromiseFuture { promise }
    }
}

impl Future for PromiseFuture {
    type Output = EvalResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<EvalResult> {
        let promise = &self.promise;
        let Some(cell) = promise.promise() else {
            return Poll::Ready(Ok(Value::Object(promise.clone())));
        };
        if let Some(outcome) = cell.borrow().outcome() {
            return Poll::Ready(outcome);
        }
        drive_with(promise, cx);
        if let Some(outcome) = cell.borrow().outcome() {
            return Poll::Ready(outcome);
        }

        let mut state = cell.borrow_mut();
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        DRIVING.with(|driving| {
            if let Some(current) = driving.borrow().last() {
                let known = state
                    .dependents
                    .iter()
                    .any(|d| d.upgrade().is_some_and(|d| d.ptr_eq(current)));
                if !current.ptr_eq(promise) && !known {
                    state.dependents.push(current.downgrade());
                }
            }
        });
        Poll::Pending
    }
}

/// Host-side control of a promise the host created.
#[derive(Clone, Debug)]
pub struct PromiseHandle {
    promise: Obj,
}

impl PromiseHandle {
    pub(crate) fn new(promise: Obj) -> Self {
        PromiseHandle { promise }
    }

    /// The promise as a script value.
    pub fn value(&self) -> Value {
        Value::Object(self.promise.clone())
    }

    pub fn resolve(&self, value: Value) {
        settle(&self.promise, Ok(value));
    }

    pub fn reject(&self, reason: Value) {
        settle(&self.promise, Err(thrown(reason)));
    }

    pub fn status(&self) -> PromiseStatus {
        status(&self.promise).unwrap_or(PromiseStatus::Pending)
    }

    /// Wait for settlement.
    pub fn settled(&self) -> PromiseFuture {
        PromiseFuture::new(self.promise.clone())
    }
}
