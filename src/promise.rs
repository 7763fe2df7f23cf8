//! A one-shot, manually completed promise
//!
//! [`promise()`] returns a [`Completer`] and a [`Promise`]. The completer settles
//! the promise once, with a value or an error; later attempts are no-ops. The
//! promise side is consumed either by awaiting it or by registering a single
//! completion observer with [`Promise::on_complete`], which runs on whichever
//! thread settles it.
//!
//! # Example
//!
//! ```
//! use undertow::promise::promise;
//!
//! # tokio_test::block_on(async {
//! let (completer, promise) = promise::<i32>();
//!
//! assert!(completer.complete(1));
//! assert!(!completer.complete(2));
//!
//! assert_eq!(promise.await.unwrap(), 1);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use futures::future::FusedFuture;

use crate::wrap::BoxError;

/// Outcome a promise settles with.
pub type Outcome<T> = Result<T, BoxError>;

type Observer<T> = Box<dyn FnOnce(Outcome<T>) + Send>;

enum State<T> {
    Pending {
        observer: Option<Observer<T>>,
        waker: Option<Waker>,
    },
    Ready(Outcome<T>),
    Taken,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    completers: AtomicUsize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a pending promise and the handle that completes it.
pub fn promise<T>() -> (Completer<T>, Promise<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending {
            observer: None,
            waker: None,
        }),
        completers: AtomicUsize::new(1),
    });
    (
        Completer {
            shared: Arc::clone(&shared),
        },
        Promise { shared },
    )
}

/// The last [`Completer`] of a promise was dropped before settling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenPromise;

impl fmt::Display for BrokenPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise dropped without being completed")
    }
}

impl StdError for BrokenPromise {}

/// Settles a [`Promise`]. Clones settle the same promise; the first settle wins.
///
/// Dropping the last completer of a pending promise fails it with
/// [`BrokenPromise`].
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completer<T> {
    /// Complete with a value. Returns `false` if already settled.
    pub fn complete(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Complete with an error. Returns `false` if already settled.
    pub fn complete_exceptionally(&self, error: impl Into<BoxError>) -> bool {
        self.settle(Err(error.into()))
    }

    /// Complete with `outcome`. Returns `false` if already settled.
    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        let mut state = self.shared.lock();
        let (observer, waker) = match &mut *state {
            State::Pending { observer, waker } => (observer.take(), waker.take()),
            State::Ready(_) | State::Taken => return false,
        };

        match observer {
            Some(observer) => {
                *state = State::Taken;
                drop(state);
                observer(outcome);
            }
            None => {
                *state = State::Ready(outcome);
                drop(state);
                if let Some(waker) = waker {
                    waker.wake();
                }
            }
        }
        true
    }

    /// Returns `true` once the promise has been settled.
    pub fn is_done(&self) -> bool {
        !matches!(&*self.shared.lock(), State::Pending { .. })
    }
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Self {
        self.shared.completers.fetch_add(1, Ordering::Relaxed);
        Completer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.shared.completers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.complete_exceptionally(BrokenPromise);
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("done", &self.is_done())
            .finish()
    }
}

/// The receiving side of a one-shot promise.
///
/// Resolves to `Ok(value)` or `Err(error)` when awaited.
#[must_use = "promises do nothing unless awaited or observed"]
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// A promise already completed with `value`.
    pub fn completed(value: T) -> Self {
        let (completer, promise) = promise();
        completer.complete(value);
        promise
    }

    /// A promise already failed with `error`.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        let (completer, promise) = promise();
        completer.complete_exceptionally(error);
        promise
    }

    /// Register the single completion observer.
    ///
    /// If the promise is already settled, `observer` runs now on this
    /// thread; otherwise it runs on the thread that settles it.
    ///
    /// ```
    /// use std::sync::mpsc;
    /// use undertow::promise::promise;
    ///
    /// let (completer, promise) = promise::<&str>();
    /// let (tx, rx) = mpsc::channel();
    /// promise.on_complete(move |outcome| tx.send(outcome.is_ok()).unwrap());
    ///
    /// completer.complete("done");
    /// assert!(rx.recv().unwrap());
    /// ```
    pub fn on_complete<F>(self, observer: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let mut state = self.shared.lock();
        match std::mem::replace(&mut *state, State::Taken) {
            State::Ready(outcome) => {
                drop(state);
                observer(outcome);
            }
            State::Pending { .. } => {
                *state = State::Pending {
                    observer: Some(Box::new(observer)),
                    waker: None,
                };
            }
            State::Taken => {}
        }
    }

    /// Drive `future` on the tokio runtime and settle a promise with its outcome.
    ///
    /// A panic in `future` fails the promise with the task's join error.
    #[cfg(feature = "async")]
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Outcome<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (completer, promise) = promise();
        let handle = tokio::spawn(future);
        tokio::spawn(async move {
            match handle.await {
                Ok(outcome) => completer.settle(outcome),
                Err(join_error) => completer.complete_exceptionally(join_error),
            };
        });
        promise
    }
}

impl<T> Future for Promise<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock();
        match std::mem::replace(&mut *state, State::Taken) {
            State::Ready(outcome) => Poll::Ready(outcome),
            State::Pending { observer, .. } => {
                *state = State::Pending {
                    observer,
                    waker: Some(cx.waker().clone()),
                };
                Poll::Pending
            }
            State::Taken => panic!("`Promise` polled after completion"),
        }
    }
}

impl<T> FusedFuture for Promise<T> {
    fn is_terminated(&self) -> bool {
        matches!(&*self.shared.lock(), State::Taken)
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.lock() {
            State::Pending { .. } => "pending",
            State::Ready(Ok(_)) => "completed",
            State::Ready(Err(_)) => "failed",
            State::Taken => "taken",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::mpsc;
    use std::thread;

    #[tokio::test]
    async fn test_complete_then_await() {
        let (completer, promise) = promise::<i32>();
        assert!(completer.complete(7));
        assert_eq!(promise.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_await_then_complete_from_thread() {
        let (completer, promise) = promise::<&str>();
        let worker = thread::spawn(move || completer.complete("late"));

        assert_eq!(promise.await.unwrap(), "late");
        assert!(worker.join().unwrap());
    }

    #[tokio::test]
    async fn test_first_completion_wins() {
        let (completer, promise) = promise::<i32>();
        let other = completer.clone();

        assert!(completer.complete_exceptionally(io::Error::other("first")));
        assert!(!other.complete(2));
        assert!(other.is_done());

        assert_eq!(promise.await.unwrap_err().to_string(), "first");
    }

    #[test]
    fn test_observer_runs_on_completion() {
        let (completer, promise) = promise::<i32>();
        let (tx, rx) = mpsc::channel();
        promise.on_complete(move |outcome| tx.send(outcome.unwrap()).unwrap());

        assert!(rx.try_recv().is_err());
        completer.complete(3);
        assert_eq!(rx.recv().unwrap(), 3);
    }

    #[test]
    fn test_observer_runs_immediately_when_settled() {
        let (tx, rx) = mpsc::channel();
        Promise::<i32>::failed(io::Error::other("boom"))
            .on_complete(move |outcome| tx.send(outcome.is_err()).unwrap());
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn test_completed_constructor() {
        let value = futures::executor::block_on(Promise::completed(5)).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_terminated_after_await() {
        let mut promise = Promise::completed(1);
        assert!(!promise.is_terminated());
        let value = futures::executor::block_on(&mut promise).unwrap();
        assert_eq!(value, 1);
        assert!(promise.is_terminated());
    }

    #[test]
    fn test_dropping_last_completer_breaks_promise() {
        let (completer, promise) = promise::<i32>();
        let other = completer.clone();

        drop(completer);
        assert!(!other.is_done());

        drop(other);
        let err = futures::executor::block_on(promise).unwrap_err();
        assert!(err.is::<BrokenPromise>());
        assert_eq!(err.to_string(), "promise dropped without being completed");
    }

    #[test]
    fn test_dropping_settled_completer_keeps_value() {
        let (completer, promise) = promise::<i32>();
        completer.complete(9);
        drop(completer);
        assert_eq!(futures::executor::block_on(promise).unwrap(), 9);
    }

    #[test]
    fn test_dropped_completer_runs_observer() {
        let (completer, promise) = promise::<i32>();
        let (tx, rx) = mpsc::channel();
        promise.on_complete(move |outcome| {
            tx.send(outcome.unwrap_err().is::<BrokenPromise>()).unwrap()
        });

        drop(completer);
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn test_debug_reports_state() {
        let (completer, promise) = promise::<i32>();
        assert!(format!("{:?}", promise).contains("pending"));
        completer.complete(1);
        assert!(format!("{:?}", promise).contains("completed"));
        assert!(format!("{:?}", completer).contains("true"));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_spawn_settles_with_future_outcome() {
        let promise = Promise::spawn(async { Ok::<_, BoxError>(11) });
        assert_eq!(promise.await.unwrap(), 11);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_spawn_panic_fails_promise() {
        let promise = Promise::spawn(async {
            if true {
                panic!("task blew up");
            }
            Ok::<i32, BoxError>(0)
        });
        assert!(promise.await.is_err());
    }
}
