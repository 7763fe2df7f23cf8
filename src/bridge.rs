//! Catching one failure type out of asynchronous computations
//!
//! [`catch_failure`] watches a [`Promise`] and produces a promise of
//! [`Maybe`]: a failure of the declared type `E` becomes a `Maybe::Failure`
//! that completes normally, while any other error is passed through untouched.
//! Asynchronous layers often box the real error in a [`CompletionError`]; those
//! layers are looked through when searching for an `E`.
//!
//! [`catch_failure_async`] does the same for any future.
//!
//! # Example
//!
//! ```
//! use std::io;
//! use undertow::{catch_failure, CompletionError, Maybe, Promise};
//!
//! # tokio_test::block_on(async {
//! let failed = Promise::<u32>::failed(CompletionError::new(io::Error::other("offline")));
//!
//! let caught = catch_failure::<_, io::Error>(failed).await.unwrap();
//! let user = caught.unwrap_or_else(|_| 0);
//! assert_eq!(user, 0);
//! # });
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use crate::maybe::{reassert_cancellation, Maybe};
use crate::promise::{promise, Outcome, Promise};
use crate::raise::Raise;
use crate::wrap::BoxError;

/// Wrapper an asynchronous layer puts around the error of the work it ran.
#[derive(Debug)]
pub struct CompletionError {
    source: BoxError,
}

impl CompletionError {
    /// Wrap `source`.
    pub fn new(source: impl Into<BoxError>) -> Self {
        CompletionError {
            source: source.into(),
        }
    }

    /// The wrapped error.
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asynchronous computation failed: {}", self.source)
    }
}

impl StdError for CompletionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

/// The bridge itself panicked while settling its output.
///
/// The error the input failed with, if any, is kept as the source.
#[derive(Debug)]
pub struct BridgeError {
    message: String,
    suppressed: Option<BoxError>,
}

impl BridgeError {
    /// The panic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The input's error, if it was still available.
    pub fn suppressed(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.suppressed.as_deref()
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failure bridge panicked: {}", self.message)
    }
}

impl StdError for BridgeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.suppressed
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// Catch failures of type `E` from `input` into a promise of [`Maybe`].
///
/// - `Ok(v)` settles the output with `Maybe::success(v)`.
/// - An error that is an `E`, directly or under any number of
///   [`CompletionError`] layers, settles it with `Maybe::failure`.
///   `CompletionError` is the only wrapper looked through; an `E` inside any
///   other error, such as a tokio `JoinError`, is not found.
/// - Any other error fails the output with that same error, unchanged.
///
/// The output is always settled, even if this bridge panics along the way;
/// it then fails with a [`BridgeError`] whose source is the input's error
/// when the bridge still held it.
pub fn catch_failure<T, E>(input: Promise<T>) -> Promise<Maybe<T, E>>
where
    T: Send + 'static,
    E: Raise + StdError + Send + Sync + 'static,
{
    let (completer, output) = promise();
    input.on_complete(move |outcome| {
        completer.settle(classify(outcome));
    });
    output
}

/// [`catch_failure`] for a future.
///
/// ```
/// use undertow::{catch_failure_async, BoxError, Maybe};
///
/// # tokio_test::block_on(async {
/// let caught = catch_failure_async::<_, std::fmt::Error, _>(async { Ok::<_, BoxError>(1) }).await;
/// assert_eq!(caught.unwrap(), Maybe::success(1));
/// # });
/// ```
pub async fn catch_failure_async<T, E, F>(input: F) -> Outcome<Maybe<T, E>>
where
    F: Future<Output = Outcome<T>>,
    E: Raise + StdError + Send + Sync + 'static,
{
    classify(input.await)
}

fn classify<T, E>(outcome: Outcome<T>) -> Outcome<Maybe<T, E>>
where
    E: Raise + StdError + Send + Sync + 'static,
{
    let error = match outcome {
        Ok(value) => return Ok(Maybe::success(value)),
        Err(error) => error,
    };

    let depth = match panic::catch_unwind(AssertUnwindSafe(|| failure_depth::<E>(&*error))) {
        Ok(Some(depth)) => depth,
        Ok(None) => return Err(error),
        Err(payload) => return Err(bridge_failure(payload, Some(error))),
    };

    let failure = take_failure::<E>(error, depth)?;
    match panic::catch_unwind(AssertUnwindSafe(|| reassert_cancellation(&failure))) {
        Ok(()) => Ok(Maybe::Failure(failure)),
        Err(payload) => Err(bridge_failure(payload, Some(Box::new(failure) as BoxError))),
    }
}

/// How many `CompletionError` layers sit above the first `E` in the chain.
fn failure_depth<E>(error: &(dyn StdError + 'static)) -> Option<usize>
where
    E: StdError + 'static,
{
    let mut node = error;
    let mut depth = 0;
    loop {
        if node.is::<E>() {
            return Some(depth);
        }
        if !node.is::<CompletionError>() {
            return None;
        }
        node = node.source()?;
        depth += 1;
    }
}

fn take_failure<E>(mut error: BoxError, depth: usize) -> Result<E, BoxError>
where
    E: StdError + 'static,
{
    for _ in 0..depth {
        error = error.downcast::<CompletionError>()?.into_source();
    }
    error.downcast::<E>().map(|failure| *failure)
}

fn bridge_failure(payload: Box<dyn Any + Send>, suppressed: Option<BoxError>) -> BoxError {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };

    #[cfg(feature = "tracing")]
    tracing::warn!("Failure bridge panicked, failing output: {}", message);
    #[cfg(not(feature = "tracing"))]
    eprintln!("Failure bridge panicked, failing output: {}", message);

    Box::new(BridgeError {
        message,
        suppressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::promise::promise;
    use std::io;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct AuthError(String);

    impl fmt::Display for AuthError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "not authenticated: {}", self.0)
        }
    }

    impl StdError for AuthError {}

    impl Raise for AuthError {}

    #[derive(Debug)]
    struct Treacherous;

    impl fmt::Display for Treacherous {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "treacherous")
        }
    }

    impl StdError for Treacherous {}

    impl Raise for Treacherous {
        fn cancellation(&self) -> Option<&CancellationToken> {
            panic!("cancellation lookup exploded")
        }
    }

    #[tokio::test]
    async fn test_success_becomes_success() {
        let caught = catch_failure::<_, AuthError>(Promise::completed("alice")).await;
        assert_eq!(caught.unwrap(), Maybe::success("alice"));
    }

    #[tokio::test]
    async fn test_declared_failure_is_caught() {
        let input = Promise::<u32>::failed(AuthError("token expired".into()));
        let caught = catch_failure::<_, AuthError>(input).await.unwrap();
        assert_eq!(caught, Maybe::failure(AuthError("token expired".into())));
    }

    #[tokio::test]
    async fn test_failure_under_two_wrappers_is_unwrapped() {
        let input = Promise::<u32>::failed(CompletionError::new(CompletionError::new(
            AuthError("nested".into()),
        )));
        let caught = catch_failure::<_, AuthError>(input).await.unwrap();
        assert_eq!(caught, Maybe::failure(AuthError("nested".into())));
    }

    #[tokio::test]
    async fn test_unrelated_failure_passes_through_unchanged() {
        let input = Promise::<u32>::failed(io::Error::other("disk"));
        let err = catch_failure::<_, AuthError>(input).await.unwrap_err();

        let io_err = err.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.to_string(), "disk");
    }

    #[tokio::test]
    async fn test_wrapped_unrelated_failure_keeps_wrapper() {
        let input = Promise::<u32>::failed(CompletionError::new(io::Error::other("disk")));
        let err = catch_failure::<_, AuthError>(input).await.unwrap_err();

        assert!(err.is::<CompletionError>());
        assert_eq!(err.to_string(), "asynchronous computation failed: disk");
    }

    #[derive(Debug)]
    struct TaskFailed(AuthError);

    impl fmt::Display for TaskFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "task failed")
        }
    }

    impl StdError for TaskFailed {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[tokio::test]
    async fn test_only_completion_error_is_looked_through() {
        let input = Promise::<u32>::failed(TaskFailed(AuthError("hidden".into())));
        let err = catch_failure::<_, AuthError>(input).await.unwrap_err();
        assert!(err.is::<TaskFailed>());
    }

    #[tokio::test]
    async fn test_completion_on_other_thread() {
        let (completer, input) = promise::<i32>();
        let output = catch_failure::<_, AuthError>(input);

        thread::spawn(move || completer.complete_exceptionally(AuthError("remote".into())))
            .join()
            .unwrap();

        let caught = output.await.unwrap();
        assert_eq!(caught, Maybe::failure(AuthError("remote".into())));
    }

    #[tokio::test]
    async fn test_panicking_bridge_fails_output() {
        let input = Promise::<u32>::failed(Treacherous);
        let err = catch_failure::<_, Treacherous>(input).await.unwrap_err();

        let bridge = err.downcast_ref::<BridgeError>().unwrap();
        assert_eq!(bridge.message(), "cancellation lookup exploded");

        let suppressed = bridge.suppressed().unwrap();
        assert!(suppressed.is::<Treacherous>());
        assert_eq!(err.source().unwrap().to_string(), "treacherous");
    }

    #[tokio::test]
    async fn test_catch_failure_async() {
        let caught = catch_failure_async::<u32, AuthError, _>(async {
            Err::<u32, BoxError>(CompletionError::new(AuthError("async".into())).into())
        })
        .await
        .unwrap();
        assert_eq!(caught.err(), Some(AuthError("async".into())));
    }

    #[test]
    fn test_failure_depth() {
        let direct = AuthError("x".into());
        assert_eq!(failure_depth::<AuthError>(&direct), Some(0));

        let wrapped = CompletionError::new(CompletionError::new(AuthError("x".into())));
        assert_eq!(failure_depth::<AuthError>(&wrapped), Some(2));

        let other = CompletionError::new(io::Error::other("x"));
        assert_eq!(failure_depth::<AuthError>(&other), None);
    }

    #[test]
    fn test_bridge_error_display_and_source() {
        let err = bridge_failure(Box::new("boom"), Some(io::Error::other("input").into()));
        assert_eq!(err.to_string(), "failure bridge panicked: boom");
        assert_eq!(err.source().unwrap().to_string(), "input");
    }
}
