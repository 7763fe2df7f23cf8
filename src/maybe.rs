//! The deferred-failure value
//!
//! [`Maybe<T, E>`] holds either a success value or a failure of the one declared
//! failure type `E`. It lets expected failures travel as plain data through
//! iterator pipelines and promise chains; nothing is raised until the caller
//! explicitly asks for it with [`or_else`](Maybe::or_else),
//! [`or_else_throw`](Maybe::or_else_throw) or [`into_result`](Maybe::into_result).
//!
//! # Examples
//!
//! ```
//! use undertow::{by_value, wrap_fn, Maybe};
//!
//! fn parse(s: &str) -> Result<i32, String> {
//!     s.parse().map_err(|_| format!("not a number: {}", s))
//! }
//!
//! let results: Vec<Maybe<i32, String>> = vec!["1", "x", "3"]
//!     .into_iter()
//!     .map(wrap_fn(parse))
//!     .filter(by_value(|n: &i32| *n != 3))
//!     .collect();
//!
//! // The filter kept the failure, it only looked at values.
//! assert_eq!(results, vec![Maybe::success(1), Maybe::failure("not a number: x".to_string())]);
//! ```
//!
//! ```
//! use undertow::Maybe;
//!
//! let mut seen = Vec::new();
//! let values: Vec<i32> = vec![Maybe::success(1), Maybe::failure("bad"), Maybe::success(2)]
//!     .into_iter()
//!     .flat_map(|m| m.catching(|e| seen.push(e)))
//!     .collect();
//!
//! assert_eq!(values, vec![1, 2]);
//! assert_eq!(seen, vec!["bad"]);
//! ```

use std::fmt;
use std::panic::Location;

use crate::raise::{rewrap, Raise};

/// A success value of type `T` or a deferred failure of type `E`.
///
/// Equality and hashing delegate to `T` and `E`: two failures are equal when
/// their failure values are, and a success never equals a failure.
///
/// Prefer [`Maybe::failure`] over the `Failure` variant when boxing a fresh
/// failure; it re-asserts cooperative cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Maybe<T, E> {
    /// A success value, which may itself be an absent value such as `None`.
    Success(T),
    /// A deferred failure.
    Failure(E),
}

impl<T, E> Maybe<T, E> {
    /// Create a success.
    ///
    /// ```
    /// use undertow::Maybe;
    ///
    /// let m = Maybe::<Option<i32>, String>::success(None);
    /// assert!(m.is_present());
    /// ```
    #[inline]
    pub fn success(value: T) -> Self {
        Maybe::Success(value)
    }

    /// Box a failure.
    ///
    /// If `failure` is a cooperative-cancellation signal, its token is
    /// cancelled again so the request is not absorbed by being stored as data.
    pub fn failure(failure: E) -> Self
    where
        E: Raise,
    {
        reassert_cancellation(&failure);
        Maybe::Failure(failure)
    }

    /// Convert from a `Result`, boxing an error with [`Maybe::failure`].
    ///
    /// ```
    /// use undertow::Maybe;
    ///
    /// assert_eq!(Maybe::from_result(Ok::<_, String>(1)), Maybe::success(1));
    /// ```
    #[inline]
    pub fn from_result(result: Result<T, E>) -> Self
    where
        E: Raise,
    {
        match result {
            Ok(value) => Maybe::Success(value),
            Err(failure) => Maybe::failure(failure),
        }
    }

    /// Returns `true` for a success.
    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, Maybe::Success(_))
    }

    /// Returns `true` for a failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Maybe::Failure(_))
    }

    /// The success value, discarding any failure.
    #[inline]
    pub fn ok(self) -> Option<T> {
        match self {
            Maybe::Success(value) => Some(value),
            Maybe::Failure(_) => None,
        }
    }

    /// The failure, discarding any success value.
    #[inline]
    pub fn err(self) -> Option<E> {
        match self {
            Maybe::Success(_) => None,
            Maybe::Failure(failure) => Some(failure),
        }
    }

    /// Convert to `Maybe<&T, &E>`.
    #[inline]
    pub fn as_ref(&self) -> Maybe<&T, &E> {
        match self {
            Maybe::Success(value) => Maybe::Success(value),
            Maybe::Failure(failure) => Maybe::Failure(failure),
        }
    }

    /// Transform the success value. Failures pass through and `f` is not called.
    ///
    /// A passed-through failure is boxed again with [`Maybe::failure`], so a
    /// cancellation keeps its token asserted.
    ///
    /// ```
    /// use undertow::Maybe;
    ///
    /// assert_eq!(Maybe::<_, String>::success(1).map(|n| n.to_string()), Maybe::success("1".to_string()));
    /// assert_eq!(Maybe::<i32, _>::failure("bad").map(|n| n + 1), Maybe::failure("bad"));
    /// ```
    #[inline]
    pub fn map<U, F>(self, f: F) -> Maybe<U, E>
    where
        F: FnOnce(T) -> U,
        E: Raise,
    {
        match self {
            Maybe::Success(value) => Maybe::Success(f(value)),
            Maybe::Failure(failure) => Maybe::failure(failure),
        }
    }

    /// Chain a computation that itself produces a `Maybe`.
    ///
    /// The result of `f` is returned unchanged. Failures pass through as in
    /// [`map`](Maybe::map) and `f` is not called.
    ///
    /// ```
    /// use undertow::Maybe;
    ///
    /// let half = |n: i32| if n % 2 == 0 { Maybe::success(n / 2) } else { Maybe::failure("odd") };
    ///
    /// assert_eq!(Maybe::success(4).and_then(half), Maybe::success(2));
    /// assert_eq!(Maybe::success(3).and_then(half), Maybe::failure("odd"));
    /// ```
    #[inline]
    pub fn and_then<U, F>(self, f: F) -> Maybe<U, E>
    where
        F: FnOnce(T) -> Maybe<U, E>,
        E: Raise,
    {
        match self {
            Maybe::Success(value) => f(value),
            Maybe::Failure(failure) => Maybe::failure(failure),
        }
    }

    /// Alias for [`and_then`](Maybe::and_then).
    #[inline]
    pub fn flat_map<U, F>(self, f: F) -> Maybe<U, E>
    where
        F: FnOnce(T) -> Maybe<U, E>,
        E: Raise,
    {
        self.and_then(f)
    }

    /// Run `consumer` on the success value, then return `self`.
    #[inline]
    pub fn if_present<F>(self, consumer: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Maybe::Success(value) = &self {
            consumer(value);
        }
        self
    }

    /// Return the success value, or hand the failure to `recover`.
    ///
    /// Whatever `recover` returns, success or error, is the result. This is
    /// the one place a caller sees the stored failure without it being raised.
    ///
    /// ```
    /// use undertow::Maybe;
    ///
    /// let good = Maybe::<_, String>::success("good".to_string());
    /// assert_eq!(good.or_else(|e| Ok::<_, ()>(e)), Ok("good".to_string()));
    ///
    /// let bad = Maybe::<String, _>::failure("bad".to_string());
    /// assert_eq!(bad.or_else(|e| Ok::<_, ()>(e)), Ok("bad".to_string()));
    /// ```
    #[inline]
    pub fn or_else<X, F>(self, recover: F) -> Result<T, X>
    where
        F: FnOnce(E) -> Result<T, X>,
    {
        match self {
            Maybe::Success(value) => Ok(value),
            Maybe::Failure(failure) => recover(failure),
        }
    }

    /// Return the success value, or compute one from the failure.
    #[inline]
    pub fn unwrap_or_else<F>(self, recover: F) -> T
    where
        F: FnOnce(E) -> T,
    {
        match self {
            Maybe::Success(value) => value,
            Maybe::Failure(failure) => recover(failure),
        }
    }

    /// Return the success value, or raise the failure rebuilt at this call.
    ///
    /// The raised error has the same type and fields as the stored failure,
    /// a backtrace and caller location taken here, and the stored failure as
    /// its cause. A cancellation is raised bare and its token cleared.
    /// Failure types that cannot be rebuilt are raised unchanged after a
    /// warning is logged. See [`Raise`].
    ///
    /// Use [`or_else_throw_with`](Maybe::or_else_throw_with) to wrap the
    /// failure yourself, or [`into_result`](Maybe::into_result) to get the
    /// stored failure as is.
    #[track_caller]
    pub fn or_else_throw(self) -> Result<T, E>
    where
        E: Raise,
    {
        let site = Location::caller();
        self.or_else(|failure| Err(rewrap(failure, site)))
    }

    /// Return the success value, or raise the failure produced by `wrapper`.
    ///
    /// ```
    /// use undertow::Maybe;
    ///
    /// let m = Maybe::<i32, String>::Failure("disk full".into());
    /// assert_eq!(m.or_else_throw_with(|e| format!("saving: {}", e)), Err("saving: disk full".to_string()));
    /// ```
    #[inline]
    pub fn or_else_throw_with<F>(self, wrapper: F) -> Result<T, E>
    where
        F: FnOnce(E) -> E,
    {
        self.or_else(|failure| Err(wrapper(failure)))
    }

    /// Convert to a `Result` holding the stored failure as is.
    #[inline]
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Maybe::Success(value) => Ok(value),
            Maybe::Failure(failure) => Err(failure),
        }
    }

    /// Hand a failure to `handler` and drop it from an iterator pipeline.
    ///
    /// Returns an iterator over the success value, or an empty one after
    /// `handler` has seen the failure. Meant for `Iterator::flat_map`.
    #[inline]
    pub fn catching<H>(self, handler: H) -> std::option::IntoIter<T>
    where
        H: FnOnce(E),
    {
        match self {
            Maybe::Success(value) => Some(value).into_iter(),
            Maybe::Failure(failure) => {
                handler(failure);
                None.into_iter()
            }
        }
    }
}

/// Cancel the token of a cooperative-cancellation failure again.
pub(crate) fn reassert_cancellation<E: Raise>(failure: &E) {
    if let Some(token) = failure.cancellation() {
        token.cancel();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Re-asserted cancellation while boxing {}",
            std::any::type_name::<E>()
        );
    }
}

/// Lift a predicate on values to a predicate on [`Maybe`].
///
/// Successes are tested with `predicate`. Failures are always accepted, so a
/// filter built from this never drops an error on the floor.
///
/// ```
/// use undertow::{by_value, Maybe};
///
/// let kept: Vec<Maybe<i32, &str>> = vec![Maybe::success(1), Maybe::failure("bad"), Maybe::success(2)]
///     .into_iter()
///     .filter(by_value(|n: &i32| *n > 1))
///     .collect();
///
/// assert_eq!(kept, vec![Maybe::failure("bad"), Maybe::success(2)]);
/// ```
pub fn by_value<T, E, P>(mut predicate: P) -> impl FnMut(&Maybe<T, E>) -> bool
where
    P: FnMut(&T) -> bool,
{
    move |maybe: &Maybe<T, E>| match maybe {
        Maybe::Success(value) => predicate(value),
        Maybe::Failure(_) => true,
    }
}

impl<T: fmt::Display, E: fmt::Display> fmt::Display for Maybe<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maybe::Success(value) => write!(f, "{}", value),
            Maybe::Failure(failure) => write!(f, "failure: {}", failure),
        }
    }
}

impl<T, E: Raise> From<Result<T, E>> for Maybe<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Maybe::from_result(result)
    }
}

impl<T, E> From<Maybe<T, E>> for Result<T, E> {
    fn from(maybe: Maybe<T, E>) -> Self {
        maybe.into_result()
    }
}

#[cfg(feature = "try_trait")]
impl<T, E: Raise> std::ops::Try for Maybe<T, E> {
    type Output = T;
    type Residual = Maybe<std::convert::Infallible, E>;

    fn from_output(output: T) -> Self {
        Maybe::Success(output)
    }

    fn branch(self) -> std::ops::ControlFlow<Self::Residual, T> {
        match self {
            Maybe::Success(value) => std::ops::ControlFlow::Continue(value),
            Maybe::Failure(failure) => std::ops::ControlFlow::Break(Maybe::Failure(failure)),
        }
    }
}

#[cfg(feature = "try_trait")]
impl<T, E, F: From<E> + Raise> std::ops::FromResidual<Maybe<std::convert::Infallible, E>>
    for Maybe<T, F>
{
    fn from_residual(residual: Maybe<std::convert::Infallible, E>) -> Self {
        match residual {
            Maybe::Failure(failure) => Maybe::failure(From::from(failure)),
            Maybe::Success(never) => match never {},
        }
    }
}

#[cfg(feature = "try_trait")]
impl<T, E, F: From<E> + Raise> std::ops::FromResidual<Result<std::convert::Infallible, E>>
    for Maybe<T, F>
{
    fn from_residual(residual: Result<std::convert::Infallible, E>) -> Self {
        match residual {
            Err(failure) => Maybe::failure(From::from(failure)),
            Ok(never) => match never {},
        }
    }
}
