//! Adapters that turn fallible callables into total ones
//!
//! Each adapter runs a callable returning `Result` and boxes the outcome into a
//! [`Maybe`], so it can be used in `Iterator::map` or `std::iter::repeat_with`
//! without stopping the pipeline at the first error.
//!
//! Panics are not failures: they unwind straight out of the adapter and are
//! never boxed.
//!
//! The `*_as` variants accept callables returning a dynamic [`BoxError`] and
//! check at runtime that the error really is the declared failure type. An
//! error of any other type is a broken contract and panics.
//!
//! # Example
//!
//! ```
//! use undertow::{drain, wrap_fn, Maybe};
//!
//! fn fetch(id: u32) -> Result<String, String> {
//!     if id < 10 { Ok(format!("job-{}", id)) } else { Err(format!("no job {}", id)) }
//! }
//!
//! let jobs = vec![1, 2].into_iter().map(wrap_fn(fetch));
//! assert_eq!(drain(jobs), Ok(vec!["job-1".to_string(), "job-2".to_string()]));
//!
//! let jobs = vec![1, 20, 3].into_iter().map(wrap_fn(fetch));
//! assert_eq!(drain(jobs), Err("no job 20".to_string()));
//! ```

use std::any::type_name;
use std::error::Error as StdError;

use crate::maybe::Maybe;
use crate::raise::Raise;

/// A dynamically typed, thread-safe error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Run `supplier` now and box its outcome.
///
/// ```
/// use undertow::{attempt, Maybe};
///
/// assert_eq!(attempt(|| "7".parse::<i32>().map_err(|e| e.to_string())), Maybe::success(7));
/// assert!(attempt(|| "x".parse::<i32>().map_err(|e| e.to_string())).is_failure());
/// ```
pub fn attempt<T, E, F>(supplier: F) -> Maybe<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Raise,
{
    match supplier() {
        Ok(value) => Maybe::success(value),
        Err(failure) => Maybe::failure(failure),
    }
}

/// Run `supplier` now, boxing a failure only if it is an `E`.
///
/// # Panics
///
/// Panics if `supplier` fails with an error that is not an `E`.
///
/// ```
/// use std::io;
/// use undertow::{attempt_as, BoxError};
///
/// let m = attempt_as::<io::Error, (), _>(|| Err(BoxError::from(io::Error::other("gone"))));
/// assert_eq!(m.err().map(|e| e.to_string()), Some("gone".to_string()));
/// ```
pub fn attempt_as<E, T, F>(supplier: F) -> Maybe<T, E>
where
    F: FnOnce() -> Result<T, BoxError>,
    E: Raise + StdError + 'static,
{
    match supplier() {
        Ok(value) => Maybe::success(value),
        Err(error) => match error.downcast::<E>() {
            Ok(failure) => Maybe::failure(*failure),
            Err(other) => panic!(
                "expected a failure of type {}, caught: {}",
                type_name::<E>(),
                other
            ),
        },
    }
}

/// Adapt a supplier into one that returns [`Maybe`] on every call.
///
/// ```
/// use undertow::{wrap, Maybe};
///
/// let mut n = 0;
/// let first: Vec<Maybe<i32, String>> = std::iter::repeat_with(wrap(|| { n += 1; Ok(n) }))
///     .take(2)
///     .collect();
/// assert_eq!(first, vec![Maybe::success(1), Maybe::success(2)]);
/// ```
pub fn wrap<T, E, F>(mut supplier: F) -> impl FnMut() -> Maybe<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Raise,
{
    move || attempt(&mut supplier)
}

/// Like [`wrap`], checking failures at runtime with [`attempt_as`].
pub fn wrap_as<E, T, F>(mut supplier: F) -> impl FnMut() -> Maybe<T, E>
where
    F: FnMut() -> Result<T, BoxError>,
    E: Raise + StdError + 'static,
{
    move || attempt_as(&mut supplier)
}

/// Adapt a one-argument function into one returning [`Maybe`].
pub fn wrap_fn<A, T, E, F>(mut function: F) -> impl FnMut(A) -> Maybe<T, E>
where
    F: FnMut(A) -> Result<T, E>,
    E: Raise,
{
    move |input| attempt(|| function(input))
}

/// Like [`wrap_fn`], checking failures at runtime with [`attempt_as`].
pub fn wrap_fn_as<E, A, T, F>(mut function: F) -> impl FnMut(A) -> Maybe<T, E>
where
    F: FnMut(A) -> Result<T, BoxError>,
    E: Raise + StdError + 'static,
{
    move |input| attempt_as(|| function(input))
}

/// Adapt a two-argument function into one returning [`Maybe`].
///
/// ```
/// use undertow::{wrap_bi_fn, Maybe};
///
/// let mut div = wrap_bi_fn(|a: i32, b: i32| a.checked_div(b).ok_or_else(|| "divide by zero".to_string()));
/// assert_eq!(div(6, 3), Maybe::success(2));
/// assert_eq!(div(1, 0), Maybe::failure("divide by zero".to_string()));
/// ```
pub fn wrap_bi_fn<A, B, T, E, F>(mut function: F) -> impl FnMut(A, B) -> Maybe<T, E>
where
    F: FnMut(A, B) -> Result<T, E>,
    E: Raise,
{
    move |a, b| attempt(|| function(a, b))
}

/// Like [`wrap_bi_fn`], checking failures at runtime with [`attempt_as`].
pub fn wrap_bi_fn_as<E, A, B, T, F>(mut function: F) -> impl FnMut(A, B) -> Maybe<T, E>
where
    F: FnMut(A, B) -> Result<T, BoxError>,
    E: Raise + StdError + 'static,
{
    move |a, b| attempt_as(|| function(a, b))
}
