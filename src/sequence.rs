//! Iterator adaptation for deferred failures
//!
//! - [`maybe_iter`] turns a fallible supplier of a sequence into an iterator
//!   of per-element [`Maybe`]s; a failing supplier becomes a single failure.
//! - The `wrap_*_iter` adapters do the same per call, for `Iterator::flat_map`.
//! - [`drain`] consumes an iterator of `Maybe`s in order and stops at the first
//!   failure.
//! - [`MaybeIteratorExt`] adds `catching`, `filter_by_value` and
//!   `collect_values` to any iterator of `Maybe`s.
//!
//! # Example
//!
//! ```
//! use undertow::{wrap_fn_iter, Maybe, MaybeIteratorExt};
//!
//! fn children(dir: &str) -> Result<Vec<String>, String> {
//!     match dir {
//!         "locked" => Err("permission denied".to_string()),
//!         _ => Ok(vec![format!("{}/a", dir), format!("{}/b", dir)]),
//!     }
//! }
//!
//! let mut errors = Vec::new();
//! let files: Vec<String> = vec!["src", "locked", "docs"]
//!     .into_iter()
//!     .flat_map(wrap_fn_iter(children))
//!     .catching(|e| errors.push(e))
//!     .collect();
//!
//! assert_eq!(files, vec!["src/a", "src/b", "docs/a", "docs/b"]);
//! assert_eq!(errors, vec!["permission denied"]);
//! ```

use std::error::Error as StdError;
use std::iter::FusedIterator;

use crate::maybe::Maybe;
use crate::raise::Raise;
use crate::wrap::{attempt, attempt_as, BoxError};

/// Iterator of per-element [`Maybe`]s over a sequence that may have failed as a whole.
///
/// Yields every element of the sequence as a success, or a single failure if
/// the sequence could not be produced.
#[derive(Debug, Clone)]
pub struct MaybeIter<I, E> {
    state: State<I, E>,
}

#[derive(Debug, Clone)]
enum State<I, E> {
    Values(I),
    Failed(Option<E>),
}

impl<I, E> MaybeIter<I, E> {
    /// Spread a boxed sequence over its elements.
    pub fn new<S>(source: Maybe<S, E>) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        let state = match source {
            Maybe::Success(values) => State::Values(values.into_iter()),
            Maybe::Failure(failure) => State::Failed(Some(failure)),
        };
        MaybeIter { state }
    }
}

impl<I, E> Iterator for MaybeIter<I, E>
where
    I: Iterator,
{
    type Item = Maybe<I::Item, E>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            State::Values(values) => values.next().map(Maybe::Success),
            State::Failed(failure) => failure.take().map(Maybe::Failure),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.state {
            State::Values(values) => values.size_hint(),
            State::Failed(failure) => {
                let n = usize::from(failure.is_some());
                (n, Some(n))
            }
        }
    }
}

impl<I, E> FusedIterator for MaybeIter<I, E> where I: FusedIterator {}

impl<S, E> From<Maybe<S, E>> for MaybeIter<S::IntoIter, E>
where
    S: IntoIterator,
{
    fn from(source: Maybe<S, E>) -> Self {
        MaybeIter::new(source)
    }
}

/// Call `supplier` once and spread its sequence into per-element [`Maybe`]s.
///
/// ```
/// use undertow::{maybe_iter, Maybe};
///
/// let ok: Vec<_> = maybe_iter(|| Ok::<_, String>(vec![1, 2])).collect();
/// assert_eq!(ok, vec![Maybe::success(1), Maybe::success(2)]);
///
/// let failed: Vec<Maybe<i32, _>> = maybe_iter(|| Err::<Vec<i32>, _>("offline".to_string())).collect();
/// assert_eq!(failed, vec![Maybe::failure("offline".to_string())]);
/// ```
pub fn maybe_iter<S, E, F>(supplier: F) -> MaybeIter<S::IntoIter, E>
where
    F: FnOnce() -> Result<S, E>,
    S: IntoIterator,
    E: Raise,
{
    MaybeIter::new(attempt(supplier))
}

/// Like [`maybe_iter`], checking failures at runtime with [`attempt_as`].
pub fn maybe_iter_as<E, S, F>(supplier: F) -> MaybeIter<S::IntoIter, E>
where
    F: FnOnce() -> Result<S, BoxError>,
    S: IntoIterator,
    E: Raise + StdError + 'static,
{
    MaybeIter::new(attempt_as(supplier))
}

/// Adapt a sequence supplier into one returning a [`MaybeIter`] on every call.
pub fn wrap_iter<S, E, F>(mut supplier: F) -> impl FnMut() -> MaybeIter<S::IntoIter, E>
where
    F: FnMut() -> Result<S, E>,
    S: IntoIterator,
    E: Raise,
{
    move || maybe_iter(&mut supplier)
}

/// Like [`wrap_iter`], checking failures at runtime with [`attempt_as`].
pub fn wrap_iter_as<E, S, F>(mut supplier: F) -> impl FnMut() -> MaybeIter<S::IntoIter, E>
where
    F: FnMut() -> Result<S, BoxError>,
    S: IntoIterator,
    E: Raise + StdError + 'static,
{
    move || maybe_iter_as(&mut supplier)
}

/// Adapt a one-argument sequence function for `Iterator::flat_map`.
pub fn wrap_fn_iter<A, S, E, F>(mut function: F) -> impl FnMut(A) -> MaybeIter<S::IntoIter, E>
where
    F: FnMut(A) -> Result<S, E>,
    S: IntoIterator,
    E: Raise,
{
    move |input| maybe_iter(|| function(input))
}

/// Like [`wrap_fn_iter`], checking failures at runtime with [`attempt_as`].
pub fn wrap_fn_iter_as<E, A, S, F>(mut function: F) -> impl FnMut(A) -> MaybeIter<S::IntoIter, E>
where
    F: FnMut(A) -> Result<S, BoxError>,
    S: IntoIterator,
    E: Raise + StdError + 'static,
{
    move |input| maybe_iter_as(|| function(input))
}

/// Adapt a two-argument sequence function into one returning a [`MaybeIter`].
pub fn wrap_bi_fn_iter<A, B, S, E, F>(
    mut function: F,
) -> impl FnMut(A, B) -> MaybeIter<S::IntoIter, E>
where
    F: FnMut(A, B) -> Result<S, E>,
    S: IntoIterator,
    E: Raise,
{
    move |a, b| maybe_iter(|| function(a, b))
}

/// Like [`wrap_bi_fn_iter`], checking failures at runtime with [`attempt_as`].
pub fn wrap_bi_fn_iter_as<E, A, B, S, F>(
    mut function: F,
) -> impl FnMut(A, B) -> MaybeIter<S::IntoIter, E>
where
    F: FnMut(A, B) -> Result<S, BoxError>,
    S: IntoIterator,
    E: Raise + StdError + 'static,
{
    move |a, b| maybe_iter_as(|| function(a, b))
}

/// Collect the success values in order, stopping at the first failure.
///
/// Elements after the first failure are never pulled from the iterator. The
/// failure is returned as stored; use
/// [`or_else_throw`](Maybe::or_else_throw) per element to rebuild it instead.
///
/// ```
/// use undertow::{drain, Maybe};
///
/// assert_eq!(drain(vec![Maybe::<_, &str>::success(1), Maybe::success(2)]), Ok(vec![1, 2]));
/// assert_eq!(drain(vec![Maybe::success(1), Maybe::failure("bad"), Maybe::success(3)]), Err("bad"));
/// ```
pub fn drain<T, E, I>(iter: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Maybe<T, E>>,
{
    iter.into_iter().map(Maybe::into_result).collect()
}

/// Iterator returned by [`MaybeIteratorExt::catching`].
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Catching<I, H> {
    iter: I,
    handler: H,
}

impl<I, H, T, E> Iterator for Catching<I, H>
where
    I: Iterator<Item = Maybe<T, E>>,
    H: FnMut(E),
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        for maybe in self.iter.by_ref() {
            match maybe {
                Maybe::Success(value) => return Some(value),
                Maybe::Failure(failure) => (self.handler)(failure),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.iter.size_hint().1)
    }
}

/// Iterator returned by [`MaybeIteratorExt::filter_by_value`].
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct FilterByValue<I, P> {
    iter: I,
    predicate: P,
}

impl<I, P, T, E> Iterator for FilterByValue<I, P>
where
    I: Iterator<Item = Maybe<T, E>>,
    P: FnMut(&T) -> bool,
{
    type Item = Maybe<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let predicate = &mut self.predicate;
        self.iter.find(|maybe| match maybe {
            Maybe::Success(value) => predicate(value),
            Maybe::Failure(_) => true,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.iter.size_hint().1)
    }
}

/// Pipeline helpers for iterators of [`Maybe`].
pub trait MaybeIteratorExt<T, E>: Iterator<Item = Maybe<T, E>> + Sized {
    /// Yield the success values, handing each failure to `handler` exactly once.
    fn catching<H>(self, handler: H) -> Catching<Self, H>
    where
        H: FnMut(E),
    {
        Catching {
            iter: self,
            handler,
        }
    }

    /// Keep successes matching `predicate` and every failure.
    ///
    /// ```
    /// use undertow::{Maybe, MaybeIteratorExt};
    ///
    /// let kept: Vec<_> = vec![Maybe::<_, &str>::failure("bad"), Maybe::success(1)]
    ///     .into_iter()
    ///     .filter_by_value(|_| false)
    ///     .collect();
    /// assert_eq!(kept, vec![Maybe::failure("bad")]);
    /// ```
    fn filter_by_value<P>(self, predicate: P) -> FilterByValue<Self, P>
    where
        P: FnMut(&T) -> bool,
    {
        FilterByValue {
            iter: self,
            predicate,
        }
    }

    /// [`drain`] this iterator.
    fn collect_values(self) -> Result<Vec<T>, E> {
        drain(self)
    }
}

impl<I, T, E> MaybeIteratorExt<T, E> for I where I: Iterator<Item = Maybe<T, E>> {}
