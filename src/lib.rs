//! # Undertow
//!
//! > *Failures carried beneath the surface until you ask for them.*
//!
//! A Rust library for deferring expected failures through iterator pipelines
//! and promise chains.
//!
//! ## Philosophy
//!
//! A pipeline that maps fallible work over many inputs should not have to
//! choose between stopping at the first error and throwing errors away.
//! **Undertow** boxes each outcome into a [`Maybe`], lets the pipeline map,
//! filter and flat-map as usual, and raises the failure only at an explicit
//! terminal point:
//! - [`Maybe::or_else`] to recover,
//! - [`Maybe::or_else_throw`] to raise it rebuilt at the unwrap site,
//! - [`drain`] to collect values and stop at the first failure.
//!
//! ## Quick Example
//!
//! ```rust
//! use undertow::{by_value, drain, wrap_fn, Maybe};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Job { id: u32, pending: bool }
//!
//! fn fetch_job(id: u32) -> Result<Job, String> {
//!     match id {
//!         0 => Err("job 0 does not exist".to_string()),
//!         _ => Ok(Job { id, pending: id % 2 == 1 }),
//!     }
//! }
//!
//! // Failures stay in the pipeline; the filter only looks at values.
//! let pending = vec![1, 2, 3].into_iter()
//!     .map(wrap_fn(fetch_job))
//!     .filter(by_value(|job: &Job| job.pending));
//! let jobs = drain(pending).unwrap();
//! assert_eq!(jobs.iter().map(|job| job.id).collect::<Vec<_>>(), vec![1, 3]);
//!
//! let broken = vec![1, 0, 3].into_iter()
//!     .map(wrap_fn(fetch_job))
//!     .filter(by_value(|job: &Job| job.pending));
//! assert_eq!(drain(broken), Err("job 0 does not exist".to_string()));
//! ```
//!
//! ## Asynchronous code
//!
//! ```rust
//! use undertow::{catch_failure, Promise};
//!
//! # #[derive(Debug)] struct AuthError;
//! # impl std::fmt::Display for AuthError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "auth") }
//! # }
//! # impl std::error::Error for AuthError {}
//! # impl undertow::Raise for AuthError {}
//! # tokio_test::block_on(async {
//! let login = Promise::<String>::failed(AuthError);
//!
//! let user = catch_failure::<_, AuthError>(login)
//!     .await
//!     .unwrap()
//!     .unwrap_or_else(|_| "anonymous".to_string());
//! assert_eq!(user, "anonymous");
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![cfg_attr(feature = "try_trait", feature(try_trait_v2))]

pub mod bridge;
pub mod cancel;
pub mod maybe;
pub mod promise;
pub mod raise;
pub mod sequence;
pub mod testing;
pub mod wrap;

#[cfg(feature = "serde")]
mod serde_impl;

// Re-exports
pub use bridge::{catch_failure, catch_failure_async, BridgeError, CompletionError};
pub use cancel::{CancellationToken, Cancelled};
pub use maybe::{by_value, Maybe};
pub use promise::{BrokenPromise, Completer, Outcome, Promise};
pub use raise::{DuplicateError, Provenance, Raise};
pub use sequence::{
    drain, maybe_iter, maybe_iter_as, wrap_bi_fn_iter, wrap_bi_fn_iter_as, wrap_fn_iter,
    wrap_fn_iter_as, wrap_iter, wrap_iter_as, MaybeIter, MaybeIteratorExt,
};
pub use wrap::{
    attempt, attempt_as, wrap, wrap_as, wrap_bi_fn, wrap_bi_fn_as, wrap_fn, wrap_fn_as,
    BoxError,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::maybe::{by_value, Maybe};
    pub use crate::raise::{Provenance, Raise};
    pub use crate::sequence::{drain, maybe_iter, wrap_fn_iter, MaybeIteratorExt};
    pub use crate::wrap::{attempt, wrap, wrap_bi_fn, wrap_fn, BoxError};
}
