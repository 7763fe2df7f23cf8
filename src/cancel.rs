//! Cooperative cancellation
//!
//! A cancellation request is an ordinary failure in this crate: a task that was
//! asked to stop reports [`Cancelled`], and that failure travels through
//! pipelines like any other. Two rules keep it from getting lost:
//!
//! - Boxing a `Cancelled` into a [`Maybe`](crate::Maybe) with
//!   [`Maybe::failure`](crate::Maybe::failure) re-asserts its token, so code
//!   further down still observes the request.
//! - Unwrapping it with [`or_else_throw`](crate::Maybe::or_else_throw) clears
//!   the token and hands back a bare `Cancelled`, which is what callers that
//!   handle cancellation expect to see.
//!
//! # Example
//!
//! ```
//! use undertow::{CancellationToken, Cancelled, Maybe};
//!
//! let token = CancellationToken::new();
//! let maybe: Maybe<i32, Cancelled> = Maybe::failure(Cancelled::new(token.clone()));
//!
//! // Boxing the failure re-asserted the request.
//! assert!(token.is_cancelled());
//!
//! // Unwrapping clears it again.
//! assert!(maybe.or_else_throw().is_err());
//! assert!(!token.is_cancelled());
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::raise::{DuplicateError, Provenance, Raise};

/// A shared, resettable cancellation flag.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if cancellation has been requested and not cleared.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the request, returning whether it was set.
    ///
    /// ```
    /// use undertow::CancellationToken;
    ///
    /// let token = CancellationToken::new();
    /// token.cancel();
    /// assert!(token.clear());
    /// assert!(!token.clear());
    /// ```
    pub fn clear(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }

    /// Returns `true` if both tokens share the same flag.
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }

    /// Fail with [`Cancelled`] if cancellation has been requested.
    ///
    /// Handy at the top of a supplier so that cancelled work turns into a
    /// `Cancelled` failure instead of running.
    ///
    /// ```
    /// use undertow::{CancellationToken, Cancelled};
    ///
    /// let token = CancellationToken::new();
    /// assert!(token.check().is_ok());
    ///
    /// token.cancel();
    /// let err: Cancelled = token.check().unwrap_err();
    /// assert!(err.token().same_as(&token));
    /// ```
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled::new(self.clone()))
        } else {
            Ok(())
        }
    }
}

/// The cooperative-cancellation failure kind.
///
/// Carries the token whose request it reports.
#[derive(Debug)]
pub struct Cancelled {
    token: CancellationToken,
    provenance: Provenance<Cancelled>,
}

impl Cancelled {
    /// Create a cancellation failure for `token`.
    pub fn new(token: CancellationToken) -> Self {
        Cancelled {
            token,
            provenance: Provenance::new(),
        }
    }

    /// The token this failure reports on.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Diagnostic slots. A cancellation raised by `or_else_throw` never has a cause.
    pub fn provenance(&self) -> &Provenance<Cancelled> {
        &self.provenance
    }
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation cancelled")
    }
}

impl StdError for Cancelled {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.provenance.source()
    }
}

impl Raise for Cancelled {
    fn cancellation(&self) -> Option<&CancellationToken> {
        Some(&self.token)
    }

    fn duplicate(&self) -> Result<Self, DuplicateError> {
        Ok(Cancelled::new(self.token.clone()))
    }

    fn provenance_mut(&mut self) -> Option<&mut Provenance<Self>> {
        Some(&mut self.provenance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        other.cancel();

        assert!(token.is_cancelled());
        assert!(token.same_as(&other));
        assert!(!token.same_as(&CancellationToken::new()));
    }

    #[test]
    fn test_clear_reports_previous_state() {
        let token = CancellationToken::new();
        assert!(!token.clear());

        token.cancel();
        assert!(token.clear());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_check() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());

        token.cancel();
        let err = token.check().unwrap_err();
        assert!(err.token().same_as(&token));
        assert_eq!(err.to_string(), "operation cancelled");
    }

    #[test]
    fn test_duplicate_is_blank() {
        let token = CancellationToken::new();
        let cancelled = Cancelled::new(token.clone());
        let copy = cancelled.duplicate().unwrap();

        assert!(copy.token().same_as(&token));
        assert!(copy.source().is_none());
        assert!(copy.provenance().site().is_none());
    }
}
