//! Raising deferred failures at the unwrap site
//!
//! A failure boxed into a [`Maybe`](crate::Maybe) is usually created far from
//! where it is finally unwrapped. When [`or_else_throw`](crate::Maybe::or_else_throw)
//! raises it, the caller should see:
//!
//! - an error of the **same concrete type**, so matching on it still works,
//! - a backtrace and caller location taken **at the unwrap call**,
//! - the **original** failure reachable as its cause.
//!
//! This module provides the pieces for that: the [`Raise`] trait that failure
//! types implement, and [`Provenance`], a slot a failure type embeds to hold its
//! cause, backtrace and unwrap site.
//!
//! # Implementing `Raise`
//!
//! The usual shape is a `Clone` error with a `Provenance` field. Cloning a
//! `Provenance` never copies its contents, so `self.clone()` is exactly the
//! "same fields, fresh diagnostics" duplicate the rewrap needs.
//!
//! ```
//! use std::error::Error;
//! use std::fmt;
//! use undertow::{DuplicateError, Maybe, Provenance, Raise};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct FetchError {
//!     url: String,
//!     provenance: Provenance<FetchError>,
//! }
//!
//! impl fmt::Display for FetchError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "failed to fetch {}", self.url)
//!     }
//! }
//!
//! impl Error for FetchError {
//!     fn source(&self) -> Option<&(dyn Error + 'static)> {
//!         self.provenance.source()
//!     }
//! }
//!
//! impl Raise for FetchError {
//!     fn duplicate(&self) -> Result<Self, DuplicateError> {
//!         Ok(self.clone())
//!     }
//!
//!     fn provenance_mut(&mut self) -> Option<&mut Provenance<Self>> {
//!         Some(&mut self.provenance)
//!     }
//! }
//!
//! let original = FetchError { url: "https://example.com".into(), provenance: Provenance::new() };
//! let raised = Maybe::<(), _>::failure(original).or_else_throw().unwrap_err();
//!
//! assert_eq!(raised.url, "https://example.com");
//! assert!(raised.source().is_some());
//! assert!(raised.provenance.site().is_some());
//! ```

use std::any::type_name;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;

use crate::cancel::CancellationToken;

/// Failure types that can be raised by [`Maybe::or_else_throw`](crate::Maybe::or_else_throw).
///
/// Every method has a default, so `impl Raise for MyError {}` opts a type in
/// with no cancellation semantics and no rewrap support; unwrapping such a
/// failure logs a warning and returns the original value.
pub trait Raise: Sized {
    /// The token this failure reports on, if it is a cooperative-cancellation signal.
    fn cancellation(&self) -> Option<&CancellationToken> {
        None
    }

    /// Build a duplicate of the same type with the same fields.
    ///
    /// The duplicate's provenance must be empty; it is filled in by the rewrap.
    fn duplicate(&self) -> Result<Self, DuplicateError> {
        Err(DuplicateError::unsupported::<Self>())
    }

    /// The provenance slots of this failure, if it has any.
    fn provenance_mut(&mut self) -> Option<&mut Provenance<Self>> {
        None
    }
}

/// Why a failure could not be duplicated during rewrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateError {
    /// The type does not support duplication.
    Unsupported {
        /// Name of the failure type.
        type_name: &'static str,
    },
    /// The type's duplicate hook failed.
    Hook {
        /// Name of the failure type.
        type_name: &'static str,
        /// What went wrong.
        message: String,
    },
}

impl DuplicateError {
    /// The type `E` does not support duplication.
    pub fn unsupported<E>() -> Self {
        DuplicateError::Unsupported {
            type_name: type_name::<E>(),
        }
    }

    /// The duplicate hook of `E` failed with `message`.
    pub fn hook<E>(message: impl Into<String>) -> Self {
        DuplicateError::Hook {
            type_name: type_name::<E>(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DuplicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateError::Unsupported { type_name } => {
                write!(f, "{} cannot be duplicated", type_name)
            }
            DuplicateError::Hook { type_name, message } => {
                write!(f, "duplicating {} failed: {}", type_name, message)
            }
        }
    }
}

impl StdError for DuplicateError {}

/// Diagnostic slots a failure type carries next to its own fields.
///
/// Holds the cause, the backtrace and the caller location recorded when the
/// failure was raised by a rewrap. The slots are excluded from the failure's
/// identity:
///
/// - `clone()` returns empty slots, so cause chains and backtraces are never copied,
/// - all provenances compare equal and hash to nothing.
pub struct Provenance<E> {
    site: Option<&'static Location<'static>>,
    backtrace: Option<Backtrace>,
    cause: Option<Box<E>>,
}

impl<E> Provenance<E> {
    /// Empty provenance.
    pub fn new() -> Self {
        Provenance {
            site: None,
            backtrace: None,
            cause: None,
        }
    }

    /// Where the failure was raised, if it was raised by a rewrap.
    pub fn site(&self) -> Option<&'static Location<'static>> {
        self.site
    }

    /// The backtrace captured when the failure was raised.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }

    /// The original failure this one was raised from.
    pub fn cause(&self) -> Option<&E> {
        self.cause.as_deref()
    }

    /// Take the original failure out of the slot.
    pub fn take_cause(&mut self) -> Option<E> {
        self.cause.take().map(|cause| *cause)
    }

    /// The cause as an error source, for use in `Error::source`.
    pub fn source(&self) -> Option<&(dyn StdError + 'static)>
    where
        E: StdError + 'static,
    {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }

    pub(crate) fn record(
        &mut self,
        site: &'static Location<'static>,
        backtrace: Backtrace,
        cause: E,
    ) {
        self.site = Some(site);
        self.backtrace = Some(backtrace);
        self.cause = Some(Box::new(cause));
    }
}

impl<E> Default for Provenance<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Provenance<E> {
    fn clone(&self) -> Self {
        Provenance::new()
    }
}

impl<E> PartialEq for Provenance<E> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<E> Eq for Provenance<E> {}

impl<E> Hash for Provenance<E> {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

impl<E: fmt::Debug> fmt::Debug for Provenance<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provenance")
            .field("site", &self.site)
            .field("backtrace", &self.backtrace.as_ref().map(Backtrace::status))
            .field("cause", &self.cause)
            .finish()
    }
}

impl Raise for String {}

impl Raise for &'static str {}

impl Raise for std::io::Error {}

impl Raise for std::fmt::Error {}

impl Raise for Box<dyn StdError + Send + Sync + 'static> {}

/// Rebuild `failure` for raising at `site`.
///
/// Cancellation clears its token and comes back blank. Everything else is
/// duplicated and gets the current backtrace, `site`, and the original as its
/// cause. If duplication is not possible the original is returned as is.
pub(crate) fn rewrap<E: Raise>(failure: E, site: &'static Location<'static>) -> E {
    if let Some(token) = failure.cancellation() {
        token.clear();
        #[cfg(feature = "tracing")]
        tracing::debug!("Cleared cancellation of {} at {}", type_name::<E>(), site);
        return match failure.duplicate() {
            Ok(blank) => blank,
            Err(_) => failure,
        };
    }

    let mut copy = match failure.duplicate() {
        Ok(copy) => copy,
        Err(err) => {
            log_fallback(&err, site);
            return failure;
        }
    };

    if let Some(provenance) = copy.provenance_mut() {
        provenance.record(site, Backtrace::force_capture(), failure);
        return copy;
    }

    log_fallback(&DuplicateError::unsupported::<E>(), site);
    failure
}

fn log_fallback(err: &DuplicateError, site: &'static Location<'static>) {
    #[cfg(feature = "tracing")]
    tracing::warn!("Cannot rewrap failure at {}: {}", site, err);
    #[cfg(not(feature = "tracing"))]
    eprintln!("Cannot rewrap failure at {}: {}", site, err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Cancelled;
    use std::backtrace::BacktraceStatus;

    #[derive(Debug, Clone, PartialEq)]
    struct FetchError {
        url: String,
        provenance: Provenance<FetchError>,
    }

    impl FetchError {
        fn new(url: &str) -> Self {
            FetchError {
                url: url.to_string(),
                provenance: Provenance::new(),
            }
        }
    }

    impl fmt::Display for FetchError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "failed to fetch {}", self.url)
        }
    }

    impl StdError for FetchError {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.provenance.source()
        }
    }

    impl Raise for FetchError {
        fn duplicate(&self) -> Result<Self, DuplicateError> {
            Ok(self.clone())
        }

        fn provenance_mut(&mut self) -> Option<&mut Provenance<Self>> {
            Some(&mut self.provenance)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Broken;

    impl Raise for Broken {
        fn duplicate(&self) -> Result<Self, DuplicateError> {
            Err(DuplicateError::hook::<Self>("no"))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct NoSlots(u32);

    impl Raise for NoSlots {
        fn duplicate(&self) -> Result<Self, DuplicateError> {
            Ok(self.clone())
        }
    }

    #[test]
    fn test_rewrap_preserves_fields_and_links_cause() {
        let site = Location::caller();
        let raised = rewrap(FetchError::new("a"), site);

        assert_eq!(raised.url, "a");
        assert_eq!(raised.provenance.cause(), Some(&FetchError::new("a")));
        assert_eq!(raised.provenance.site(), Some(site));
        assert_eq!(
            raised.provenance.backtrace().map(Backtrace::status),
            Some(BacktraceStatus::Captured)
        );
        assert_eq!(
            raised.source().map(ToString::to_string),
            Some("failed to fetch a".to_string())
        );
    }

    #[test]
    fn test_rewrap_does_not_copy_nested_causes() {
        let site = Location::caller();
        let once = rewrap(FetchError::new("a"), site);
        let twice = rewrap(once, site);

        let cause = twice.provenance.cause().unwrap();
        assert!(cause.provenance.cause().is_some());
        assert!(cause.provenance.cause().unwrap().provenance.cause().is_none());
    }

    #[test]
    fn test_rewrap_unsupported_returns_original() {
        let raised = rewrap("plain".to_string(), Location::caller());
        assert_eq!(raised, "plain");
    }

    #[test]
    fn test_rewrap_hook_failure_returns_original() {
        assert_eq!(rewrap(Broken, Location::caller()), Broken);
    }

    #[test]
    fn test_rewrap_without_slots_returns_original() {
        assert_eq!(rewrap(NoSlots(3), Location::caller()), NoSlots(3));
    }

    #[test]
    fn test_rewrap_cancellation_is_bare_and_clears_token() {
        let token = CancellationToken::new();
        token.cancel();

        let raised = rewrap(Cancelled::new(token.clone()), Location::caller());

        assert!(!token.is_cancelled());
        assert!(raised.source().is_none());
        assert!(raised.provenance().site().is_none());
        assert!(raised.token().same_as(&token));
    }

    #[test]
    fn test_provenance_clone_is_empty() {
        let mut provenance = Provenance::new();
        provenance.record(Location::caller(), Backtrace::disabled(), 7u8);

        assert_eq!(provenance.cause(), Some(&7));
        let copy = provenance.clone();
        assert!(copy.cause().is_none());
        assert!(copy.site().is_none());
        assert!(copy.backtrace().is_none());
        assert_eq!(provenance.take_cause(), Some(7));
    }

    #[test]
    fn test_duplicate_error_display() {
        let message = DuplicateError::unsupported::<String>().to_string();
        assert!(message.contains("String"));
        assert!(message.ends_with("cannot be duplicated"));
        assert!(DuplicateError::hook::<Broken>("no")
            .to_string()
            .ends_with("failed: no"));
    }

    #[cfg(feature = "tracing")]
    mod tracing_tests {
        use super::*;
        use tracing_test::traced_test;

        #[traced_test]
        #[test]
        fn test_fallback_logs_warning() {
            let _ = rewrap(Broken, Location::caller());
            assert!(logs_contain("Cannot rewrap failure"));
        }
    }
}
