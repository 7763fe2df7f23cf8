//! Testing utilities for code that produces `Maybe`
//!
//! Assertion macros for checking which variant a [`Maybe`](crate::Maybe)
//! holds, and, behind the `proptest` feature, an `Arbitrary` implementation
//! for property-based tests.
//!
//! # Examples
//!
//! ```rust
//! use undertow::{Maybe, assert_present, assert_failed, assert_failed_with};
//!
//! let value = assert_present!(Maybe::<_, String>::success(42));
//! assert_eq!(value, 42);
//!
//! assert_failed!(Maybe::<i32, _>::failure("timeout".to_string()));
//! assert_failed_with!(Maybe::<i32, _>::failure("timeout".to_string()), "timeout".to_string());
//! ```

/// Assert that a `Maybe` is a success and evaluate to its value.
///
/// This macro will panic if the `Maybe` is a `Failure`.
#[macro_export]
macro_rules! assert_present {
    ($maybe:expr) => {
        match $maybe {
            $crate::Maybe::Success(value) => value,
            $crate::Maybe::Failure(e) => {
                panic!("Expected Success, got Failure: {:?}", e);
            }
        }
    };
}

/// Assert that a `Maybe` is a failure and evaluate to the failure.
///
/// This macro will panic if the `Maybe` is a `Success`.
#[macro_export]
macro_rules! assert_failed {
    ($maybe:expr) => {
        match $maybe {
            $crate::Maybe::Failure(e) => e,
            $crate::Maybe::Success(v) => {
                panic!("Expected Failure, got Success: {:?}", v);
            }
        }
    };
}

/// Assert that a `Maybe` fails with a specific failure.
///
/// This macro will panic if the `Maybe` is a `Success` or if the failure
/// doesn't equal the expected one.
#[macro_export]
macro_rules! assert_failed_with {
    ($maybe:expr, $expected:expr) => {
        match $maybe {
            $crate::Maybe::Failure(e) => {
                assert_eq!(e, $expected);
            }
            $crate::Maybe::Success(v) => {
                panic!(
                    "Expected Failure with {:?}, got Success: {:?}",
                    $expected, v
                );
            }
        }
    };
}

#[cfg(feature = "proptest")]
use crate::Maybe;
#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<T, E> Arbitrary for Maybe<T, E>
where
    T: Arbitrary + 'static,
    E: Arbitrary + 'static,
    T::Strategy: 'static,
    E::Strategy: 'static,
{
    type Parameters = (T::Parameters, E::Parameters);
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let (t_params, e_params) = args;
        prop_oneof![
            any_with::<T>(t_params).prop_map(Maybe::Success),
            any_with::<E>(e_params).prop_map(Maybe::Failure),
        ]
        .boxed()
    }
}
