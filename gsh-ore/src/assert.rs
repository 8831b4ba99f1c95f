//! Utilities for `assert!`s.

/// Asserts that the provided expression, that returns a `Result`, is `Err` and that the error
/// matches the provided pattern.
#[macro_export]
macro_rules! assert_err {
    ($val:expr, $pat:pat) => {{
        match $val {
            Err($pat) => (),
            Err(other) => panic!(
                "assertion failed: expected Err({}) found Err({other:?})",
                stringify!($pat)
            ),
            Ok(ok) => panic!(
                "assertion failed: expected Err({}) found Ok({ok:?})",
                stringify!($pat)
            ),
        }
    }};
}
