//! Utility macros shared by the codec and protocol modules.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking,
/// which keeps bound checks on untrusted input on the error path.
///
/// # Example
///
/// ```ignore
/// ensure!(headers.len() < max_headers, ParseError::too_many_headers(max_headers));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
