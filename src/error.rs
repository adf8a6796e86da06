//! Error codes shared by every error type in the crate.
//!
//! Each failure path has a grepable `E_*` code that shows up in log events
//! and in the CLI's error output, plus a flag saying whether the same request
//! could succeed if repeated.

/// Trait for errors that carry a grepable code and a retryable flag.
pub trait ErrorCode {
    /// Stable, grepable code such as `"E_LOAD_FAILED"`.
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same operation might succeed.
    fn retryable(&self) -> bool {
        false
    }
}
