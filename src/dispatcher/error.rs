// ABOUTME: Synchronous dispatcher API errors, distinct from the asynchronous results sent to sinks
// ABOUTME: Only argument checks and a stopped loop fail a call; everything later goes to the sent sink

use thiserror::Error;

/// Errors returned directly by dispatcher calls
///
/// Anything that goes wrong after a send is accepted is reported through
/// its sent sink as an [`SmsResult`](crate::datatypes::SmsResult) instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Empty destination, empty body or empty part list
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The dispatcher loop is no longer running
    #[error("Dispatcher has shut down")]
    Shutdown,
}

/// Result type alias for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;
