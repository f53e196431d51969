//! Error types for permessage-deflate negotiation.
//!
//! Parsing a `Sec-WebSocket-Extensions` value is permissive: missing or
//! unknown extensions and parameters never fail. The only hard error is a
//! `max_window_bits` value outside the range RFC 7692 allows.

use thiserror::Error;

/// Result type alias for negotiation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or parsing deflate options.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A max window bits value outside `8..=15`, or not an integer at all.
    #[error("{param} must have a value between 8 and 15, got {value:?}")]
    InvalidWindowBits {
        /// Parameter the value was supplied for.
        param: &'static str,
        /// Offending value as supplied.
        value: String,
    },
}

impl Error {
    pub(crate) fn invalid_window_bits(param: &'static str, value: impl ToString) -> Self {
        Error::InvalidWindowBits {
            param,
            value: value.to_string(),
        }
    }
}
