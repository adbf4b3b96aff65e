//! Protocol error types.

use thiserror::Error;

/// Errors that can occur during protocol parsing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("Invalid object type: {0}")]
    InvalidObjectType(u8),

    #[error("Invalid input action: {0}")]
    InvalidInputAction(u8),
}
