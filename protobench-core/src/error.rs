use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for protobench core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for protobench core operations
#[derive(Debug, Error)]
pub enum Error {
    /// The top-level payload does not have the shape the parser expects
    #[error("Payload error: {0}")]
    Payload(String),

    /// No parser is registered for the protocol tag
    #[error("Unknown protocol tag '{0}'")]
    UnknownProtocol(String),

    /// A timestamp could not be parsed as ISO-8601
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// A legacy source file could not be read or decoded
    #[error("Cannot read {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },
}
