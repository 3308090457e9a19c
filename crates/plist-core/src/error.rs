//! Error types for property list tree and parse operations.

use thiserror::Error;

/// Errors returned by tree operations and the text parser.
///
/// This is a closed set: every fallible operation in the crate reports one of
/// these values, nothing panics, and nothing is retried internally. Parse
/// errors are sticky on the parser side (see [`crate::Parser`]).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlistError {
    /// A released node id, or an argument that cannot be used at all.
    #[error("invalid argument")]
    InvalidArgument,

    /// The scan buffer could not grow.
    #[error("out of memory")]
    OutOfMemory,

    /// The operation does not apply to this node kind.
    #[error("wrong node kind for operation")]
    InvalidKind,

    /// The value already has a parent and cannot be attached again.
    #[error("node is already attached")]
    AlreadyAttached,

    /// An array index outside the valid bounds.
    #[error("index out of range")]
    OutOfRange,

    /// A missing dictionary entry, or a parse result taken before completion.
    #[error("not found")]
    NotFound,

    /// Malformed property list text: bad grammar, an unterminated token,
    /// a number that does not convert, or a duplicate dictionary key.
    #[error("invalid property list text")]
    Invalid,
}

/// Convenience alias used throughout plist-core.
pub type Result<T> = std::result::Result<T, PlistError>;
