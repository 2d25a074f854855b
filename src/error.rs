//! Error type returned by permit operations.

use std::io;

use thiserror::Error;

/// Errors produced by permit operations.
///
/// Two error cases named in the originating C API — a "busy" re-init error
/// and a hook-type range error — have no variant here. Both are caught by
/// the type system instead: constructing a permit always yields a fresh,
/// live object, and hook slots are selected by an enum with exactly the
/// valid set of members, so neither invalid state is representable.
#[derive(Debug, Error)]
pub enum PermitError {
    /// The permit has already been closed (its magic tag is dead).
    #[error("permit is no longer live")]
    Invalid,

    /// A deadline passed before the wait could be satisfied.
    #[error("wait timed out")]
    Timeout,

    /// A select session table was full (all `MAX_SELECTS` slots in use).
    #[error("no free select session slot")]
    NoMem,

    /// An association's underlying OS call failed.
    #[error("association I/O error: {0}")]
    Passthrough(#[from] io::Error),
}

pub type PermitResult<T> = Result<T, PermitError>;
