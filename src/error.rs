use failure_derive::Fail;

/// Every error the core surfaces.
///
/// Verification failures (a wrong path, a tampered seal) are *not*
/// represented here — those are `(bool, reason)` return values, never
/// an `Err`.
#[derive(Debug, Fail)]
pub enum SighaError {
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(String),

    #[fail(display = "weak parameters: {}", _0)]
    WeakParameters(String),

    #[fail(display = "agent id not registered")]
    NotRegistered,

    #[fail(display = "degenerate state after update: {}", _0)]
    DegenerateState(String),

    #[fail(display = "accumulator is sealed and cannot be mutated")]
    Sealed,

    #[fail(display = "malformed serialized state: {}", _0)]
    Deserialization(String),

    #[fail(display = "io error: {}", _0)]
    Io(String),

    #[fail(display = "prime registry lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, SighaError>;

impl From<std::io::Error> for SighaError {
    fn from(e: std::io::Error) -> Self {
        SighaError::Io(e.to_string())
    }
}
