use thiserror::Error;

/// The only failure a detection run surfaces to its caller.
///
/// Everything else a probe can hit is absorbed into an `undetermined` field, so
/// callers can tell "no data" apart from "ran out of time".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectError {
    #[error("detection was cancelled")]
    Cancelled,

    #[error("detection deadline exceeded")]
    DeadlineExceeded,
}
