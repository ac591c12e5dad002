use thiserror::Error;

/// Failures raised by the snapshot and candle clients.
///
/// All of these are transient from the pipeline's point of view: callers log
/// them, keep the previous model state, and rely on the next scheduled cycle
/// to retry. Expected absences (pair not listed, insufficient history) are
/// not errors and never reach this type.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response status: {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response payload: {0}")]
    Payload(String),
}
