use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A fragment box is too short for a field its version/flags declare.
    ///
    /// The coordinator reports these as warn log records and skips the
    /// affected track fragment; they are never returned to callers.
    #[error("{box_type} box truncated reading {field}: need {needed} bytes, have {available}")]
    TruncatedBox {
        box_type: &'static str,
        field: &'static str,
        needed: usize,
        available: usize,
    },
}
