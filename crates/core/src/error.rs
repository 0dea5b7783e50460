/// Domain errors raised while decoding stored values or checking transitions.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A stored or configured value does not decode.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A transition's guard does not hold for the entry's current state.
    #[error("Conflict: {0}")]
    Conflict(String),
}
