/// A read or write against the backing store failed.
///
/// Store failures abort the current cycle; the next scheduled cycle retries
/// from the last advanced watermark.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A dispatch cycle failed and made no further progress.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A configured window does not fit in the calendar around `now`.
    #[error("Invalid dispatch window: {0}")]
    Window(#[from] slotline_core::error::CoreError),
}
