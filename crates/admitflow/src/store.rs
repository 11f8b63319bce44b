/// Error enumeration shared by the storage ports.
///
/// `Conflict` signals that a conditional commit lost its race and the caller
/// should re-read and retry; `Unavailable` covers transient backend failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conditional write lost a concurrent race")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
