use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("acquisition of '{resource}' was abandoned before it was granted")]
    Abandoned { resource: String },

    #[error("semaphore requires at least one permit")]
    ZeroPermits,

    #[error("semaphore permit count {0} exceeds the supported maximum")]
    TooManyPermits(usize),
}
