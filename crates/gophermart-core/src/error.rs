use thiserror::Error;

/// Errors surfaced by a `Repository` implementation.
#[derive(Error, Debug, Clone)]
pub enum RepoError {
    #[error("not found")]
    NotFound,

    #[error("order number already registered")]
    Conflict,

    #[error("database error: {0}")]
    Database(String),
}

/// Errors from the accrual HTTP client.
#[derive(Error, Debug)]
pub enum AccrualError {
    #[error("accrual service unreachable: {0}")]
    Connection(String),

    #[error("accrual service returned an unparseable body: {0}")]
    Decode(String),
}

/// Categorised outcomes of driving one order through the Order Processor.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("order already claimed by another processor")]
    AlreadyClaimed,

    #[error("accrual service unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("order not registered in accrual system")]
    NotRegistered,

    #[error("accrual service declared order invalid")]
    DeclaredInvalid,

    #[error("exceeded {0} accrual polling attempts")]
    AttemptsExceeded(u32),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("processing cancelled")]
    Cancelled,
}
