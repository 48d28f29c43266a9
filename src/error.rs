use thiserror::Error;

/// Failure codes surfaced across the IPC boundary.
///
/// Remote callers only ever see the numeric code; diagnostic detail stays
/// in local logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    /// A caller-supplied argument was null or invalid.
    #[error("bad argument")]
    BadArgument,

    /// The operation is not legal in the current state.
    #[error("invalid state")]
    InvalidState,

    /// An allocation or construction failed.
    #[error("out of memory")]
    NoMemory,

    /// Client-side private state is missing.
    #[error("no resources")]
    NoResources,

    /// No provider is bound to the client.
    #[error("not attached")]
    NotAttached,

    /// Generic failure reported by a collaborator.
    #[error("operation failed")]
    Failed,
}

pub type DriverResult<T = ()> = Result<T, DriverError>;

/// Numeric code for a successful operation.
pub const STATUS_SUCCESS: u32 = 0;

impl DriverError {
    /// Stable numeric code for this error.
    pub fn status_code(self) -> u32 {
        match self {
            DriverError::BadArgument => 1,
            DriverError::InvalidState => 2,
            DriverError::NoMemory => 3,
            DriverError::NoResources => 4,
            DriverError::NotAttached => 5,
            DriverError::Failed => 6,
        }
    }
}

/// Collapses an operation result into the wire status code.
pub fn status_code(result: &DriverResult) -> u32 {
    match result {
        Ok(()) => STATUS_SUCCESS,
        Err(err) => err.status_code(),
    }
}
