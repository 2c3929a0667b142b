use crate::status::StatusCode;

/// Errors reported by a native CAN driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// A native call returned a non-OK status.
    #[error("{op} failed: {code}")]
    Status { op: &'static str, code: StatusCode },

    /// A parameter value had the wrong size for the parameter.
    #[error("parameter {param} expects {expected} bytes, got {actual}")]
    ValueLength {
        param: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl DriverError {
    /// Build a status error for the named native operation.
    pub fn status(op: &'static str, code: StatusCode) -> Self {
        Self::Status { op, code }
    }

    /// The native status code, if this error carries one.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::ValueLength { .. } => None,
        }
    }

    /// True when the error is the receive-queue-empty sentinel.
    ///
    /// This is how a read reports that nothing is pending; it is not a fault.
    pub fn is_queue_empty(&self) -> bool {
        self.code() == Some(StatusCode::QRCVEMPTY)
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
