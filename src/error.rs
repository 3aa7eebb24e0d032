//! Error types for the flash driver

use core::fmt;

/// Error type for flash controller operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlcError {
    /// The controller reported an operation already in progress
    ControllerBusy,
    /// A stale interrupt/status indication refused to clear
    InterruptClearFailed,
    /// The hardware flagged an access violation during the operation
    AccessViolation,
    /// The source buffer is not 32-bit aligned
    UnalignedBuffer,
    /// The device configuration is inconsistent
    InvalidConfig { reason: &'static str },
    /// The supplied register buses do not match the configured banks
    BankMismatch,
}

impl fmt::Display for FlcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControllerBusy => write!(f, "flash controller is busy"),
            Self::InterruptClearFailed => {
                write!(f, "stale interrupt status refused to clear")
            }
            Self::AccessViolation => write!(f, "hardware flagged an access violation"),
            Self::UnalignedBuffer => write!(f, "source buffer is not 32-bit aligned"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid device configuration: {}", reason)
            }
            Self::BankMismatch => {
                write!(f, "register buses do not match the configured banks")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FlcError {}
