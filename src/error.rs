//! Error type shared by the directory, session and decoder.
//!
//! Native calls report a bare status integer; which variant it surfaces as is
//! decided by the call that produced it, never by the code itself.

use crate::device::DeviceSelector;
use crate::ffi::SenselStatus;
use crate::session::SessionState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Enumeration failed, the SDK could not be loaded, or a call on an open
    /// handle reported failure.
    #[error("sensor hardware unavailable: {call} returned status {status}")]
    HardwareUnavailable {
        call: &'static str,
        status: SenselStatus,
    },

    #[error("failed to open device {device}: status {status}")]
    DeviceOpenFailed {
        device: DeviceSelector,
        status: SenselStatus,
    },

    #[error("{operation} is not valid while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("no frame available")]
    NoFrameAvailable,

    #[error("corrupt frame: {0}")]
    CorruptFrame(String),
}

impl Error {
    pub(crate) fn hardware(call: &'static str, status: SenselStatus) -> Self {
        Error::HardwareUnavailable { call, status }
    }

    pub(crate) fn corrupt<S: Into<String>>(reason: S) -> Self {
        Error::CorruptFrame(reason.into())
    }

    /// Whether a polling loop can simply try again on the next read.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NoFrameAvailable)
    }
}

/// Map a native status to `Ok(())` or the error built by `on_failure`.
pub(crate) fn check<F>(status: SenselStatus, on_failure: F) -> Result<()>
where
    F: FnOnce(SenselStatus) -> Error,
{
    if status == crate::ffi::SENSEL_OK {
        Ok(())
    } else {
        Err(on_failure(status))
    }
}
