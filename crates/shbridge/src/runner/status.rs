//! Exit-status translation.

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use crate::error::BridgeError;

/// How the child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// Exited on its own with a status code.
    Exited(i32),
    /// Killed by a signal. `raw` is the platform wait status.
    Signaled { signal: Option<i32>, raw: i32 },
}

impl From<ExitStatus> for WaitResult {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => WaitResult::Exited(code),
            None => WaitResult::Signaled {
                signal: status.signal(),
                raw: status.into_raw(),
            },
        }
    }
}

impl WaitResult {
    /// Map onto what [`Context::run`](crate::Context::run) returns: any exit
    /// code is a status, a signal death is a non-fatal error carrying the raw
    /// wait status.
    pub fn into_status(self) -> Result<i32, BridgeError> {
        match self {
            WaitResult::Exited(code) => Ok(code),
            WaitResult::Signaled { signal, raw } => Err(BridgeError::Terminated {
                signal,
                status: raw,
            }),
        }
    }
}
