//! Errors produced while building the environment and supervising Bash.
//!
//! | Variant | When | Fatal |
//! |---------|------|-------|
//! | [`Load`](BridgeError::Load) | a script loader failed | yes |
//! | [`Artifact`](BridgeError::Artifact) | the env artifact could not be written | yes |
//! | [`SelfPath`](BridgeError::SelfPath) | the host executable could not be located | yes |
//! | [`Stream`](BridgeError::Stream) | a configured stdio stream could not be attached | yes |
//! | [`Runtime`](BridgeError::Runtime) | the private async runtime failed to start | yes |
//! | [`Launch`](BridgeError::Launch) | the interpreter could not be spawned | yes |
//! | [`Wait`](BridgeError::Wait) | waiting on the child failed | yes |
//! | [`Terminated`](BridgeError::Terminated) | the child was killed by a signal | no |
//!
//! Ordinary non-zero exits are not errors: [`Context::run`](crate::Context::run)
//! returns them as `Ok(code)`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between registering a script and reaping the child.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A script loader could not produce the named script.
    #[error("failed to load script {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Creating or writing the temporary env artifact failed.
    #[error("failed to write env artifact: {0}")]
    Artifact(#[source] io::Error),

    /// The path of the running executable could not be determined.
    #[error("failed to resolve own executable path: {0}")]
    SelfPath(#[source] io::Error),

    /// A configured stdin/stdout/stderr could not be attached to the child.
    #[error("failed to attach stdio stream: {0}")]
    Stream(#[source] io::Error),

    /// The per-run async runtime could not be built.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The interpreter process could not be started.
    #[error("failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The child was started but waiting on it failed.
    #[error("failed to wait for interpreter: {0}")]
    Wait(#[source] io::Error),

    /// The child did not exit on its own; it was terminated by a signal.
    ///
    /// `status` is the raw wait status reported by the platform.
    #[error("interpreter terminated by signal {}", signal.map_or_else(|| "?".to_string(), |s| s.to_string()))]
    Terminated { signal: Option<i32>, status: i32 },
}

impl BridgeError {
    /// Whether the error is a defect rather than a child that simply stopped running.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BridgeError::Terminated { .. })
    }

    /// The status a host should exit with for a non-fatal error.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            BridgeError::Terminated { status, .. } => Some(*status),
            _ => None,
        }
    }
}
