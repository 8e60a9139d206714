//! Running Bash against a Context.
//!
//! Each [`Context::run`] call:
//!
//! 1. takes the Context lock for its whole duration
//! 2. writes a fresh env artifact (removed afterwards unless debugging)
//! 3. starts `bash -c '<entrypoint> <quoted args>'` with only `BASH_ENV` set
//! 4. relays host signals to the child and pumps any piped stdio
//! 5. translates the child's exit into a status
//!
//! The call blocks. Internally it drives a private current-thread tokio
//! runtime: one task owns the child and forwards signals while waiting on
//! it, and hands the wait result back over a oneshot channel. Dropping the
//! runtime at the end of the run tears down every listener, on error paths too.

pub mod signals;
pub mod status;
mod streams;

use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;
use std::process::ExitStatus;

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::artifact::{ENV_HOOK, EnvArtifact, SELF_EXECUTABLE_VAR};
use crate::context::{Context, State};
use crate::error::BridgeError;
use crate::quote;

pub use status::WaitResult;
pub use streams::{Input, Output};

/// Command prefix that sources the artifact at `path` if Bash skipped `BASH_ENV`.
///
/// Bash ignores `BASH_ENV` when its stdin is a socket (it assumes it was
/// started by sshd and reads `.bashrc` instead). `SELF_EXECUTABLE` is only
/// set once the artifact has been sourced, since the child starts with an
/// otherwise empty environment. `BASH_ENV` itself is no marker: the host may
/// export its own value for nested shells.
fn source_fallback(path: &Path) -> OsString {
    let mut line = OsString::from(format!("[ -n \"${{{SELF_EXECUTABLE_VAR}+x}}\" ] || . "));
    line.push(OsString::from_vec(quote::single(path.as_os_str().as_bytes())));
    line.push("; ");
    line
}

impl Context {
    /// Run `entrypoint` with `args` in Bash and wait for it.
    ///
    /// Returns the child's exit code, zero or not. A child killed by a signal
    /// yields [`BridgeError::Terminated`]; every other error happens before
    /// or instead of a child running and is fatal.
    ///
    /// Blocks the calling thread. Called from inside a tokio runtime, the
    /// child is driven from a scoped helper thread, but the caller's worker
    /// stays blocked until it finishes; prefer `tokio::task::spawn_blocking`.
    pub fn run<S: AsRef<OsStr>>(&self, entrypoint: &str, args: &[S]) -> Result<i32, BridgeError> {
        let mut state = self.lock();

        let artifact = EnvArtifact::create(&self.config().invocation, self.self_path(), &state)?;

        let mut script = source_fallback(artifact.path());
        script.push(quote::command_line(entrypoint, args));

        let state: &mut State = &mut state;
        let interpreter = &self.config().interpreter;
        let artifact_path = artifact.path();
        let mut drive = move || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(BridgeError::Runtime)
                .and_then(|runtime| {
                    runtime.block_on(supervise(interpreter, artifact_path, &script, state))
                })
        };

        // A thread already inside a runtime may not block on another one, so
        // the run gets a thread of its own there.
        let result = if tokio::runtime::Handle::try_current().is_ok() {
            std::thread::scope(|scope| scope.spawn(drive).join()).unwrap_or_else(|_| {
                Err(BridgeError::Runtime(io::Error::other("run thread panicked")))
            })
        } else {
            drive()
        };

        if self.config().debug {
            match artifact.keep() {
                Ok(path) => tracing::info!(path = %path.display(), "kept env artifact"),
                Err(e) => tracing::warn!("failed to keep env artifact: {}", e),
            }
        }

        let outcome = result?;
        tracing::debug!(entrypoint, ?outcome, "interpreter finished");
        outcome.into_status()
    }
}

/// Spawn the interpreter and see it through to exit.
async fn supervise(
    interpreter: &Path,
    artifact: &Path,
    script: &OsStr,
    state: &mut State,
) -> Result<WaitResult, BridgeError> {
    let mut cmd = Command::new(interpreter);
    cmd.arg("-c")
        .arg(script)
        .env_clear()
        .env(ENV_HOOK, artifact)
        .stdin(state.stdin.stdio().map_err(BridgeError::Stream)?)
        .stdout(state.stdout.stdio().map_err(BridgeError::Stream)?)
        .stderr(state.stderr.stdio().map_err(BridgeError::Stream)?);

    // Listen before spawning so nothing sent in between is lost.
    let signals = signals::arm();

    let mut child = cmd.spawn().map_err(|source| BridgeError::Launch {
        program: interpreter.to_path_buf(),
        source,
    })?;
    tracing::debug!(pid = child.id(), interpreter = %interpreter.display(), "spawned interpreter");

    // Taken out so the child itself can move to the relay task.
    let stdin_pipe = child.stdin.take();
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(relay(child, signals, done_tx));

    let State {
        stdin,
        stdout,
        stderr,
        ..
    } = state;

    let finished = async {
        let (status, out, err) = tokio::join!(
            done_rx,
            streams::drain(stdout, stdout_pipe),
            streams::drain(stderr, stderr_pipe),
        );
        if let Err(e) = out {
            tracing::warn!("failed to copy stdout: {}", e);
        }
        if let Err(e) = err {
            tracing::warn!("failed to copy stderr: {}", e);
        }
        status
    };
    tokio::pin!(finished);

    let feeding = streams::feed(stdin, stdin_pipe);
    tokio::pin!(feeding);
    let mut fed = false;

    // Stdin is fed only while the child lives; a reader that never ends
    // must not keep the run open.
    let status = loop {
        tokio::select! {
            status = &mut finished => break status,
            () = &mut feeding, if !fed => fed = true,
        }
    };

    match status {
        Ok(Ok(status)) => Ok(WaitResult::from(status)),
        Ok(Err(e)) => {
            tracing::error!("waiting for interpreter failed: {}", e);
            Err(BridgeError::Wait(e))
        }
        Err(_) => Err(BridgeError::Wait(io::Error::other("supervisor task vanished"))),
    }
}

/// Own the child: forward signals until it exits, then report the exit.
async fn relay(
    mut child: Child,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    done: oneshot::Sender<io::Result<ExitStatus>>,
) {
    let pid = child
        .id()
        .and_then(|id| i32::try_from(id).ok())
        .map(Pid::from_raw);

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(sig) = signals.recv() => {
                if let Some(pid) = pid {
                    signals::forward(pid, sig);
                }
            }
        }
    };
    // The receiver only goes away if the run itself was torn down.
    let _ = done.send(status);
}
