//! Signal relay from the host to the Bash child.
//!
//! While a run is in flight the host listens for every signal it can be
//! delivered and forwards each one to the child, so Ctrl-C, SIGTERM from a
//! supervisor, SIGWINCH and friends reach the script as if it were running
//! on its own.
//!
//! Not relayed:
//! - `SIGCHLD` is received but dropped; it only reports on our own child.
//! - `SIGURG` is never listened for; it is runtime/socket bookkeeping.
//! - `SIGKILL`/`SIGSTOP` cannot be caught, and the synchronous fault
//!   signals (`SIGSEGV`, `SIGBUS`, ...) belong to the host itself.
//!
//! The listeners live on the run's private runtime and disappear with it.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

/// Signals that are never listened for.
const NEVER_RELAYED: &[Signal] = &[
    Signal::SIGKILL,
    Signal::SIGSTOP,
    Signal::SIGILL,
    Signal::SIGFPE,
    Signal::SIGSEGV,
    Signal::SIGBUS,
    Signal::SIGTRAP,
    Signal::SIGSYS,
    Signal::SIGURG,
];

/// Signals the relay listens for.
pub fn relayed_signals() -> impl Iterator<Item = Signal> {
    Signal::iterator().filter(|sig| !NEVER_RELAYED.contains(sig))
}

/// Whether a received signal should be passed on to the child.
pub fn should_forward(sig: Signal) -> bool {
    sig != Signal::SIGCHLD
}

/// Start listening for every relayed signal.
///
/// Must be called from inside a tokio runtime. Each signal gets its own
/// listener task; all of them feed the returned channel.
pub(crate) fn arm() -> mpsc::UnboundedReceiver<Signal> {
    let (tx, rx) = mpsc::unbounded_channel();
    for sig in relayed_signals() {
        let mut stream = match signal(SignalKind::from_raw(sig as i32)) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!("cannot listen for {}: {}", sig, e);
                continue;
            }
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                if tx.send(sig).is_err() {
                    break;
                }
            }
        });
    }
    rx
}

/// Forward `sig` to the child, unless it is one we only observe.
pub(crate) fn forward(pid: Pid, sig: Signal) {
    if !should_forward(sig) {
        return;
    }
    match signal::kill(pid, sig) {
        Ok(()) => tracing::debug!(pid = pid.as_raw(), "relayed {}", sig),
        // Raced with the child exiting.
        Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid = pid.as_raw(), "failed to relay {}: {}", sig, e),
    }
}
