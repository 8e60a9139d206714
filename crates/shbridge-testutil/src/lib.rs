//! Test utilities for shbridge.
//!
//! - [`Capture`]: a cloneable in-memory sink to hand to a Context as stdout
//!   or stderr, readable after the run
//! - [`FIXTURES`] / [`load_fixture`]: small Bash programs used across tests
//! - [`BASH`] / [`NO_ARGS`]: shared constants

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

/// Interpreter the integration tests run against.
pub const BASH: &str = "/bin/bash";

/// An empty argument list with a concrete element type.
pub const NO_ARGS: &[&str] = &[];

/// Named test scripts.
pub const FIXTURES: &[(&str, &str)] = &[
    ("hello.sh", r#"main() { echo "hello"; }"#),
    ("cat.sh", "main() { cat; }"),
    ("printf.sh", r#"main() { printf "arg: <%s>" "$@"; }"#),
    ("foobar.sh", "main() { echo $FOOBAR; }"),
    ("exact.sh", r#"main() { printf '%s' "$FOOBAR"; }"#),
    ("status.sh", "main() { return \"$1\"; }"),
    ("selfkill.sh", "main() { kill -TERM $$; }"),
    ("source-path.sh", r#"main() { printf '%s' "${BASH_SOURCE[0]}"; }"#),
    // `wait` returns as soon as a trapped signal arrives; a foreground
    // `sleep` would hold the trap back until it finished.
    (
        "trap.sh",
        r#"main() {
    trap 'kill "$pid" 2>/dev/null; echo got; exit 7' USR1
    sleep 30 >/dev/null 2>&1 &
    pid=$!
    echo ready
    wait "$pid"
}"#,
    ),
];

/// Look up a fixture by name.
pub fn fixture(name: &str) -> Option<&'static str> {
    FIXTURES
        .iter()
        .find(|(fixture, _)| *fixture == name)
        .map(|(_, body)| *body)
}

/// Script loader over [`FIXTURES`].
pub fn load_fixture(name: &str) -> io::Result<Vec<u8>> {
    fixture(name)
        .map(|body| body.as_bytes().to_vec())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no fixture {name}")))
}

/// An in-memory output sink.
///
/// Clones share the same buffer, so keep one clone and give the other to the
/// code under test.
#[derive(Clone, Default)]
pub struct Capture {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().map(|buf| buf.clone()).unwrap_or_default()
    }

    /// Everything written so far, as (lossy) UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl AsyncWrite for Capture {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            Err(_) => Poll::Ready(Err(io::Error::other("capture buffer poisoned"))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
