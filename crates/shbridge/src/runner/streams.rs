//! Stdio wiring between the Context and the child.
//!
//! `Inherit` and `File` hand the child a real descriptor; `Reader`/`Writer`
//! give it a pipe that the runner pumps while the child is alive.

use std::fmt;
use std::fs::File;
use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::ChildStdin;

/// Where Bash reads stdin from.
#[derive(Default)]
pub enum Input {
    /// The host's own stdin.
    #[default]
    Inherit,
    /// `/dev/null`.
    Null,
    /// A file or socket; duplicated for every run.
    File(File),
    /// Any async reader, copied into a pipe.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

/// Where Bash writes stdout or stderr to.
#[derive(Default)]
pub enum Output {
    /// The host's own stream.
    #[default]
    Inherit,
    /// `/dev/null`.
    Null,
    /// A file or socket; duplicated for every run.
    File(File),
    /// Any async writer, fed from a pipe.
    Writer(Box<dyn AsyncWrite + Send + Unpin>),
}

impl Input {
    /// Wrap an async reader.
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Input::Reader(Box::new(reader))
    }

    /// Bytes to feed as stdin.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Input::reader(io::Cursor::new(data.into()))
    }

    pub(crate) fn stdio(&self) -> io::Result<Stdio> {
        Ok(match self {
            Input::Inherit => Stdio::inherit(),
            Input::Null => Stdio::null(),
            Input::File(file) => Stdio::from(file.try_clone()?),
            Input::Reader(_) => Stdio::piped(),
        })
    }
}

impl Output {
    /// Wrap an async writer.
    pub fn writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Output::Writer(Box::new(writer))
    }

    pub(crate) fn stdio(&self) -> io::Result<Stdio> {
        Ok(match self {
            Output::Inherit => Stdio::inherit(),
            Output::Null => Stdio::null(),
            Output::File(file) => Stdio::from(file.try_clone()?),
            Output::Writer(_) => Stdio::piped(),
        })
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Inherit => f.write_str("Inherit"),
            Input::Null => f.write_str("Null"),
            Input::File(file) => f.debug_tuple("File").field(file).finish(),
            Input::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Inherit => f.write_str("Inherit"),
            Output::Null => f.write_str("Null"),
            Output::File(file) => f.debug_tuple("File").field(file).finish(),
            Output::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// Copy the configured reader into the child's stdin, then close it.
///
/// A child that exits without draining its stdin is not an error.
pub(crate) async fn feed(input: &mut Input, pipe: Option<ChildStdin>) {
    let (Input::Reader(reader), Some(mut pipe)) = (input, pipe) else {
        return;
    };
    match tokio::io::copy(reader, &mut pipe).await {
        Ok(bytes) => tracing::trace!(bytes, "stdin fed"),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("child closed stdin early");
        }
        Err(e) => tracing::warn!("failed to feed stdin: {}", e),
    }
    if let Err(e) = pipe.shutdown().await {
        tracing::debug!("closing stdin: {}", e);
    }
}

/// Drain one child output pipe into the configured writer.
pub(crate) async fn drain<R>(output: &mut Output, pipe: Option<R>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let (Output::Writer(writer), Some(mut pipe)) = (output, pipe) else {
        return Ok(());
    };
    tokio::io::copy(&mut pipe, writer).await?;
    writer.flush().await
}
