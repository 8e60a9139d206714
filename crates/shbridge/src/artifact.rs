//! The env artifact: a temporary file Bash sources through `BASH_ENV`.
//!
//! Sections, always in this order:
//!
//! ```text
//! unset BASH_ENV                         # nested bash must not re-source us
//! export SELF=$'<argv0>'
//! export SELF_EXECUTABLE=$'<self path>'
//! export NAME=$'<value>'                 # one per variable, in order
//! name() { ... }; export -f name         # inherited exported functions
//! cb() { "$SELF_EXECUTABLE" ::: cb "$@"; }   # one shim per callback
//! <script bodies>
//! ```

use std::ffi::OsStr;
use std::io::{self, BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::context::{Context, State, Variable};
use crate::dispatch::SENTINEL;
use crate::error::BridgeError;
use crate::quote;

/// Name of the variable Bash sources at startup.
pub const ENV_HOOK: &str = "BASH_ENV";

/// Exported argv[0] of the host.
pub const SELF_VAR: &str = "SELF";

/// Exported absolute path of the host executable.
pub const SELF_EXECUTABLE_VAR: &str = "SELF_EXECUTABLE";

/// Prefix of every artifact file name.
pub const ARTIFACT_PREFIX: &str = "bashenv.";

/// Write the artifact for `state` to `out`.
pub(crate) fn render<W: Write>(
    invocation: &OsStr,
    self_path: &Path,
    state: &State,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "unset {ENV_HOOK}")?;
    write_export(out, SELF_VAR, invocation.as_bytes())?;
    write_export(out, SELF_EXECUTABLE_VAR, self_path.as_os_str().as_bytes())?;

    for var in &state.vars {
        match var {
            Variable::Plain { name, value } => {
                match name.to_str().filter(|n| quote::is_variable_name(n)) {
                    Some(name) => write_export(out, name, value.as_bytes())?,
                    None => tracing::warn!(name = ?name, "skipping variable with unusable name"),
                }
            }
            Variable::Function { name, body } => {
                if !quote::is_function_name(name) {
                    tracing::warn!(name = %name, "skipping exported function with unusable name");
                    continue;
                }
                out.write_all(name.as_bytes())?;
                out.write_all(body.as_bytes())?;
                writeln!(out)?;
                writeln!(out, "export -f {name}")?;
            }
        }
    }

    for name in state.funcs.keys() {
        if !quote::is_function_name(name) {
            tracing::warn!(callback = %name, "skipping callback with unusable name");
            continue;
        }
        writeln!(
            out,
            "{name}() {{ \"${SELF_EXECUTABLE_VAR}\" {SENTINEL} {name} \"$@\"; }}"
        )?;
    }

    for body in &state.scripts {
        out.write_all(body)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_export<W: Write>(out: &mut W, name: &str, value: &[u8]) -> io::Result<()> {
    write!(out, "export {name}=")?;
    out.write_all(&quote::ansi_c(value))?;
    writeln!(out)
}

/// A rendered artifact on disk. Deleted on drop unless [kept](EnvArtifact::keep).
#[derive(Debug)]
pub struct EnvArtifact {
    file: NamedTempFile,
}

impl EnvArtifact {
    /// Render `state` into a fresh `bashenv.*` file in the temp directory.
    pub(crate) fn create(
        invocation: &OsStr,
        self_path: &Path,
        state: &State,
    ) -> Result<Self, BridgeError> {
        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .tempfile()
            .map_err(BridgeError::Artifact)?;
        {
            let mut out = BufWriter::new(file.as_file_mut());
            render(invocation, self_path, state, &mut out).map_err(BridgeError::Artifact)?;
            out.flush().map_err(BridgeError::Artifact)?;
        }
        tracing::debug!(path = %file.path().display(), "wrote env artifact");
        Ok(Self { file })
    }

    /// Where the artifact lives.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Leave the file on disk and return its path.
    pub fn keep(self) -> Result<PathBuf, BridgeError> {
        self.file
            .keep()
            .map(|(_, path)| path)
            .map_err(|e| BridgeError::Artifact(e.error))
    }
}

impl Context {
    /// Render the artifact a run would source right now, without running anything.
    pub fn env_script(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let state = self.lock();
        // Writing into a Vec cannot fail.
        let _ = render(&self.config().invocation, self.self_path(), &state, &mut out);
        out
    }
}
