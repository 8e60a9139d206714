//! Script loaders.
//!
//! A loader turns a script name into its bytes. [`FsLoader`] reads from disk;
//! [`EmbeddedScripts`] serves scripts compiled into the binary with
//! `include_bytes!`. Any `Fn(&str) -> io::Result<Vec<u8>>` is a loader too.

use std::collections::HashMap;
use std::io;

/// Fetches script bodies by name.
pub trait ScriptLoader: Send + Sync {
    /// Load the script called `name`.
    fn load(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<F> ScriptLoader for F
where
    F: Fn(&str) -> io::Result<Vec<u8>> + Send + Sync,
{
    fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        self(name)
    }
}

/// Reads scripts from the filesystem; `name` is a path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl ScriptLoader for FsLoader {
    fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(name)
    }
}

/// Scripts bundled into the executable.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedScripts {
    scripts: HashMap<String, &'static [u8]>,
}

impl EmbeddedScripts {
    /// Build a bundle from `(name, bytes)` pairs.
    pub fn new(scripts: &[(&str, &'static [u8])]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(name, body)| (name.to_string(), *body))
                .collect(),
        }
    }

    /// Add one script to the bundle.
    pub fn with(mut self, name: impl Into<String>, body: &'static [u8]) -> Self {
        self.scripts.insert(name.into(), body);
        self
    }
}

impl ScriptLoader for EmbeddedScripts {
    fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        self.scripts
            .get(name)
            .map(|body| body.to_vec())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no embedded script named {name}"),
                )
            })
    }
}
