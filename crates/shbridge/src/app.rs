//! One-call setup for a host whose real program is a Bash script.
//!
//! ```no_run
//! use shbridge::{Application, EmbeddedScripts};
//!
//! let scripts = EmbeddedScripts::default().with("main.bash", b"main() { hello-rust; }");
//! let status = Application::new()
//!     .status_func("hello-rust", |_| {
//!         println!("Hello world from Rust");
//!         0
//!     })
//!     .script("main.bash")
//!     .loader(scripts)
//!     .run()?;
//! std::process::exit(status);
//! # Ok::<(), shbridge::BridgeError>(())
//! ```

use std::ffi::{OsStr, OsString};
use std::sync::Arc;

use crate::context::{BridgeConfig, Callback, Context};
use crate::error::BridgeError;
use crate::loader::{FsLoader, ScriptLoader};

/// Entry point used for the sourced program.
pub const ENTRYPOINT: &str = "main";

/// Builder for a host application.
pub struct Application {
    config: BridgeConfig,
    funcs: Vec<(String, Callback)>,
    scripts: Vec<String>,
    loader: Box<dyn ScriptLoader>,
    copy_env: bool,
}

impl Default for Application {
    fn default() -> Self {
        Self {
            config: BridgeConfig::from_env(),
            funcs: Vec::new(),
            scripts: Vec::new(),
            loader: Box::new(FsLoader),
            copy_env: false,
        }
    }
}

impl Application {
    /// An application configured from `DEBUG` and `SHELL`, loading scripts from disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Export a callback that returns nothing.
    pub fn func<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.funcs.push((name.into(), Callback::Unit(Arc::new(f))));
        self
    }

    /// Export a callback that returns an exit status.
    pub fn status_func<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[String]) -> i32 + Send + Sync + 'static,
    {
        self.funcs.push((name.into(), Callback::Status(Arc::new(f))));
        self
    }

    /// Source a script before running `main`. Scripts load in the order given.
    pub fn script(mut self, name: impl Into<String>) -> Self {
        self.scripts.push(name.into());
        self
    }

    /// Where scripts come from. Defaults to the filesystem.
    pub fn loader(mut self, loader: impl ScriptLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Copy the host environment into Bash.
    pub fn copy_env(mut self, copy: bool) -> Self {
        self.copy_env = copy;
        self
    }

    /// Run with the host's own argv.
    pub fn run(self) -> Result<i32, BridgeError> {
        let args: Vec<OsString> = std::env::args_os().collect();
        self.run_with_args(&args)
    }

    /// Dispatch a callback if `args` asks for one, otherwise run `main`
    /// with `args[1..]`.
    ///
    /// Returns the status to exit with. A Bash killed by a signal is reported
    /// as its raw wait status rather than an error.
    pub fn run_with_args(self, args: &[OsString]) -> Result<i32, BridgeError> {
        let ctx = Context::new(self.config)?;
        for (name, callback) in self.funcs {
            ctx.insert_callback(name, callback);
        }

        let argv: Vec<String> = args.iter().map(|arg| lossy_arg(arg)).collect();
        if let Some(status) = ctx.dispatch(&argv).exit_status() {
            return Ok(status);
        }

        for script in &self.scripts {
            ctx.source_with(script, self.loader.as_ref())?;
        }
        if self.copy_env {
            ctx.copy_env();
        }

        let rest = args.get(1..).unwrap_or_default();
        match ctx.run(ENTRYPOINT, rest) {
            Err(e) if !e.is_fatal() => {
                tracing::debug!("{}", e);
                Ok(e.exit_status().unwrap_or(1))
            }
            other => other,
        }
    }
}

/// Callbacks take `String` arguments; bytes that are not UTF-8 become U+FFFD.
fn lossy_arg(arg: &OsStr) -> String {
    match arg.to_str() {
        Some(arg) => arg.to_string(),
        None => {
            tracing::debug!(arg = ?arg, "argument is not UTF-8, replacing invalid bytes");
            arg.to_string_lossy().into_owned()
        }
    }
}
