//! The Context: everything one Bash invocation is parameterized with.
//!
//! A Context owns:
//! - exported variables (ordered, duplicates allowed; later entries win)
//! - sourced script bodies (concatenated in registration order)
//! - callbacks Bash can invoke by name through generated shims
//! - the stdio streams handed to the child
//!
//! All of it sits behind one lock. Every mutation takes it, and so does the
//! whole of [`Context::run`], so a Context runs at most one child at a time.
//! Use one Context per concurrent run.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::BridgeError;
use crate::loader::{FsLoader, ScriptLoader};
use crate::quote;
use crate::runner::{Input, Output};

/// Interpreter used when nothing else is configured.
pub const DEFAULT_INTERPRETER: &str = "/bin/bash";

/// Configuration for a [`Context`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Path to the Bash executable.
    pub interpreter: PathBuf,
    /// Keep each run's env artifact on disk instead of deleting it.
    pub debug: bool,
    /// Executable the callback shims re-invoke. Resolved from the running
    /// binary when `None`.
    pub self_path: Option<PathBuf>,
    /// The host's argv[0], exported to Bash as `SELF`.
    pub invocation: OsString,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            debug: false,
            self_path: None,
            invocation: std::env::args_os().next().unwrap_or_default(),
        }
    }
}

impl BridgeConfig {
    /// Configuration from the process environment.
    ///
    /// `DEBUG` (any non-empty value) turns on debug mode, and `SHELL` is used
    /// as the interpreter when it names a bash.
    pub fn from_env() -> Self {
        let mut config = Self {
            debug: std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty()),
            ..Self::default()
        };
        if let Some(shell) = std::env::var_os("SHELL") {
            if shell.as_bytes().windows(4).any(|w| w == b"bash") {
                config.interpreter = PathBuf::from(shell);
            }
        }
        config
    }

    /// Use a different Bash executable.
    pub fn interpreter(mut self, path: impl Into<PathBuf>) -> Self {
        self.interpreter = path.into();
        self
    }

    /// Set debug mode.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Point callback shims at a specific executable.
    pub fn self_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.self_path = Some(path.into());
        self
    }

    /// Override the argv[0] exported as `SELF`.
    pub fn invocation(mut self, argv0: impl Into<OsString>) -> Self {
        self.invocation = argv0.into();
        self
    }
}

/// One exported variable.
///
/// Whether an entry is a function is decided once, when it is captured from
/// an environment, and never re-derived from its name afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// `export name=value`.
    Plain { name: OsString, value: OsString },
    /// A function inherited through Bash's `BASH_FUNC_<name>%%` encoding.
    /// `body` starts with `()`.
    Function { name: String, body: OsString },
}

impl Variable {
    /// Classify an environment entry.
    pub fn from_env_entry(key: OsString, value: OsString) -> Self {
        let function = key
            .to_str()
            .and_then(|k| quote::export_function_name(k, value.as_bytes()))
            .map(str::to_string);
        match function {
            Some(name) => Variable::Function { name, body: value },
            None => Variable::Plain { name: key, value },
        }
    }

    /// The name Bash will see.
    pub fn name(&self) -> &OsStr {
        match self {
            Variable::Plain { name, .. } => name,
            Variable::Function { name, .. } => OsStr::new(name),
        }
    }
}

/// A host function callable from Bash.
///
/// Handlers receive the shim's arguments as `String`s. When dispatch starts
/// from raw argv (as [`Application`](crate::Application) does), bytes that
/// are not valid UTF-8 arrive as U+FFFD.
#[derive(Clone)]
pub enum Callback {
    /// Runs and returns nothing; the dispatching process exits 0.
    Unit(Arc<dyn Fn(&[String]) + Send + Sync>),
    /// Runs and returns the status to exit with.
    Status(Arc<dyn Fn(&[String]) -> i32 + Send + Sync>),
}

impl Callback {
    /// Invoke the handler, returning its status if it produces one.
    pub fn call(&self, args: &[String]) -> Option<i32> {
        match self {
            Callback::Unit(f) => {
                f(args);
                None
            }
            Callback::Status(f) => Some(f(args)),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Unit(_) => f.write_str("Callback::Unit"),
            Callback::Status(_) => f.write_str("Callback::Status"),
        }
    }
}

/// Mutable state guarded by the Context lock.
pub(crate) struct State {
    pub(crate) vars: Vec<Variable>,
    pub(crate) scripts: Vec<Vec<u8>>,
    pub(crate) funcs: BTreeMap<String, Callback>,
    pub(crate) stdin: Input,
    pub(crate) stdout: Output,
    pub(crate) stderr: Output,
}

impl Default for State {
    fn default() -> Self {
        Self {
            vars: Vec::new(),
            scripts: Vec::new(),
            funcs: BTreeMap::new(),
            stdin: Input::Inherit,
            stdout: Output::Inherit,
            stderr: Output::Inherit,
        }
    }
}

/// A Bash environment: variables, scripts, and host callbacks.
pub struct Context {
    config: BridgeConfig,
    self_path: PathBuf,
    state: Mutex<State>,
}

impl Context {
    /// Create a Context.
    ///
    /// Fails if no `self_path` is configured and the running executable
    /// cannot be located.
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let self_path = match &config.self_path {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(BridgeError::SelfPath)?,
        };
        tracing::debug!(
            interpreter = %config.interpreter.display(),
            self_path = %self_path.display(),
            debug = config.debug,
            "created context"
        );
        Ok(Self {
            config,
            self_path,
            state: Mutex::new(State::default()),
        })
    }

    /// The configuration this Context was created with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The executable callback shims re-invoke.
    pub fn self_path(&self) -> &Path {
        &self.self_path
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking callback must not wedge the Context for good.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a script read from the filesystem.
    pub fn source(&self, path: &str) -> Result<(), BridgeError> {
        self.source_with(path, &FsLoader)
    }

    /// Append a script produced by `loader`.
    ///
    /// On failure the Context is left untouched.
    pub fn source_with(&self, name: &str, loader: &dyn ScriptLoader) -> Result<(), BridgeError> {
        let body = loader.load(name).map_err(|source| BridgeError::Load {
            name: name.to_string(),
            source,
        })?;
        tracing::debug!(script = name, bytes = body.len(), "sourced script");
        self.lock().scripts.push(body);
        Ok(())
    }

    /// Export a variable into the Bash environment.
    pub fn export(&self, name: impl Into<OsString>, value: impl Into<OsString>) {
        self.lock().vars.push(Variable::Plain {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Register a callback that returns nothing.
    pub fn export_func<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.insert_callback(name.into(), Callback::Unit(Arc::new(f)));
    }

    /// Register a callback that returns an exit status.
    pub fn export_status_func<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&[String]) -> i32 + Send + Sync + 'static,
    {
        self.insert_callback(name.into(), Callback::Status(Arc::new(f)));
    }

    pub(crate) fn insert_callback(&self, name: String, callback: Callback) {
        if self.lock().funcs.insert(name.clone(), callback).is_some() {
            tracing::debug!(callback = %name, "replaced callback");
        }
    }

    /// Copy every variable of the host environment into the Context,
    /// exported functions included.
    pub fn copy_env(&self) {
        self.import_env(std::env::vars_os());
    }

    /// Append the given environment entries, classifying exported functions.
    pub fn import_env<I, K, V>(&self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut state = self.lock();
        for (key, value) in vars {
            state
                .vars
                .push(Variable::from_env_entry(key.into(), value.into()));
        }
    }

    /// Set the stdin handed to Bash.
    pub fn set_stdin(&self, stdin: Input) {
        self.lock().stdin = stdin;
    }

    /// Set the stdout handed to Bash.
    pub fn set_stdout(&self, stdout: Output) {
        self.lock().stdout = stdout;
    }

    /// Set the stderr handed to Bash.
    pub fn set_stderr(&self, stderr: Output) {
        self.lock().stderr = stderr;
    }

    /// Names of all registered callbacks, sorted.
    pub fn callback_names(&self) -> Vec<String> {
        self.lock().funcs.keys().cloned().collect()
    }

    /// Number of exported variable entries.
    pub fn variable_count(&self) -> usize {
        self.lock().vars.len()
    }

    /// Number of sourced scripts.
    pub fn script_count(&self) -> usize {
        self.lock().scripts.len()
    }

    pub(crate) fn callback(&self, name: &str) -> Option<Callback> {
        self.lock().funcs.get(name).cloned()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("self_path", &self.self_path)
            .field("callbacks", &self.callback_names())
            .finish()
    }
}
