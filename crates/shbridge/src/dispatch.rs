//! Callback dispatch, the receiving end of a shim.
//!
//! A shim runs `"$SELF_EXECUTABLE" ::: <name> <args...>`, so the host binary
//! starts again with the sentinel in its argv. Call one of the dispatch
//! functions at the very top of `main`, after registering callbacks and
//! before anything else, so that this second process runs the callback and
//! exits instead of starting another Bash.

use crate::context::Context;

/// Argument that switches the host into dispatch mode.
pub const SENTINEL: &str = ":::";

/// Exit status for a sentinel naming a callback that was never registered.
pub const UNHANDLED_CALLBACK_STATUS: i32 = 6;

/// What [`Context::dispatch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No sentinel in the arguments; carry on with normal startup.
    NotRequested,
    /// A sentinel named a callback that is not registered. Nothing ran.
    Unhandled(String),
    /// The callback ran. Holds its status if it returns one.
    Handled(Option<i32>),
}

impl Dispatch {
    /// Status a host should exit with, or `None` to continue starting up.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Dispatch::NotRequested => None,
            Dispatch::Unhandled(_) => Some(UNHANDLED_CALLBACK_STATUS),
            Dispatch::Handled(status) => Some(status.unwrap_or(0)),
        }
    }
}

impl Context {
    /// Look for the sentinel in `args` and run the named callback.
    ///
    /// The callback receives everything after its name. It is looked up
    /// under the Context lock but invoked after the lock is released, so it
    /// may use the Context itself.
    pub fn dispatch<S: AsRef<str>>(&self, args: &[S]) -> Dispatch {
        let Some(pos) = args.iter().position(|arg| arg.as_ref() == SENTINEL) else {
            return Dispatch::NotRequested;
        };
        let Some(name) = args.get(pos + 1).map(|n| n.as_ref()) else {
            return Dispatch::NotRequested;
        };

        let Some(callback) = self.callback(name) else {
            tracing::warn!(callback = name, "no such callback");
            return Dispatch::Unhandled(name.to_string());
        };

        let rest: Vec<String> = args[pos + 2..]
            .iter()
            .map(|a| a.as_ref().to_string())
            .collect();
        tracing::debug!(callback = name, args = rest.len(), "dispatching callback");
        Dispatch::Handled(callback.call(&rest))
    }

    /// Run a requested callback and report whether one ran.
    ///
    /// The caller is expected to exit afterwards (with 0 for callbacks that
    /// return nothing). An unregistered name reports `false`.
    pub fn handle_funcs<S: AsRef<str>>(&self, args: &[S]) -> bool {
        matches!(self.dispatch(args), Dispatch::Handled(_))
    }

    /// Run a requested callback and exit the process with its status.
    ///
    /// Exits with [`UNHANDLED_CALLBACK_STATUS`] for an unregistered name and
    /// returns normally only when no callback was requested.
    pub fn handle_funcs_or_exit<S: AsRef<str>>(&self, args: &[S]) {
        if let Some(status) = self.dispatch(args).exit_status() {
            std::process::exit(status);
        }
    }
}
