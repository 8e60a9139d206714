//! shbridge: run Bash as a supervised child of a Rust host.
//!
//! This crate provides:
//!
//! - **Context**: variables, scripts, and host callbacks for Bash
//! - **Artifact**: the generated `BASH_ENV` file that injects all of it
//! - **Runner**: spawns Bash, relays signals, translates exit statuses
//! - **Dispatch**: lets Bash call registered Rust functions by re-invoking
//!   the host executable with a sentinel argument
//! - **Application**: one-call wiring of all of the above for a `main`
//!
//! ```no_run
//! use shbridge::{BridgeConfig, Context};
//!
//! let ctx = Context::new(BridgeConfig::default())?;
//! ctx.export_status_func("greet", |args| {
//!     println!("hello {}", args.join(" "));
//!     0
//! });
//! ctx.handle_funcs_or_exit(&std::env::args().collect::<Vec<_>>());
//!
//! ctx.export("NAME", "world");
//! ctx.source("./app.bash")?;
//! let status = ctx.run("main", &["--verbose"])?;
//! std::process::exit(status);
//! # Ok::<(), shbridge::BridgeError>(())
//! ```

#![cfg(unix)]

pub mod app;
pub mod artifact;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod quote;
pub mod runner;

pub use app::Application;
pub use artifact::EnvArtifact;
pub use context::{BridgeConfig, Callback, Context, Variable};
pub use dispatch::{Dispatch, SENTINEL, UNHANDLED_CALLBACK_STATUS};
pub use error::BridgeError;
pub use loader::{EmbeddedScripts, FsLoader, ScriptLoader};
pub use runner::{Input, Output, WaitResult};
