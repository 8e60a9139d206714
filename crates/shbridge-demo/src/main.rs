//! shbridge demo host.
//!
//! The real program lives in `scripts/demo.bash`; this binary exports a few
//! Rust callbacks to it and then runs its `main`.
//!
//! ```bash
//! cargo run -p shbridge-demo -- hello
//! echo '{"a":[1,2]}' | cargo run -p shbridge-demo -- jpointer /a/1
//! ```

use std::io::{self, Read, Write};

use anyhow::{Context as _, Result};
use shbridge::{Application, EmbeddedScripts};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEMO_SCRIPT: &[u8] = include_bytes!("../scripts/demo.bash");

/// Status for a callback invoked with bad arguments.
const USAGE_STATUS: i32 = 3;

fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var). Stdout belongs to Bash.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let scripts = EmbeddedScripts::default().with("demo.bash", DEMO_SCRIPT);
    let status = Application::new()
        .status_func("hello-rust", |_| {
            println!("Hello world from Rust");
            0
        })
        .status_func("reverse", |_| status_of(reverse()))
        .status_func("jpointer", |args| match args.first() {
            Some(pointer) => status_of(jpointer(pointer)),
            None => {
                eprintln!("usage: jpointer POINTER");
                USAGE_STATUS
            }
        })
        .script("demo.bash")
        .loader(scripts)
        .run()?;

    tracing::debug!(status, "demo finished");
    std::process::exit(status);
}

fn status_of(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{:#}", e);
            1
        }
    }
}

/// Copy stdin to stdout with its bytes in reverse order.
fn reverse() -> Result<()> {
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    let trailing_newline = input.last() == Some(&b'\n');
    if trailing_newline {
        input.pop();
    }
    input.reverse();
    if trailing_newline {
        input.push(b'\n');
    }
    io::stdout().write_all(&input)?;
    Ok(())
}

/// Print the JSON value at `pointer` in the document read from stdin.
///
/// Strings print bare; everything else prints as compact JSON.
fn jpointer(pointer: &str) -> Result<()> {
    let doc: serde_json::Value =
        serde_json::from_reader(io::stdin().lock()).context("stdin is not JSON")?;
    let value = doc
        .pointer(pointer)
        .with_context(|| format!("nothing at {}", pointer))?;
    match value {
        serde_json::Value::String(s) => println!("{}", s),
        other => println!("{}", other),
    }
    Ok(())
}
