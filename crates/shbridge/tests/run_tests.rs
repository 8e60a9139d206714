//! Integration tests for running Bash through a Context.
//!
//! These need a real `/bin/bash`.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;
use shbridge::{BridgeConfig, BridgeError, Context, Input, Output};
use shbridge_testutil::{BASH, Capture, NO_ARGS, load_fixture};

fn config() -> BridgeConfig {
    BridgeConfig::default().interpreter(BASH)
}

/// A context with `script` sourced and stdout captured.
fn setup(script: &str) -> (Context, Capture) {
    setup_with(config(), script)
}

fn setup_with(config: BridgeConfig, script: &str) -> (Context, Capture) {
    let ctx = Context::new(config).expect("failed to create context");
    ctx.source_with(script, &load_fixture)
        .expect("failed to source fixture");
    let stdout = Capture::new();
    ctx.set_stdout(Output::writer(stdout.clone()));
    (ctx, stdout)
}

fn inline(body: &'static str) -> impl Fn(&str) -> io::Result<Vec<u8>> + Send + Sync {
    move |_| Ok(body.as_bytes().to_vec())
}

// ============================================================================
// Output and input
// ============================================================================

#[test]
fn hello_stdout() {
    let (ctx, stdout) = setup("hello.sh");

    let status = ctx.run("main", NO_ARGS).unwrap();
    assert_eq!(status, 0);
    assert_eq!(stdout.text(), "hello\n");
}

#[test]
fn hello_stdin() {
    let (ctx, stdout) = setup("cat.sh");
    ctx.set_stdin(Input::bytes("hello\n"));

    let status = ctx.run("main", NO_ARGS).unwrap();
    assert_eq!(status, 0);
    assert_eq!(stdout.text(), "hello\n");
}

#[test]
fn stderr_is_captured_separately() {
    let ctx = Context::new(config()).unwrap();
    ctx.source_with("err.sh", &inline("main() { echo out; echo oops >&2; }"))
        .unwrap();
    let stdout = Capture::new();
    let stderr = Capture::new();
    ctx.set_stdout(Output::writer(stdout.clone()));
    ctx.set_stderr(Output::writer(stderr.clone()));

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    assert_eq!(stdout.text(), "out\n");
    assert_eq!(stderr.text(), "oops\n");
}

#[test]
fn stdout_to_file() {
    let ctx = Context::new(config()).unwrap();
    ctx.source_with("hello.sh", &load_fixture).unwrap();
    let mut file = tempfile::tempfile().unwrap();
    ctx.set_stdout(Output::File(file.try_clone().unwrap()));

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);

    let mut out = String::new();
    file.rewind().unwrap();
    file.read_to_string(&mut out).unwrap();
    assert_eq!(out, "hello\n");
}

#[test]
fn socket_stdin_still_sources_environment() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    let (ctx, stdout) = setup("hello.sh");
    ctx.set_stdin(Input::File(File::from(OwnedFd::from(theirs))));

    let status = ctx.run("main", NO_ARGS).unwrap();
    assert_eq!(status, 0, "non-zero exit");
    assert_eq!(stdout.text(), "hello\n");
    drop(ours);
}

// ============================================================================
// Exported variables
// ============================================================================

#[test]
fn environment_value_with_quotes_and_dollar() {
    let (ctx, stdout) = setup("foobar.sh");
    let complex = "Andy's Laptop says, \"$X=1\"";
    ctx.export("FOOBAR", complex);

    let status = ctx.run("main", NO_ARGS).unwrap();
    assert_eq!(status, 0);
    assert_eq!(stdout.text().trim_end_matches('\n'), complex);
}

#[rstest]
#[case::single_quote("it's")]
#[case::backslash(r"back\slash \n \'")]
#[case::newlines("line one\nline two\n")]
#[case::control_bytes("tab\there\x01\x1b[0m")]
#[case::substitution("$(echo pwned) `id` ${HOME}")]
#[case::empty("")]
fn exported_values_round_trip(#[case] value: &str) {
    let (ctx, stdout) = setup("exact.sh");
    ctx.export("FOOBAR", value);

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    assert_eq!(stdout.text(), value);
}

#[test]
fn later_export_wins() {
    let (ctx, stdout) = setup("exact.sh");
    ctx.export("FOOBAR", "first");
    ctx.export("FOOBAR", "second");

    ctx.run("main", NO_ARGS).unwrap();
    assert_eq!(stdout.text(), "second");
}

// ============================================================================
// Arguments
// ============================================================================

#[test]
fn odd_args() {
    let (ctx, stdout) = setup("printf.sh");

    let status = ctx.run("main", &["hel\n\\'lo"]).unwrap();
    assert_eq!(status, 0);
    assert_eq!(stdout.text(), "arg: <hel\n\\'lo>");
}

#[rstest]
#[case::spaces(&["a b", "c"], "arg: <a b>arg: <c>")]
#[case::empty_arg(&["", "x"], "arg: <>arg: <x>")]
#[case::quotes(&["it's", "\"q\""], "arg: <it's>arg: <\"q\">")]
#[case::newline(&["x\ny"], "arg: <x\ny>")]
#[case::expansions(&["$HOME", "*", "$(id)"], "arg: <$HOME>arg: <*>arg: <$(id)>")]
fn args_keep_boundaries(#[case] args: &[&str], #[case] expected: &str) {
    let (ctx, stdout) = setup("printf.sh");

    assert_eq!(ctx.run("main", args).unwrap(), 0);
    assert_eq!(stdout.text(), expected);
}

// ============================================================================
// Callbacks
// ============================================================================

#[test]
fn func_callback_shim() {
    let ctx = Context::new(config().self_path("/bin/echo")).unwrap();
    ctx.export_func("myfunc", |_| {});
    let stdout = Capture::new();
    ctx.set_stdout(Output::writer(stdout.clone()));

    let status = ctx.run("myfunc", &["abc", "123"]).unwrap();
    assert_eq!(status, 0);
    assert_eq!(stdout.text(), "::: myfunc abc 123\n");
}

#[test]
fn identity_variables_are_exported() {
    let ctx = Context::new(config().self_path("/bin/echo").invocation("./host app")).unwrap();
    ctx.source_with(
        "ids.sh",
        &inline(r#"main() { printf '%s|%s' "$SELF" "$SELF_EXECUTABLE"; }"#),
    )
    .unwrap();
    let stdout = Capture::new();
    ctx.set_stdout(Output::writer(stdout.clone()));

    ctx.run("main", NO_ARGS).unwrap();
    assert_eq!(stdout.text(), "./host app|/bin/echo");
}

// ============================================================================
// Exit status
// ============================================================================

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(127)]
fn exit_codes_are_returned(#[case] code: i32) {
    let (ctx, _stdout) = setup("status.sh");
    assert_eq!(ctx.run("main", &[code.to_string()]).unwrap(), code);
}

#[test]
fn signal_death_is_reported() {
    let (ctx, _stdout) = setup("selfkill.sh");

    let err = ctx.run("main", NO_ARGS).unwrap_err();
    assert!(!err.is_fatal());
    match err {
        BridgeError::Terminated { signal, status } => {
            assert_eq!(signal, Some(15));
            assert_eq!(status, 15);
        }
        other => panic!("expected Terminated, got {:?}", other),
    }
}

#[test]
fn missing_interpreter_is_a_launch_error() {
    let (ctx, _stdout) = setup_with(config().interpreter("/nonexistent/bash"), "hello.sh");

    let err = ctx.run("main", NO_ARGS).unwrap_err();
    assert!(matches!(err, BridgeError::Launch { .. }), "got {:?}", err);
    assert!(err.is_fatal());
}

// ============================================================================
// Artifact lifecycle and reuse
// ============================================================================

fn artifact_path(stdout: &Capture) -> PathBuf {
    PathBuf::from(stdout.text())
}

#[test]
fn artifact_is_removed_after_run() {
    let (ctx, stdout) = setup("source-path.sh");

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    let path = artifact_path(&stdout);
    assert!(
        path.file_name().unwrap().to_string_lossy().starts_with("bashenv."),
        "unexpected artifact path {:?}",
        path
    );
    assert!(!path.exists());
}

#[test]
fn debug_keeps_artifact() {
    let (ctx, stdout) = setup_with(config().debug(true), "source-path.sh");

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    let path = artifact_path(&stdout);
    assert!(path.exists());

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.starts_with("unset BASH_ENV\n"));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn context_is_reusable_across_runs() {
    let (ctx, stdout) = setup("exact.sh");
    ctx.export("FOOBAR", "one");
    ctx.run("main", NO_ARGS).unwrap();
    ctx.export("FOOBAR", "two");
    ctx.run("main", NO_ARGS).unwrap();

    assert_eq!(stdout.text(), "onetwo");
}

#[test]
fn concurrent_runs_serialize() {
    let (ctx, stdout) = setup("hello.sh");
    let ctx = Arc::new(ctx);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = ctx.clone();
            std::thread::spawn(move || ctx.run("main", NO_ARGS))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 0);
    }

    assert_eq!(stdout.text(), "hello\n".repeat(4));
}

#[test]
fn failed_source_does_not_poison_run() {
    let (ctx, stdout) = setup("hello.sh");
    assert!(matches!(
        ctx.source("/nonexistent/script.sh"),
        Err(BridgeError::Load { .. })
    ));

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    assert_eq!(stdout.text(), "hello\n");
}

#[tokio::test]
async fn run_from_async_code_via_spawn_blocking() {
    let (ctx, stdout) = setup("hello.sh");
    let status = tokio::task::spawn_blocking(move || ctx.run("main", NO_ARGS))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(status, 0);
    assert_eq!(stdout.text(), "hello\n");
}

#[tokio::test]
async fn run_directly_on_current_thread_runtime() {
    let (ctx, stdout) = setup("hello.sh");

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    assert_eq!(stdout.text(), "hello\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_directly_on_multi_thread_runtime() {
    let (ctx, stdout) = setup("cat.sh");
    ctx.set_stdin(Input::bytes("piped\n"));

    assert_eq!(ctx.run("main", NO_ARGS).unwrap(), 0);
    assert_eq!(stdout.text(), "piped\n");
}
