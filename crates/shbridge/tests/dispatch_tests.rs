//! Tests for the dispatch side of the callback protocol.

use std::sync::{Arc, Mutex};

use shbridge::{BridgeConfig, Context, Dispatch, SENTINEL};

/// A context plus a log of every callback invocation.
fn setup() -> (Context, Arc<Mutex<Vec<(String, Vec<String>)>>>) {
    let ctx = Context::new(BridgeConfig::default()).expect("failed to create context");
    let log = Arc::new(Mutex::new(Vec::new()));

    let greet_log = log.clone();
    ctx.export_func("greet", move |args| {
        greet_log
            .lock()
            .unwrap()
            .push(("greet".to_string(), args.to_vec()));
    });

    let count_log = log.clone();
    ctx.export_status_func("count", move |args| {
        count_log
            .lock()
            .unwrap()
            .push(("count".to_string(), args.to_vec()));
        i32::try_from(args.len()).unwrap_or(i32::MAX)
    });

    (ctx, log)
}

#[test]
fn handler_receives_residual_args_once() {
    let (ctx, log) = setup();

    let handled = ctx.handle_funcs(&["progname", SENTINEL, "greet", "a", "b"]);

    assert!(handled);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], ("greet".to_string(), vec!["a".to_string(), "b".to_string()]));
}

#[test]
fn args_are_passed_verbatim() {
    let (ctx, log) = setup();
    let tricky = ["it's", "two words", "line\nbreak", "", "back\\slash"];
    let mut argv = vec!["progname", SENTINEL, "greet"];
    argv.extend(tricky);

    assert!(ctx.handle_funcs(&argv));
    assert_eq!(log.lock().unwrap()[0].1, tricky);
}

#[test]
fn status_handler_reports_status() {
    let (ctx, log) = setup();

    let result = ctx.dispatch(&["progname", SENTINEL, "count", "x", "y", "z"]);

    assert_eq!(result, Dispatch::Handled(Some(3)));
    assert_eq!(result.exit_status(), Some(3));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn unregistered_name_invokes_nothing() {
    let (ctx, log) = setup();

    assert!(!ctx.handle_funcs(&["progname", SENTINEL, "nope", "a"]));
    assert_eq!(
        ctx.dispatch(&["progname", SENTINEL, "nope"]),
        Dispatch::Unhandled("nope".to_string())
    );
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn no_sentinel_has_no_side_effects() {
    let (ctx, log) = setup();

    assert_eq!(ctx.dispatch(&["progname", "greet", "a"]), Dispatch::NotRequested);
    assert_eq!(ctx.dispatch::<&str>(&[]), Dispatch::NotRequested);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn sentinel_may_appear_after_other_args() {
    let (ctx, log) = setup();

    assert!(ctx.handle_funcs(&["progname", "--flag", SENTINEL, "greet"]));
    assert_eq!(log.lock().unwrap()[0].1, Vec::<String>::new());
}
