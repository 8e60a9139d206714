//! Quoting rules for embedding host data in Bash syntax.
//!
//! Everything here works on bytes: values captured from the environment are
//! not guaranteed to be UTF-8, and they must reach the interpreter unchanged.
//!
//! - [`ansi_c`] renders a value as a `$'...'` string (used by `export`).
//! - [`single`] renders an argument as a `'...'` string (used by `-c`).
//! - [`command_line`] joins an entrypoint and its quoted arguments.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Prefix Bash puts on environment entries that carry an exported function.
pub const FUNCTION_PREFIX: &str = "BASH_FUNC_";

/// Suffix Bash puts on environment entries that carry an exported function.
pub const FUNCTION_SUFFIX: &str = "%%";

/// Opening token of an exported function body.
pub const FUNCTION_OPENER: &str = "()";

/// Render `value` as an ANSI-C quoted string: `$'...'`.
///
/// Backslashes and single quotes are escaped; every other byte, newlines
/// and control characters included, is kept as-is.
pub fn ansi_c(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 3);
    out.extend_from_slice(b"$'");
    for &byte in value {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            _ => out.push(byte),
        }
    }
    out.push(b'\'');
    out
}

/// Render `arg` as a single-quoted word.
///
/// An embedded `'` closes the quote, emits an escaped quote, and reopens it.
pub fn single(arg: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(arg.len() + 2);
    out.push(b'\'');
    for &byte in arg {
        if byte == b'\'' {
            out.extend_from_slice(b"'\\''");
        } else {
            out.push(byte);
        }
    }
    out.push(b'\'');
    out
}

/// Build the `-c` command string: the entrypoint followed by each quoted argument.
pub fn command_line<S: AsRef<OsStr>>(entrypoint: &str, args: &[S]) -> OsString {
    let mut line = entrypoint.as_bytes().to_vec();
    for arg in args {
        line.push(b' ');
        line.extend_from_slice(&single(arg.as_ref().as_bytes()));
    }
    OsString::from_vec(line)
}

/// Detect Bash's exported-function encoding.
///
/// Returns the bare function name when `key` looks like `BASH_FUNC_<name>%%`
/// and `value` starts with `()`.
pub fn export_function_name<'a>(key: &'a str, value: &[u8]) -> Option<&'a str> {
    if !value.starts_with(FUNCTION_OPENER.as_bytes()) {
        return None;
    }
    key.strip_prefix(FUNCTION_PREFIX)?
        .strip_suffix(FUNCTION_SUFFIX)
        .filter(|name| !name.is_empty())
}

/// Whether `name` can appear on the left of `export name=...`.
pub fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `name` can be used as a function name without changing the
/// meaning of the line it is written on.
///
/// Bash accepts far more than POSIX here (`hello-go`, `ns::fn`), so this only
/// rejects whitespace, metacharacters, quoting and expansion characters.
pub fn is_function_name(name: &str) -> bool {
    const FORBIDDEN: &[char] = &[
        '|', '&', ';', '(', ')', '<', '>', '$', '`', '\'', '"', '\\', '=', '/', '{', '}', '#',
        '*', '?', '[', ']', '~', '!',
    ];
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
}
