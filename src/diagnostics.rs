//! Message helpers shared by the loader, exporter and CLI.
//!
//! Progress goes to stdout, warnings and errors to stderr.

use std::fmt::Display;

/// Format a fatal error message.
pub fn error_message(msg: impl Display) -> String {
    format!("error: {}", msg)
}

pub fn warn(msg: impl Display) {
    eprintln!("WARN: {}", msg);
}

pub fn info(msg: impl Display) {
    println!("{}", msg);
}
