//! Shared CLI output helpers.
//!
//! `console` handles NO_COLOR and non-tty detection; these helpers only fix
//! the shapes: green check for success, red cross for errors, cyan arrow
//! for hints.

use std::fmt::Display;

use console::style;

/// Print a success message with checkmark.
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red(), msg);
}

/// Print a hint message.
pub fn hint(msg: &str) {
    println!("{} {}", style("→").cyan(), style(msg).cyan());
}

/// Print a key-value pair (label dimmed, value bold).
pub fn kv(label: &str, value: impl Display) {
    println!("  {}  {}", style(format!("{}:", label)).dim(), style(value).bold());
}
