//! Shared CLI output helpers.
//!
//! Color scheme (console honors NO_COLOR and non-tty streams):
//! - Green: success
//! - Red: errors
//! - Cyan: hints
//! - Bold: headers, values
//! - Dimmed: labels

use std::fmt::Display;

use console::style;

/// Print a success message with checkmark (green).
///
/// Example: `✓ configuration is valid`
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green(), msg);
}

/// Print an error message to stderr (red).
///
/// Example: `✗ config file not found: /etc/x.toml`
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").for_stderr().red(), msg);
}

/// Print a hint message to stderr (cyan).
///
/// Example: `→ run: pass init <gpg-id>`
pub fn hint(msg: &str) {
    eprintln!(
        "{} {}",
        style("→").for_stderr().cyan(),
        style(msg).for_stderr().cyan()
    );
}

/// Print a bold section header.
pub fn header(title: &str) {
    println!("{}", style(title).bold());
}

/// Print a key-value pair (label dimmed, value bold).
///
/// Example: `  bus name:  org.freedesktop.secrets`
pub fn kv(label: &str, value: impl Display) {
    println!("  {}  {}", style(label).dim(), style(value).bold());
}
