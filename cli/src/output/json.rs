//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed object on
//! stdout: the command's report on success, the error object on failure.

use anyhow::{Context, Result};
use serde::Serialize;

/// Format the JSON error object printed when a command fails.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "...",
///   "exit_code": 1
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str, exit_code: i32) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
        "exit_code": exit_code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Pretty-print any report type.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{text}");
    Ok(())
}
