//! Palindrome command - check text through a read-only view passed to the surface

use anyhow::{Context, Result};
use hostbridge_runtime::Host;

/// Check whether the words, joined by single spaces, read the same reversed
///
/// Returns the verdict so the caller can pick the exit status.
pub fn run(words: &[String]) -> Result<bool> {
    let text = words.join(" ");
    let host = Host::in_process().context("Failed to resolve the boundary surface")?;
    let verdict = host
        .is_palindrome(&text)
        .with_context(|| format!("Palindrome check failed for \"{}\"", text))?;

    if verdict {
        println!("\"{}\" is a palindrome", text);
    } else {
        println!("\"{}\" is not a palindrome", text);
    }
    Ok(verdict)
}
