//! Outbox files
//!
//! An outbox is a RON list of [`Outgoing`] items:
//!
//! ```ron
//! [
//!     Simple((from: Some("ops@example.com"), to: ["a@example.com"], subject: Some("Ping"))),
//!     Simple((to: ["b@example.com"], text: Some("Lorem Ipsum"))),
//!     Mime((headers: [("To", "c@example.com"), ("Subject", "Pong")], body: "...")),
//! ]
//! ```
//!
//! Consecutive items of the same kind are sent as one submission, so the file
//! above becomes two submissions.

use std::path::Path;

use anyhow::Context;
use mailpace_common::{Outgoing, internal};
use mailpace_queue::Messages;

/// Read and parse a single outbox file
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid outbox.
pub async fn load(path: &Path) -> anyhow::Result<Vec<Outgoing>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read outbox {}", path.display()))?;

    let items: Vec<Outgoing> = ron::from_str(&content)
        .with_context(|| format!("Failed to parse outbox {}", path.display()))?;

    internal!("Loaded {} items from {}", items.len(), path.display());

    Ok(items)
}

/// Load every outbox in order and group them into submissions
///
/// # Errors
///
/// Fails on the first outbox that cannot be loaded.
pub async fn load_all<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Vec<Messages>> {
    let mut submissions = Vec::new();
    for path in paths {
        submissions.extend(group(load(path.as_ref()).await?)?);
    }

    Ok(submissions)
}

/// Split a mixed list into runs of one representation
///
/// # Errors
///
/// Passes through any error from converting a run into [`Messages`].
pub fn group(items: Vec<Outgoing>) -> anyhow::Result<Vec<Messages>> {
    let mut submissions = Vec::new();
    let mut run: Vec<Outgoing> = Vec::new();

    for item in items {
        if run.last().is_some_and(|last| last.kind() != item.kind()) {
            submissions.push(Messages::try_from(std::mem::take(&mut run))?);
        }
        run.push(item);
    }

    if !run.is_empty() {
        submissions.push(Messages::try_from(run)?);
    }

    Ok(submissions)
}
