use crate::domain::model::{AttemptOutcome, SearchOutcome, SearchStatus};
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// Writes the search outcome as pretty-printed JSON, creating parent directories.
pub fn write_report<P: AsRef<Path>>(outcome: &SearchOutcome, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(outcome)?;
    fs::write(path, json)?;
    tracing::debug!("Report written to {}", path.display());
    Ok(())
}

/// Writes the report once the search has finished. A failure here only warns:
/// the exit code must keep describing the launch, not the report file.
pub fn save_report<P: AsRef<Path>>(outcome: &SearchOutcome, path: P) -> bool {
    let path = path.as_ref();
    match write_report(outcome, path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to write report to {}: {}", path.display(), e);
            eprintln!("⚠️  Could not write report to {}: {}", path.display(), e);
            false
        }
    }
}

pub fn read_report<P: AsRef<Path>>(path: P) -> Result<SearchOutcome> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Human-readable end-of-run summary.
pub fn summarize(outcome: &SearchOutcome) -> String {
    let mut lines = Vec::new();

    let headline = match (outcome.status, outcome.selected_port) {
        (SearchStatus::Found, Some(port)) => format!("✅ Training launched on master port {}", port),
        (SearchStatus::Found, None) => "✅ Training launched".to_string(),
        (SearchStatus::Exhausted, _) => {
            format!("❌ No usable master port found in {}", outcome.range)
        }
        (SearchStatus::Declined, _) => "🛑 Port search stopped by operator".to_string(),
        (SearchStatus::Interrupted, _) => "🛑 Launch interrupted by a signal".to_string(),
    };
    lines.push(headline);

    let launched = outcome.attempts.iter().filter(|a| a.launched()).count();
    let skipped = outcome.attempts.len() - launched;
    lines.push(format!(
        "  Processes per node: {}, launches: {}, busy ports skipped: {}",
        outcome.nproc_per_node, launched, skipped
    ));

    for attempt in &outcome.attempts {
        let result = match attempt.outcome {
            AttemptOutcome::Succeeded => "ok".to_string(),
            AttemptOutcome::Failed { code } => format!("exit code {}", code),
            AttemptOutcome::Signaled => "killed by signal".to_string(),
            AttemptOutcome::SkippedBusy => "skipped (busy)".to_string(),
        };
        lines.push(format!(
            "  port {:>5}: {} ({} ms)",
            attempt.port, result, attempt.elapsed_ms
        ));
    }

    lines.join("\n")
}
