use std::path::Path;

use anyhow::Context;
use catalog_fsm::{LogEntry, StateMachine};
use catalog_state::StateStore;

pub fn apply(store: StateStore, path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let entries = parse_log(&content)?;

    let mut sm = StateMachine::new(store)?;
    let start = sm.last_applied();
    let pending: Vec<&LogEntry> = entries.iter().filter(|e| e.index > start).collect();
    let skipped = entries.len() - pending.len();

    let responses = sm.apply_all(pending)?;
    let failed = responses.iter().filter(|r| !r.success).count();

    println!(
        "✓ Applied {} entries (last index {})",
        responses.len(),
        sm.last_applied()
    );
    if skipped > 0 {
        println!("  Skipped {skipped} entries at or below index {start}");
    }
    if failed > 0 {
        println!("  {failed} entries referred to unknown nodes");
    }
    Ok(())
}

/// Parse one JSON log entry per non-blank line.
pub fn parse_log(content: &str) -> anyhow::Result<Vec<LogEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid log entry on line {}", n + 1))
        })
        .collect()
}
