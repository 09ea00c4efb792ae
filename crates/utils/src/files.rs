use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use glob::Pattern;

/// Finds the most recently modified file in `dir` whose name matches the
/// glob `pattern` (e.g. `snapshot*.mhtml`). Returns `None` when the
/// directory is missing or nothing matches.
pub fn find_latest_matching(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let pattern = Pattern::new(pattern)
        .with_context(|| format!("Invalid file pattern: {}", pattern))?;

    let mut best: Option<(SystemTime, PathBuf)> = None;
    let entries =
        fs::read_dir(dir).with_context(|| format!("Reading dir: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !pattern.matches(name) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        match &best {
            Some((ts, _)) if *ts >= modified => {}
            _ => best = Some((modified, path)),
        }
    }

    Ok(best.map(|(_, path)| path))
}
