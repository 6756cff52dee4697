use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;

/// Candidate infinitives: one per line, blanks and `#` comments skipped,
/// first occurrence kept. Case and accents are preserved.
pub fn parse_infinitives(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .unique()
        .map(str::to_string)
        .collect()
}

pub fn fetch_infinitive_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading infinitives list {}", path.display()))?;
    Ok(parse_infinitives(&text))
}
