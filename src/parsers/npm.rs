//! Line scanner that locates declared dependencies in package.json text

use std::collections::HashSet;

use super::{ExtractedDependency, Manifest};

/// Keys that open a block whose entries are scanned for dependency names
const BLOCK_KEYS: [&str; 2] = ["dependencies", "devDependencies"];

/// Associate every declared dependency with the line its key appears on.
///
/// Names come from the parsed manifest; positions come from the raw text.
/// Only lines inside a `dependencies`/`devDependencies` object are matched,
/// so a `"scripts"` entry that happens to share a dependency's name is never
/// reported. Each name is reported at most once per call.
pub fn extract_dependencies(manifest: &Manifest, content: &str) -> Vec<ExtractedDependency> {
    let candidates = candidate_names(manifest);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut found = Vec::new();
    let mut in_block = false;

    for (line_idx, line) in content.lines().enumerate() {
        let line_num = line_idx as u32;

        let scanned = if let Some(rest) = after_block_key(line) {
            in_block = true;
            rest
        } else if in_block {
            line
        } else {
            continue;
        };

        let mut matches: Vec<(usize, &str)> = candidates
            .iter()
            .filter(|name| !seen.contains(*name))
            .filter_map(|&name| find_key(scanned, name).map(|pos| (pos, name)))
            .collect();
        matches.sort_by_key(|(pos, _)| *pos);

        for (_, name) in matches {
            seen.insert(name);
            found.push(ExtractedDependency {
                name: name.to_string(),
                line: line_num,
            });
        }

        if closes_block(line) {
            in_block = false;
        }
    }

    tracing::debug!("Extracted {} dependencies", found.len());
    found
}

/// Dependency names to look for, each once even when declared in both blocks
fn candidate_names(manifest: &Manifest) -> Vec<&str> {
    let mut names: Vec<&str> = manifest.dependencies.keys().map(String::as_str).collect();
    names.extend(
        manifest
            .dev_dependencies
            .keys()
            .filter(|name| !manifest.dependencies.contains_key(*name))
            .map(String::as_str),
    );
    names
}

/// If the line opens one of the block keys as an object, return the text
/// after the colon. A block key with any other value (a `"dependencies"`
/// script, say) opens nothing.
fn after_block_key(line: &str) -> Option<&str> {
    BLOCK_KEYS.iter().find_map(|key| {
        let pos = find_key(line, key)?;
        let rest = &line[pos + key.len() + 2..];
        let colon = rest.find(':')?;
        let value = &rest[colon + 1..];
        value.trim_start().starts_with('{').then_some(value)
    })
}

/// Find a quoted object key (`"<key>":`, whitespace allowed before the colon)
fn find_key(line: &str, key: &str) -> Option<usize> {
    let quoted = format!("\"{key}\"");
    let mut offset = 0;
    while let Some(idx) = line[offset..].find(&quoted) {
        let start = offset + idx;
        let after = &line[start + quoted.len()..];
        if after.trim_start().starts_with(':') {
            return Some(start);
        }
        offset = start + quoted.len();
    }
    None
}

/// A block ends on a line whose statement ends with a closing brace
fn closes_block(line: &str) -> bool {
    let trimmed = line.trim_end();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end();
    trimmed.ends_with('}')
}
