//! Entry path normalization and containment checks.
//!
//! Archive entries are adversarial input. Containment is decided on the
//! resolved path, never on the raw entry string.

use std::path::{Component, Path, PathBuf};

/// Strip one leading `./` from an entry path.
pub fn normalize_entry_path(raw: &str) -> &str {
    raw.strip_prefix("./").unwrap_or(raw)
}

/// Resolve `entry` under `root`, returning `None` if it would escape.
///
/// `..` segments are applied lexically; any segment that would climb above
/// `root`, or an entry resolving to `root` itself, is rejected. Segments that
/// are not plain names on this platform (drive prefixes, separators) are
/// rejected too.
pub fn resolve_within(root: &Path, entry: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for segment in entry.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            name => {
                let mut components = Path::new(name).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => {}
                    _ => return None,
                }
                resolved.push(name);
                depth += 1;
            }
        }
    }

    if depth == 0 || !resolved.starts_with(root) {
        return None;
    }
    Some(resolved)
}

/// Whether the existing directory `dir` resolves (through symlinks) inside
/// the canonical `root`.
pub fn is_contained(canonical_root: &Path, dir: &Path) -> bool {
    match dir.canonicalize() {
        Ok(real) => real.starts_with(canonical_root),
        Err(_) => false,
    }
}
