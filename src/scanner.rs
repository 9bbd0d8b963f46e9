//! Source file discovery.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// Directories never descended into.
const SKIP_DIRS: &[&str] = &["node_modules", "vendor", "target", "__pycache__"];

/// Compile exclude patterns into a glob set.
pub fn build_excludes(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect files under `root` whose extension is wanted.
///
/// Hidden and dependency directories are skipped; exclude globs are matched
/// against root-relative paths. The result is sorted.
pub fn scan_files(
    root: &Path,
    exclude: &[String],
    extensions: &BTreeSet<String>,
) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let excludes = build_excludes(exclude)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        if e.depth() == 0 || !e.file_type().is_dir() {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        !name.starts_with('.') && !SKIP_DIRS.contains(&&*name)
    });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false);
        if !wanted {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        if excludes.is_match(&relative) {
            tracing::trace!(file = %relative, "excluded");
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    tracing::debug!(root = %root.display(), files = files.len(), "scanned files");
    Ok(files)
}
