use std::{fs, io, path::Path};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::config::Visibility;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    /// Always 0 for directories.
    pub size: u64,
    pub modified: DateTime<Local>,
}

/// Lists the immediate children of `dir`, directories first, each group
/// ordered by name ignoring case.
///
/// Children that cannot be inspected (dangling links, permission errors,
/// non-UTF-8 names) are left out. Only a failure to open `dir` itself is an
/// error.
pub fn list(dir: &Path, visibility: Visibility) -> io::Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = fs::read_dir(dir)?
        .filter_map(|child| match child {
            Ok(child) => read_entry(&child.path(), visibility),
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    let (dirs, files): (Vec<Entry>, Vec<Entry>) = entries.into_iter().partition(|e| e.is_dir);
    Ok(dirs.into_iter().chain(files).collect())
}

fn read_entry(path: &Path, visibility: Visibility) -> Option<Entry> {
    let file_name = path.file_name()?;
    if !visibility.admits(file_name) {
        return None;
    }
    let Some(name) = file_name.to_str() else {
        debug!("Skipping entry with non-UTF8 filename: {}", path.display());
        return None;
    };

    // Follows symlinks, so a dangling link fails here and is skipped.
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!("Failed to get metadata for {}: {}", path.display(), e);
            return None;
        }
    };
    let modified = metadata.modified().ok()?;
    let is_dir = metadata.is_dir();

    Some(Entry {
        name: name.to_string(),
        is_dir,
        size: if is_dir { 0 } else { metadata.len() },
        modified: modified.into(),
    })
}
