use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::parser;

/// Entry discovered during a filesystem walk.
#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mtime_ts: i64,
}

/// Walk a directory recursively and collect video files modified within
/// `max_age` of `now_ts`, skipping ignored patterns.
pub fn walk_media_dir(
    root: &Path,
    max_age: Option<Duration>,
    now_ts: i64,
) -> std::io::Result<Vec<MediaEntry>> {
    let mut entries = Vec::new();
    let cutoff = max_age.map(|age| {
        now_ts.saturating_sub(i64::try_from(age.as_secs()).unwrap_or(i64::MAX))
    });
    walk_recursive(root, cutoff, &mut entries)?;
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn walk_recursive(
    dir: &Path,
    cutoff: Option<i64>,
    entries: &mut Vec<MediaEntry>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files/dirs and ignored patterns
        if name.starts_with('.') || parser::should_ignore(&name) {
            debug!(path = %path.display(), "skipping ignored entry");
            continue;
        }

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        if file_type.is_symlink() {
            continue;
        }

        if file_type.is_dir() {
            // Skip known junk directories
            if name == "@eaDir" || name == "#recycle" || name == "Extras" {
                continue;
            }
            walk_recursive(&path, cutoff, entries)?;
        } else if parser::is_video_file(&name) {
            if name.to_lowercase().starts_with("sample") {
                debug!(path = %path.display(), "skipping sample file");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            if let Some(cutoff) = cutoff {
                if mtime < cutoff {
                    debug!(path = %path.display(), mtime, "skipping file older than scan age");
                    continue;
                }
            }

            entries.push(MediaEntry {
                path,
                size_bytes: metadata.len(),
                mtime_ts: mtime,
            });
        }
    }
    Ok(())
}
