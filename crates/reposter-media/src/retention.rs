//! Bounded manifest of downloaded assets.
//!
//! The manifest is the only source of truth for which files the acquirer
//! owns. It never scans the directory after startup, and it only ever names
//! files inside its own managed directory, so eviction cannot reach unrelated
//! files. Partial downloads (`<managed name>.part`) left by an interrupted
//! run are tracked too and removed by the next retention pass.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

const PREFIX: &str = "rp_";
const EXTENSION: &str = "mp4";
const PARTIAL_SUFFIX: &str = ".part";

static MANAGED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rp_[A-Za-z0-9-]+_(\d{8}T\d{9})(?:-(\d+))?\.mp4$").expect("valid managed name regex")
});

/// Collision-free file name for a download: candidate id plus a
/// millisecond timestamp. `attempt > 0` appends a disambiguating suffix.
#[must_use]
pub fn managed_file_name(candidate_id: &str, at: DateTime<Utc>, attempt: u32) -> String {
    let id: String = candidate_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let id = if id.is_empty() { "unknown".to_owned() } else { id };
    let stamp = at.format("%Y%m%dT%H%M%S%3f");
    if attempt == 0 {
        format!("{PREFIX}{id}_{stamp}.{EXTENSION}")
    } else {
        format!("{PREFIX}{id}_{stamp}-{attempt}.{EXTENSION}")
    }
}

/// `true` when `name` follows the acquirer's naming scheme.
#[must_use]
pub fn is_managed_name(name: &str) -> bool {
    MANAGED_NAME_RE.is_match(name)
}

/// `true` for the in-progress download of a managed name.
#[must_use]
pub fn is_partial_name(name: &str) -> bool {
    name.strip_suffix(PARTIAL_SUFFIX)
        .is_some_and(is_managed_name)
}

/// Sort key for a managed name: (timestamp, suffix).
fn name_order(name: &str) -> Option<(String, u32)> {
    let caps = MANAGED_NAME_RE.captures(name)?;
    let stamp = caps.get(1)?.as_str().to_owned();
    let suffix = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some((stamp, suffix))
}

#[derive(Debug, Clone)]
pub struct RetentionManifest {
    dir: PathBuf,
    capacity: usize,
    entries: VecDeque<PathBuf>,
    partials: Vec<PathBuf>,
}

impl RetentionManifest {
    /// Empty manifest for `dir` keeping at most `capacity` assets (minimum 1,
    /// so the asset of the current cycle is never evicted).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            partials: Vec::new(),
        }
    }

    /// Manifest seeded from managed files already present in `dir`, oldest
    /// first, so retention holds across restarts. Leftover partial downloads
    /// are queued for removal. Files that do not follow the naming scheme
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if `dir` exists but cannot be read.
    pub fn from_directory(dir: impl Into<PathBuf>, capacity: usize) -> std::io::Result<Self> {
        let mut manifest = Self::new(dir, capacity);
        let read = match std::fs::read_dir(&manifest.dir) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(manifest),
            Err(e) => return Err(e),
        };

        let mut found: Vec<((String, u32), PathBuf)> = Vec::new();
        for entry in read {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_partial_name(name) {
                manifest.partials.push(entry.path());
            } else if let Some(order) = name_order(name) {
                found.push((order, entry.path()));
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        manifest.entries = found.into_iter().map(|(_, path)| path).collect();
        Ok(manifest)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked paths, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Record `path` as the newest asset. Returns `false` (and records
    /// nothing) when `path` is outside the managed directory or does not
    /// follow the naming scheme.
    pub fn record_acquisition(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let in_dir = path.parent() == Some(self.dir.as_path());
        let managed = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_managed_name);
        if !in_dir || !managed {
            tracing::warn!(path = %path.display(), "retention: refusing to track unmanaged path");
            return false;
        }
        self.entries.retain(|p| p != &path);
        self.entries.push_back(path);
        true
    }

    /// Register an in-progress download. If it is never settled (the
    /// download was dropped mid-stream) the next retention pass removes it.
    pub fn track_partial(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let in_dir = path.parent() == Some(self.dir.as_path());
        let partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_partial_name);
        if !in_dir || !partial {
            tracing::warn!(path = %path.display(), "retention: refusing to track unmanaged partial");
            return false;
        }
        if !self.partials.contains(&path) {
            self.partials.push(path);
        }
        true
    }

    /// The download at `path` finished or was cleaned up by its owner.
    pub fn settle_partial(&mut self, path: &Path) {
        self.partials.retain(|p| p != path);
    }

    /// Partial downloads awaiting removal.
    pub fn partials(&self) -> impl Iterator<Item = &Path> {
        self.partials.iter().map(PathBuf::as_path)
    }

    /// Drop the oldest entries beyond capacity, plus any abandoned partial
    /// downloads, and return them for deletion.
    pub fn enforce_retention(&mut self) -> Vec<PathBuf> {
        let excess = self.entries.len().saturating_sub(self.capacity);
        let mut stale: Vec<PathBuf> = self.partials.drain(..).collect();
        stale.extend(self.entries.drain(..excess));
        stale
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn managed_file_name_is_recognised() {
        let name = managed_file_name("3141_592", at(0), 0);
        assert!(name.starts_with("rp_3141-592_"));
        assert!(name.ends_with(".mp4"));
        assert!(is_managed_name(&name));
        assert!(is_managed_name(&managed_file_name("x", at(0), 2)));
    }

    #[test]
    fn foreign_names_are_not_managed() {
        assert!(!is_managed_name("holiday.mp4"));
        assert!(!is_managed_name("rp_1_20250101T000000000.mp4.part"));
        assert!(!is_managed_name("rp_1.mp4"));
        assert!(is_partial_name("rp_1_20250101T000000000.mp4.part"));
        assert!(!is_partial_name("movie.mp4.part"));
    }

    #[test]
    fn enforce_retention_evicts_oldest_first() {
        let dir = PathBuf::from("/var/media");
        let mut manifest = RetentionManifest::new(&dir, 2);
        let names: Vec<PathBuf> = (0..4)
            .map(|i| dir.join(managed_file_name(&i.to_string(), at(i), 0)))
            .collect();
        for p in &names {
            assert!(manifest.record_acquisition(p.clone()));
        }
        let evicted = manifest.enforce_retention();
        assert_eq!(evicted, vec![names[0].clone(), names[1].clone()]);
        assert_eq!(manifest.iter().collect::<Vec<_>>(), vec![names[2].as_path(), names[3].as_path()]);
        assert!(manifest.enforce_retention().is_empty());
    }

    #[test]
    fn paths_outside_the_directory_are_refused() {
        let mut manifest = RetentionManifest::new("/var/media", 3);
        let outside = PathBuf::from("/etc").join(managed_file_name("1", at(0), 0));
        assert!(!manifest.record_acquisition(outside));
        assert!(!manifest.record_acquisition(PathBuf::from("/var/media/notes.txt")));
        assert!(manifest.is_empty());
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let dir = PathBuf::from("/var/media");
        let mut manifest = RetentionManifest::new(&dir, 0);
        manifest.record_acquisition(dir.join(managed_file_name("a", at(0), 0)));
        manifest.record_acquisition(dir.join(managed_file_name("b", at(1), 0)));
        assert_eq!(manifest.enforce_retention().len(), 1);
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn from_directory_seeds_managed_files_oldest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let newer = managed_file_name("b", at(10), 0);
        let older = managed_file_name("a", at(5), 0);
        std::fs::write(tmp.path().join(&newer), b"x").unwrap();
        std::fs::write(tmp.path().join(&older), b"x").unwrap();
        std::fs::write(tmp.path().join("keep-me.txt"), b"x").unwrap();

        let manifest = RetentionManifest::from_directory(tmp.path(), 5).unwrap();
        let seeded: Vec<_> = manifest
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(seeded, vec![older, newer]);
    }

    #[test]
    fn abandoned_partials_are_swept_by_the_next_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let leftover = format!("{}.part", managed_file_name("old", at(0), 0));
        std::fs::write(tmp.path().join(&leftover), b"half").unwrap();
        std::fs::write(tmp.path().join("notes.part"), b"x").unwrap();

        let mut manifest = RetentionManifest::from_directory(tmp.path(), 5).unwrap();
        assert!(manifest.is_empty());

        let settled = tmp.path().join(format!("{}.part", managed_file_name("ok", at(1), 0)));
        let dropped = tmp.path().join(format!("{}.part", managed_file_name("cut", at(2), 0)));
        assert!(manifest.track_partial(settled.clone()));
        assert!(manifest.track_partial(dropped.clone()));
        assert!(!manifest.track_partial(tmp.path().join("notes.part")));
        manifest.settle_partial(&settled);

        let stale = manifest.enforce_retention();
        assert_eq!(stale, vec![tmp.path().join(&leftover), dropped]);
        assert_eq!(manifest.partials().count(), 0);
    }

    #[test]
    fn from_missing_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = RetentionManifest::from_directory(tmp.path().join("absent"), 5).unwrap();
        assert!(manifest.is_empty());
    }
}
