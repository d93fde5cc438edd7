//! Keeps a cache folder under a byte budget by evicting the least recently
//! used files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics::ExporterMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub size_before: u64,
    pub size_after: u64,
    pub evicted: usize,
}

#[derive(Debug)]
struct CachedFile {
    path: PathBuf,
    size: u64,
    last_used: SystemTime,
}

#[derive(Debug, Clone)]
pub struct DiskCacheChecker {
    folder: PathBuf,
    max_bytes: u64,
}

impl DiskCacheChecker {
    pub fn new(folder: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            folder: folder.into(),
            max_bytes,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// One pass: removes files, oldest use first, until the folder fits.
    pub fn check(&self) -> io::Result<CheckReport> {
        let mut files = Vec::new();
        if self.folder.exists() {
            collect_files(&self.folder, &mut files)?;
        }
        let size_before: u64 = files.iter().map(|f| f.size).sum();
        let mut size = size_before;
        let mut evicted = 0;

        if size > self.max_bytes {
            files.sort_by_key(|f| f.last_used);
            for file in files {
                if size <= self.max_bytes {
                    break;
                }
                match fs::remove_file(&file.path) {
                    Ok(()) => {
                        size -= file.size;
                        evicted += 1;
                        debug!("Evicted {}", file.path.display());
                    }
                    // already gone, e.g. a token deleted by hand
                    Err(e) if e.kind() == io::ErrorKind::NotFound => size -= file.size,
                    Err(e) => warn!("Could not evict {}: {}", file.path.display(), e),
                }
            }
        }

        ExporterMetrics::record_cache_check(&self.folder.display().to_string(), size, evicted);
        if evicted > 0 {
            info!(
                "Cache {} reduced from {} to {} bytes ({} files evicted)",
                self.folder.display(),
                size_before,
                size,
                evicted
            );
        }
        Ok(CheckReport {
            size_before,
            size_after: size,
            evicted,
        })
    }

    /// Runs [`check`](Self::check) every `every` on the blocking pool.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let checker = self.clone();
                match tokio::task::spawn_blocking(move || checker.check()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!("Cache check of {} failed: {}", self.folder.display(), e),
                    Err(e) => warn!("Cache check task panicked: {}", e),
                }
            }
        })
    }
}

fn collect_files(dir: &Path, out: &mut Vec<CachedFile>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if metadata.is_file() {
            let modified = metadata.modified()?;
            // atime is often disabled, so never older than the last write
            let last_used = metadata
                .accessed()
                .map(|accessed| accessed.max(modified))
                .unwrap_or(modified);
            out.push(CachedFile {
                path: entry.path(),
                size: metadata.len(),
                last_used,
            });
        }
    }
    Ok(())
}

/// Marks a cached file as just used.
pub fn touch(path: &Path) -> io::Result<()> {
    let file = fs::File::options().append(true).open(path)?;
    file.set_modified(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_aged(dir: &Path, name: &str, bytes: usize, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![b'x'; bytes]).unwrap();
        let when = SystemTime::now() - Duration::from_secs(age_secs);
        let file = fs::File::options().append(true).open(&path).unwrap();
        file.set_times(fs::FileTimes::new().set_accessed(when).set_modified(when))
            .unwrap();
        path
    }

    #[test]
    fn test_evicts_oldest_until_under_budget() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let oldest = write_aged(dir.path(), "a", 400, 3000);
        let middle = write_aged(&dir.path().join("nested"), "b", 400, 2000);
        let newest = write_aged(dir.path(), "c", 400, 1000);

        let report = DiskCacheChecker::new(dir.path(), 900).check().unwrap();
        assert_eq!(report.size_before, 1200);
        assert_eq!(report.size_after, 800);
        assert_eq!(report.evicted, 1);
        assert!(!oldest.exists());
        assert!(middle.exists());
        assert!(newest.exists());
    }

    #[test]
    fn test_touch_protects_a_file() {
        let dir = TempDir::new().unwrap();
        let old = write_aged(dir.path(), "old", 500, 5000);
        let recent = write_aged(dir.path(), "recent", 500, 10);
        touch(&old).unwrap();

        let report = DiskCacheChecker::new(dir.path(), 600).check().unwrap();
        assert_eq!(report.evicted, 1);
        assert!(old.exists());
        assert!(!recent.exists());
    }

    #[test]
    fn test_missing_folder_is_empty() {
        let dir = TempDir::new().unwrap();
        let report = DiskCacheChecker::new(dir.path().join("absent"), 10).check().unwrap();
        assert_eq!(report.size_before, 0);
        assert_eq!(report.evicted, 0);
    }
}
