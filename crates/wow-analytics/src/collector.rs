//! Snapshot enumeration.
//!
//! Tolerant by construction: directories may appear or vanish between two
//! scans, and a directory without a parseable `metrics.json` is simply not
//! a snapshot yet. Nothing here ever fails the caller.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use wow_session::{METRICS_FILE, MetricsDocument, load_document};

/// One validated snapshot.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub path: PathBuf,
    pub modified: SystemTime,
    pub document: MetricsDocument,
}

/// Enumerates and caches valid snapshots, newest first.
#[derive(Debug)]
pub struct Collector {
    root: PathBuf,
    cap: usize,
    cache: Option<Vec<SessionRecord>>,
}

impl Collector {
    pub fn new(root: impl Into<PathBuf>, cap: usize) -> Collector {
        Collector {
            root: root.into(),
            cap,
            cache: None,
        }
    }

    /// Validated snapshots, newest mtime first; mtime ties break on the
    /// lexicographic session id. Capped at the configured maximum.
    pub fn sessions(&mut self) -> &[SessionRecord] {
        if self.cache.is_none() {
            self.cache = Some(scan(&self.root, self.cap));
        }
        self.cache.as_deref().unwrap_or_default()
    }

    /// Drop the cached id list; the next call rescans.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn scan(root: &Path, cap: usize) -> Vec<SessionRecord> {
    let Ok(entries) = std::fs::read_dir(root) else {
        tracing::debug!("sessions root {} not readable", root.display());
        return Vec::new();
    };

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(session_id) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            continue;
        };

        let document = match load_document(root, &session_id) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!("skipping invalid snapshot {session_id}: {e}");
                continue;
            }
        };
        // A snapshot may disappear between listing and statting; treat it
        // as absent in this scan.
        let Ok(metadata) = std::fs::metadata(path.join(METRICS_FILE)) else {
            continue;
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        records.push(SessionRecord {
            session_id,
            path,
            modified,
            document,
        });
    }

    records.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    records.truncate(cap);
    records
}
