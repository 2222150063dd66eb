//! Observable state of the currently running transfer
//!
//! The presentation layer polls `snapshot` instead of reaching into the
//! transfer client. Transitions are driven by the catalog repository
//! around each transfer.

use std::sync::{Arc, Mutex};

/// What the client is currently transferring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferKind {
    #[default]
    Idle,
    Catalog,
    Song,
}

/// Point-in-time view of the running transfer
#[derive(Debug, Clone, Default)]
pub struct DownloadStatus {
    pub kind: TransferKind,

    /// Bytes transferred so far, reset to 0 at the start of each transfer
    pub bytes_so_far: i64,

    /// Total bytes, -1 while unknown
    pub total_bytes: i64,

    /// Free-form description, e.g. a connection summary or song name
    pub status_text: String,
}

/// Shared, cloneable handle to the download status
#[derive(Clone, Default)]
pub struct ProgressModel {
    inner: Arc<Mutex<DownloadStatus>>,
}

impl ProgressModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a downloading state, resetting the byte counters
    pub fn begin(&self, kind: TransferKind, status_text: impl Into<String>) {
        let mut status = self.lock();
        status.kind = kind;
        status.bytes_so_far = 0;
        status.total_bytes = -1;
        status.status_text = status_text.into();
    }

    /// Record progress reported by the transfer callback
    pub fn record(&self, bytes_so_far: i64, total_bytes: i64) {
        let mut status = self.lock();
        status.bytes_so_far = bytes_so_far;
        status.total_bytes = total_bytes;
    }

    /// Return to idle; byte counters keep their last values until the
    /// next transfer begins
    pub fn finish(&self) {
        self.lock().kind = TransferKind::Idle;
    }

    /// Current status snapshot for display
    pub fn snapshot(&self) -> DownloadStatus {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DownloadStatus> {
        // A panicked writer leaves consistent display state behind
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let model = ProgressModel::new();
        let status = model.snapshot();
        assert_eq!(status.kind, TransferKind::Idle);
        assert_eq!(status.bytes_so_far, 0);
    }

    #[test]
    fn test_begin_resets_counters() {
        let model = ProgressModel::new();
        model.begin(TransferKind::Song, "First");
        model.record(512, 1024);

        model.begin(TransferKind::Catalog, "Second");
        let status = model.snapshot();
        assert_eq!(status.kind, TransferKind::Catalog);
        assert_eq!(status.bytes_so_far, 0);
        assert_eq!(status.total_bytes, -1);
        assert_eq!(status.status_text, "Second");
    }

    #[test]
    fn test_record_and_finish() {
        let model = ProgressModel::new();
        model.begin(TransferKind::Song, "Song");
        model.record(2048, -1);

        let status = model.snapshot();
        assert_eq!(status.kind, TransferKind::Song);
        assert_eq!(status.bytes_so_far, 2048);
        assert_eq!(status.total_bytes, -1);

        model.finish();
        assert_eq!(model.snapshot().kind, TransferKind::Idle);
    }

    #[test]
    fn test_handles_are_shared() {
        let model = ProgressModel::new();
        let other = model.clone();
        model.begin(TransferKind::Catalog, "shared");
        assert_eq!(other.snapshot().kind, TransferKind::Catalog);
    }
}
