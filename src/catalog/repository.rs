//! Catalog repository
//!
//! Keeps the single authoritative in-memory catalog current and mediates
//! song downloads through the transfer gate. The cached catalog is an
//! `Arc` snapshot swapped atomically; a failed refresh never disturbs
//! the previous one.

use chrono::Utc;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::catalog::gate::TransferGate;
use crate::catalog::model::{Album, Catalog, Song, decode_catalog};
use crate::error::{Result, TuneSyncError};
use crate::status::{ProgressModel, TransferKind};
use crate::transfer::FileSource;

pub struct CatalogRepository<S: FileSource> {
    source: S,
    local_root: PathBuf,
    catalog_file: String,
    status_text: String,
    gate: TransferGate,
    progress: ProgressModel,
    catalog: RwLock<Option<Arc<Catalog>>>,
}

/// Reverts the progress model to idle when a transfer scope ends,
/// whether it returned, errored, or panicked
struct IdleOnDrop<'a> {
    model: &'a ProgressModel,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.model.finish();
    }
}

impl<S: FileSource> CatalogRepository<S> {
    pub fn new(
        source: S,
        local_root: impl Into<PathBuf>,
        catalog_file: impl Into<String>,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            source,
            local_root: local_root.into(),
            catalog_file: catalog_file.into(),
            status_text: status_text.into(),
            gate: TransferGate::new(),
            progress: ProgressModel::new(),
            catalog: RwLock::new(None),
        }
    }

    /// Shared handle to the download progress model
    pub fn progress(&self) -> ProgressModel {
        self.progress.clone()
    }

    /// The last successfully refreshed catalog, if any
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Download and decode the catalog document, rebuilding the album
    /// list with each song's current download state.
    pub fn refresh_catalog(&self) -> Result<Arc<Catalog>> {
        info!("Refreshing catalog from server");
        let local_path = self.local_root.join(&self.catalog_file);

        self.progress
            .begin(TransferKind::Catalog, self.status_text.clone());
        let _idle = IdleOnDrop {
            model: &self.progress,
        };

        {
            let progress = self.progress.clone();
            self.gate.with_exclusive_access(|| {
                self.source.fetch(
                    &self.catalog_file,
                    &local_path,
                    &mut |bytes_so_far, total_bytes| progress.record(bytes_so_far, total_bytes),
                )
            })?;
        }

        let text = fs::read_to_string(&local_path).map_err(|e| TuneSyncError::LocalIo {
            path: local_path.clone(),
            message: format!("catalog downloaded but cannot be read: {}", e),
        })?;
        let document = decode_catalog(&text)?;

        let albums: Vec<Album> = document
            .albums
            .into_iter()
            .map(|album| Album {
                name: album.name,
                songs: album
                    .songs
                    .into_iter()
                    .map(|song| {
                        let downloaded = self.is_downloaded(&song.path);
                        Song {
                            name: song.name,
                            path: song.path,
                            downloaded,
                        }
                    })
                    .collect(),
            })
            .collect();

        let catalog = Arc::new(Catalog {
            albums,
            refreshed_at: Utc::now(),
        });

        debug!(
            "Catalog refreshed: {} albums, {} songs",
            catalog.albums.len(),
            catalog.song_count()
        );

        *self
            .catalog
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(catalog.clone());

        Ok(catalog)
    }

    /// Download one song to `local_root/song.path`.
    ///
    /// The cached catalog's `downloaded` flags are snapshots; callers
    /// refresh or re-check `is_downloaded` after this returns.
    pub fn download_song(
        &self,
        song: &Song,
        mut on_progress: impl FnMut(i64, i64),
    ) -> Result<()> {
        info!("Downloading song '{}' ({})", song.name, song.path);
        let destination = self.local_root.join(&song.path);

        self.progress.begin(TransferKind::Song, song.name.clone());
        let _idle = IdleOnDrop {
            model: &self.progress,
        };

        let progress = self.progress.clone();
        let result = self.gate.with_exclusive_access(|| {
            self.source
                .fetch(&song.path, &destination, &mut |bytes_so_far, total_bytes| {
                    progress.record(bytes_so_far, total_bytes);
                    on_progress(bytes_so_far, total_bytes);
                })
        });

        if let Err(e) = &result {
            // Partial file stays on disk; is_downloaded reports it only
            // if it is non-empty
            warn!("Song download failed: {}", e);
        }
        result
    }

    /// Local check: a non-empty file exists at `local_root/remote_path`
    pub fn is_downloaded(&self, remote_path: &str) -> bool {
        local_file_size(&self.local_root.join(remote_path)) > 0
    }
}

fn local_file_size(path: &Path) -> i64 {
    fs::metadata(path)
        .map(|metadata| metadata.len() as i64)
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TransferKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const SAMPLE: &str = r#"{
        "albums": [
            {"name": "A", "songs": [
                {"name": "S1", "path": "a/s1.mp3"},
                {"name": "S2", "path": "a/s2.mp3"}
            ]},
            {"name": "B", "songs": [
                {"name": "S3", "path": "b/s3.mp3"}
            ]}
        ]
    }"#;

    /// Instrumented source: serves fixed payloads from memory, records
    /// overlapping fetches, and can be switched into a failing mode
    struct StubSource {
        files: HashMap<String, Vec<u8>>,
        report_size: bool,
        fail: AtomicBool,
        in_flight: AtomicBool,
        overlaps: AtomicUsize,
    }

    impl StubSource {
        fn new(files: &[(&str, &[u8])]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(path, payload)| (path.to_string(), payload.to_vec()))
                    .collect(),
                report_size: true,
                fail: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
                overlaps: AtomicUsize::new(0),
            }
        }

        fn without_size_reports(mut self) -> Self {
            self.report_size = false;
            self
        }
    }

    impl FileSource for StubSource {
        fn fetch(
            &self,
            remote_path: &str,
            destination: &Path,
            on_progress: &mut dyn FnMut(i64, i64),
        ) -> Result<()> {
            if self.in_flight.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(2));

            let result = (|| {
                if self.fail.load(Ordering::SeqCst) {
                    return Err(TuneSyncError::ConnectionRefused("stub offline".to_string()));
                }
                let payload = self.files.get(remote_path).ok_or_else(|| {
                    TuneSyncError::RemoteFileMissing {
                        code: 550,
                        message: remote_path.to_string(),
                    }
                })?;
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(destination, payload).unwrap();
                let total = if self.report_size {
                    payload.len() as i64
                } else {
                    -1
                };
                on_progress(payload.len() as i64, total);
                Ok(())
            })();

            self.in_flight.store(false, Ordering::SeqCst);
            result
        }
    }

    fn repository_with(
        source: StubSource,
        root: &Path,
    ) -> CatalogRepository<StubSource> {
        CatalogRepository::new(source, root, "database.json", "Host: stub")
    }

    #[test]
    fn test_refresh_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(
            StubSource::new(&[("database.json", SAMPLE.as_bytes())]),
            dir.path(),
        );

        let catalog = repo.refresh_catalog().unwrap();
        let names: Vec<&str> = catalog
            .albums
            .iter()
            .map(|album| album.name.as_str())
            .collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(catalog.albums[0].songs[0].path, "a/s1.mp3");
        assert_eq!(catalog.albums[0].songs[1].name, "S2");
        assert!(catalog.albums.iter().all(|album| album
            .songs
            .iter()
            .all(|song| !song.downloaded)));

        assert!(Arc::ptr_eq(&catalog, &repo.catalog().unwrap()));
        assert_eq!(repo.progress().snapshot().kind, TransferKind::Idle);
    }

    #[test]
    fn test_refresh_marks_existing_files_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/s1.mp3"), vec![0u8; 1024]).unwrap();
        // Zero-length file is not a download
        fs::write(dir.path().join("a/s2.mp3"), b"").unwrap();

        let repo = repository_with(
            StubSource::new(&[("database.json", SAMPLE.as_bytes())]),
            dir.path(),
        );
        let catalog = repo.refresh_catalog().unwrap();

        assert!(catalog.albums[0].songs[0].downloaded);
        assert!(!catalog.albums[0].songs[1].downloaded);
        assert!(!catalog.albums[1].songs[0].downloaded);
    }

    #[test]
    fn test_download_song_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(
            StubSource::new(&[
                ("database.json", SAMPLE.as_bytes()),
                ("a/s1.mp3", &[7u8; 1024]),
            ]),
            dir.path(),
        );

        let catalog = repo.refresh_catalog().unwrap();
        let song = catalog.find_song("a/s1.mp3").unwrap();
        assert!(!repo.is_downloaded("a/s1.mp3"));

        let mut reports = Vec::new();
        repo.download_song(song, |bytes_so_far, total_bytes| {
            reports.push((bytes_so_far, total_bytes));
        })
        .unwrap();

        assert!(repo.is_downloaded("a/s1.mp3"));
        assert_eq!(reports.last(), Some(&(1024, 1024)));
        assert_eq!(repo.progress().snapshot().kind, TransferKind::Idle);

        fs::remove_file(dir.path().join("a/s1.mp3")).unwrap();
        assert!(!repo.is_downloaded("a/s1.mp3"));
    }

    #[test]
    fn test_unknown_size_is_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(
            StubSource::new(&[("a/s1.mp3", &[1u8; 64])]).without_size_reports(),
            dir.path(),
        );

        let song = Song {
            name: "S1".to_string(),
            path: "a/s1.mp3".to_string(),
            downloaded: false,
        };
        let mut totals = Vec::new();
        repo.download_song(&song, |_, total_bytes| totals.push(total_bytes))
            .unwrap();

        assert!(!totals.is_empty());
        assert!(totals.iter().all(|total| *total == -1));
        assert!(repo.is_downloaded("a/s1.mp3"));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(
            StubSource::new(&[("database.json", SAMPLE.as_bytes())]),
            dir.path(),
        );

        let first = repo.refresh_catalog().unwrap();

        repo.source.fail.store(true, Ordering::SeqCst);
        let err = repo.refresh_catalog().unwrap_err();
        assert!(matches!(err, TuneSyncError::ConnectionRefused(_)));

        let cached = repo.catalog().unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(repo.progress().snapshot().kind, TransferKind::Idle);
    }

    #[test]
    fn test_malformed_catalog_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(
            StubSource::new(&[("database.json", br#"{"albums": [{"name": "A"}]}"#)]),
            dir.path(),
        );

        let err = repo.refresh_catalog().unwrap_err();
        assert!(matches!(err, TuneSyncError::CatalogMalformed(_)));
        assert!(repo.catalog().is_none());
        assert_eq!(repo.progress().snapshot().kind, TransferKind::Idle);
    }

    #[test]
    fn test_download_failure_reports_error_and_goes_idle() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(StubSource::new(&[]), dir.path());

        let song = Song {
            name: "Missing".to_string(),
            path: "x/missing.mp3".to_string(),
            downloaded: false,
        };
        let err = repo.download_song(&song, |_, _| {}).unwrap_err();
        assert!(matches!(err, TuneSyncError::RemoteFileMissing { .. }));
        assert!(!repo.is_downloaded("x/missing.mp3"));
        assert_eq!(repo.progress().snapshot().kind, TransferKind::Idle);
    }

    #[test]
    fn test_progress_model_reflects_running_song_download() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository_with(
            StubSource::new(&[("a/s1.mp3", &[9u8; 256])]),
            dir.path(),
        );

        let song = Song {
            name: "S1".to_string(),
            path: "a/s1.mp3".to_string(),
            downloaded: false,
        };
        let model = repo.progress();
        let mut seen_kind = TransferKind::Idle;
        repo.download_song(&song, |_, _| {
            seen_kind = model.snapshot().kind;
        })
        .unwrap();

        assert_eq!(seen_kind, TransferKind::Song);
        assert_eq!(model.snapshot().kind, TransferKind::Idle);
        assert_eq!(model.snapshot().bytes_so_far, 256);
    }

    #[test]
    fn test_concurrent_operations_never_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(repository_with(
            StubSource::new(&[
                ("database.json", SAMPLE.as_bytes()),
                ("a/s1.mp3", &[1u8; 128]),
                ("b/s3.mp3", &[2u8; 128]),
            ]),
            dir.path(),
        ));

        let mut handles = Vec::new();
        for worker in 0..6 {
            let repo = repo.clone();
            handles.push(thread::spawn(move || {
                if worker % 2 == 0 {
                    let _ = repo.refresh_catalog();
                } else {
                    let path = if worker == 1 { "a/s1.mp3" } else { "b/s3.mp3" };
                    let song = Song {
                        name: "S1".to_string(),
                        path: path.to_string(),
                        downloaded: false,
                    };
                    let _ = repo.download_song(&song, |_, _| {});
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(repo.source.overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(repo.progress().snapshot().kind, TransferKind::Idle);
    }
}
