//! tunesync - FTP/FTPS music catalog synchronization
//!
//! Downloads a JSON album/song catalog from an FTP or FTPS server,
//! tracks per-song download state against local storage, and streams
//! individual song downloads with progress reporting. All transfers are
//! serialized through a single gate so overlapping requests cannot
//! corrupt local state.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod responses;
pub mod status;
pub mod terminal;
pub mod transfer;

pub use catalog::{Album, Catalog, CatalogRepository, Song, TransferGate};
pub use config::{ClientConfig, ServerSettings, StorageSettings, TlsMode};
pub use error::{Result, TuneSyncError};
pub use status::{DownloadStatus, ProgressModel, TransferKind};
pub use transfer::{FileSource, FtpTransferClient, TransferProgress};
