use std::fmt;
use std::path::PathBuf;

/// Main error type for tunesync
#[derive(Debug)]
pub enum TuneSyncError {
    // Connection Errors
    ConnectionRefused(String),
    ConnectionTimeout(String),
    ConnectionLost(String),
    NotConnected(String),
    InvalidHost(String),
    TlsHandshakeFailed(String),

    // Authentication Errors
    AuthenticationFailed { code: u16, message: String },

    // Transfer Errors
    RemoteFileMissing { code: u16, message: String },
    TransferFailed { code: u16, message: String },
    DataConnectionFailed(String),

    // Protocol Errors
    InvalidResponse(String),

    // Catalog Errors
    CatalogMalformed(String),

    // Configuration Errors
    ConfigFileNotFound(String),
    ConfigFileParseError(String),
    InvalidConfigValue(String),

    // IO Errors
    Io(std::io::Error),
    LocalIo { path: PathBuf, message: String },
}

impl fmt::Display for TuneSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Connection Errors
            Self::ConnectionRefused(msg) => write!(f, "Connection refused: {}", msg),
            Self::ConnectionTimeout(msg) => write!(f, "Connection timeout: {}", msg),
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::NotConnected(msg) => write!(f, "Not connected: {}", msg),
            Self::InvalidHost(msg) => write!(f, "Invalid host: {}", msg),
            Self::TlsHandshakeFailed(msg) => write!(f, "TLS handshake failed: {}", msg),

            // Authentication Errors
            Self::AuthenticationFailed { code, message } => {
                write!(f, "Authentication failed ({}): {}", code, message)
            }

            // Transfer Errors
            Self::RemoteFileMissing { code, message } => {
                write!(f, "Remote file missing ({}): {}", code, message)
            }
            Self::TransferFailed { code, message } => {
                write!(f, "Transfer failed ({}): {}", code, message)
            }
            Self::DataConnectionFailed(msg) => write!(f, "Data connection failed: {}", msg),

            // Protocol Errors
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            // Catalog Errors
            Self::CatalogMalformed(msg) => write!(f, "Catalog malformed: {}", msg),

            // Configuration Errors
            Self::ConfigFileNotFound(msg) => write!(f, "Config file not found: {}", msg),
            Self::ConfigFileParseError(msg) => write!(f, "Config file parse error: {}", msg),
            Self::InvalidConfigValue(msg) => write!(f, "Invalid config value: {}", msg),

            // IO Errors
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::LocalIo { path, message } => {
                write!(f, "Local file error for '{}': {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for TuneSyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TuneSyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl TuneSyncError {
    /// Map a negative FTP reply to the matching error variant
    pub fn from_ftp_response(code: u16, message: String) -> Self {
        match code {
            // Authentication rejections
            530 | 331 | 332 => Self::AuthenticationFailed { code, message },

            // File missing on the server
            550 => Self::RemoteFileMissing { code, message },

            // Transfer aborts and storage errors
            426 | 451 | 551 | 552 => Self::TransferFailed { code, message },

            // Data channel could not be opened
            425 => Self::DataConnectionFailed(format!("{} {}", code, message)),

            // Remaining negative replies
            _ if code >= 400 => Self::TransferFailed { code, message },

            // Positive reply where a negative one was expected
            _ => Self::InvalidResponse(format!("unexpected reply {} {}", code, message)),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TuneSyncError>;
