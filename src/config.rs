use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::{Result, TuneSyncError};

fn default_timeout() -> u64 {
    30
}

fn default_catalog_file() -> String {
    // Wire name the catalog is published under on the server
    "database.json".to_string()
}

/// Configuration for the tunesync client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Server configuration
    pub server: ServerSettings,

    /// Local storage configuration
    pub storage: StorageSettings,
}

/// TLS mode for the FTP control and data channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain FTP
    #[default]
    Off,

    /// FTPS via AUTH TLS upgrade on the plain control connection
    Explicit,

    /// FTPS from the first byte
    Implicit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// FTP server hostname or IP address
    pub host: String,

    /// FTP server port number
    pub port: u16,

    /// Login username
    pub username: String,

    /// Login password
    pub password: String,

    /// TLS mode for control and data channels
    #[serde(default)]
    pub security: TlsMode,

    /// Accept any server certificate. Only for servers with self-signed
    /// certificates; leaves the connection open to interception.
    #[serde(default)]
    pub danger_accept_any_certificate: bool,

    /// Socket connect/read/write timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Local root directory holding the catalog file and all songs
    pub app_data_dir: PathBuf,

    /// Server-relative path of the catalog document
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
}

impl ClientConfig {
    /// Create configuration from TOML file with environment variable overrides
    pub fn from_config_file(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            TuneSyncError::ConfigFileNotFound(format!(
                "Cannot read config file '{}': {}",
                config_path, e
            ))
        })?;

        let mut config: ClientConfig = toml::from_str(&config_content).map_err(|e| {
            TuneSyncError::ConfigFileParseError(format!(
                "Invalid TOML in '{}': {}",
                config_path, e
            ))
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides to config
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = env::var("TUNESYNC_HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = env::var("TUNESYNC_PORT") {
            self.server.port = port_str.parse().map_err(|_| {
                TuneSyncError::InvalidConfigValue(
                    "TUNESYNC_PORT must be a valid port number".to_string(),
                )
            })?;
        }

        if let Ok(username) = env::var("TUNESYNC_USERNAME") {
            self.server.username = username;
        }

        if let Ok(password) = env::var("TUNESYNC_PASSWORD") {
            self.server.password = password;
        }

        if let Ok(timeout_str) = env::var("TUNESYNC_TIMEOUT") {
            self.server.timeout_secs = timeout_str.parse().map_err(|_| {
                TuneSyncError::InvalidConfigValue(
                    "TUNESYNC_TIMEOUT must be a valid number of seconds".to_string(),
                )
            })?;
        }

        if let Ok(data_dir) = env::var("TUNESYNC_DATA_DIR") {
            self.storage.app_data_dir = PathBuf::from(data_dir);
        }

        Ok(())
    }

    /// Validate the basic configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(TuneSyncError::InvalidConfigValue(
                "Host cannot be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(TuneSyncError::InvalidConfigValue(
                "Port cannot be 0".to_string(),
            ));
        }

        if self.server.timeout_secs == 0 {
            return Err(TuneSyncError::InvalidConfigValue(
                "Timeout cannot be 0".to_string(),
            ));
        }

        if self.storage.catalog_file.is_empty() {
            return Err(TuneSyncError::InvalidConfigValue(
                "Catalog file name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServerSettings {
    /// One-line connection summary for status display, password masked
    pub fn summary(&self) -> String {
        format!(
            "Host: {} Port: {} User: {}",
            self.host, self.port, self.username
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 2121,
                username: "username".to_string(),
                password: "password".to_string(),
                security: TlsMode::Off,
                danger_accept_any_certificate: false,
                timeout_secs: default_timeout(),
            },
            storage: StorageSettings {
                app_data_dir: PathBuf::from("./tunesync_data"),
                catalog_file: default_catalog_file(),
            },
        }
    }
}

impl std::fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tunesync Config - Server: {}:{}, User: {}, Security: {:?}, Timeout: {}s, Data Dir: {}",
            self.server.host,
            self.server.port,
            self.server.username,
            self.server.security,
            self.server.timeout_secs,
            self.storage.app_data_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 2121);
        assert_eq!(config.server.security, TlsMode::Off);
        assert!(!config.server.danger_accept_any_certificate);
        assert_eq!(config.storage.catalog_file, "database.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [server]
            host = "music.example.org"
            port = 990
            username = "anna"
            password = "secret"
            security = "implicit"
            danger_accept_any_certificate = true

            [storage]
            app_data_dir = "/var/lib/tunesync"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "music.example.org");
        assert_eq!(config.server.port, 990);
        assert_eq!(config.server.security, TlsMode::Implicit);
        assert!(config.server.danger_accept_any_certificate);
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.storage.catalog_file, "database.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.server.host = String::new();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.server.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_masks_password() {
        let mut config = ClientConfig::default();
        config.server.password = "hunter2".to_string();
        let display = format!("{}", config);
        assert!(!display.contains("hunter2"));
        assert!(display.contains("127.0.0.1"));
        assert!(!config.server.summary().contains("hunter2"));
    }
}
