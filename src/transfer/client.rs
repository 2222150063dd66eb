//! One-shot file retrieval over a fresh FTP/FTPS session

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::FtpCommand;
use crate::config::{ServerSettings, TlsMode};
use crate::connection::tls;
use crate::connection::{ControlConnection, DataConnection};
use crate::error::{Result, TuneSyncError};
use crate::responses::{
    self, AUTH_ACCEPTED, FtpResponse, SERVICE_READY, parse_pasv_addr, parse_size,
};

const CHUNK_SIZE: usize = 8192;

/// Source of remote files.
///
/// `fetch` blocks until the file at `remote_path` has been written to
/// `destination` in full, invoking `on_progress` with
/// (bytes so far, total bytes or -1) zero or more times along the way.
/// Implementations are not required to tolerate concurrent calls; the
/// catalog repository serializes access through its gate.
pub trait FileSource {
    fn fetch(
        &self,
        remote_path: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(i64, i64),
    ) -> Result<()>;
}

/// FTP/FTPS transfer client performing exactly one retrieval per fresh
/// control+data connection. No state survives between calls other than
/// the connection parameters.
pub struct FtpTransferClient {
    settings: ServerSettings,
}

impl FtpTransferClient {
    pub fn new(settings: ServerSettings) -> Self {
        Self { settings }
    }
}

impl FileSource for FtpTransferClient {
    fn fetch(
        &self,
        remote_path: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(i64, i64),
    ) -> Result<()> {
        info!(
            "Fetching '{}' into '{}'",
            remote_path,
            destination.display()
        );

        let mut session = FtpSession::open(&self.settings)?;
        let result = session.retrieve(remote_path, destination, on_progress);
        // Logout and disconnect even when the transfer failed partway
        session.finish();
        result
    }
}

/// A logged-in FTP session ready for one retrieval
struct FtpSession {
    control: ControlConnection,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    timeout: Duration,
}

impl FtpSession {
    fn open(settings: &ServerSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);

        let tls_config = match settings.security {
            TlsMode::Off => None,
            TlsMode::Explicit | TlsMode::Implicit => {
                Some(tls::client_config(settings.danger_accept_any_certificate)?)
            }
        };

        let mut control = ControlConnection::connect(&settings.host, settings.port, timeout)?;

        if settings.security == TlsMode::Implicit {
            // Implicit FTPS speaks TLS before the greeting
            if let Some(config) = &tls_config {
                control.upgrade_to_tls(config.clone())?;
            }
        }

        let greeting = control.read_response()?;
        if greeting.code != SERVICE_READY {
            return Err(TuneSyncError::InvalidResponse(format!(
                "unexpected greeting: {}",
                greeting
            )));
        }

        if settings.security == TlsMode::Explicit {
            control.send_command(&FtpCommand::AuthTls)?;
            let reply = control.read_response()?;
            if reply.code != AUTH_ACCEPTED {
                return Err(TuneSyncError::TlsHandshakeFailed(format!(
                    "server refused AUTH TLS: {}",
                    reply
                )));
            }
            if let Some(config) = &tls_config {
                control.upgrade_to_tls(config.clone())?;
            }
        }

        let mut session = Self {
            control,
            tls_config,
            timeout,
        };

        // Even a rejected login gets the QUIT/disconnect finalizer
        if let Err(e) = session.setup(settings) {
            session.finish();
            return Err(e);
        }

        Ok(session)
    }

    fn setup(&mut self, settings: &ServerSettings) -> Result<()> {
        self.login(&settings.username, &settings.password)?;
        self.set_binary()?;
        if self.tls_config.is_some() {
            self.secure_data_channel()?;
        }
        Ok(())
    }

    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.control
            .send_command(&FtpCommand::User(username.to_string()))?;
        let mut reply = self.control.read_response()?;

        if responses::is_need_password(reply.code) {
            self.control
                .send_command(&FtpCommand::Pass(password.to_string()))?;
            reply = self.control.read_response()?;
        }

        if !responses::is_authentication_success(reply.code) {
            return Err(TuneSyncError::from_ftp_response(reply.code, reply.message));
        }

        debug!("Logged in as '{}'", username);
        Ok(())
    }

    fn set_binary(&mut self) -> Result<()> {
        let reply = self.expect_success(&FtpCommand::TypeBinary)?;
        debug!("Binary mode: {}", reply);
        Ok(())
    }

    // RFC 4217: PBSZ 0 then PROT P to put the data channel under TLS
    fn secure_data_channel(&mut self) -> Result<()> {
        self.expect_success(&FtpCommand::Pbsz)?;
        self.expect_success(&FtpCommand::ProtPrivate)?;
        debug!("Data channel protection negotiated");
        Ok(())
    }

    fn expect_success(&mut self, command: &FtpCommand) -> Result<FtpResponse> {
        self.control.send_command(command)?;
        let reply = self.control.read_response()?;
        if !responses::is_success(reply.code) {
            return Err(TuneSyncError::from_ftp_response(reply.code, reply.message));
        }
        Ok(reply)
    }

    fn enter_passive(&mut self) -> Result<(String, u16)> {
        self.control.send_command(&FtpCommand::Pasv)?;
        let reply = self.control.read_response()?;
        if reply.code != responses::PASSIVE_MODE {
            return Err(TuneSyncError::from_ftp_response(reply.code, reply.message));
        }
        parse_pasv_addr(&reply, self.control.host())
    }

    // Best-effort: a failed or unsupported SIZE reports -1, never aborts
    fn remote_size(&mut self, remote_path: &str) -> i64 {
        let mut query = || -> Result<i64> {
            self.control
                .send_command(&FtpCommand::Size(remote_path.to_string()))?;
            let reply = self.control.read_response()?;
            Ok(parse_size(&reply))
        };
        match query() {
            Ok(size) => size,
            Err(e) => {
                debug!("SIZE query failed: {}", e);
                -1
            }
        }
    }

    fn retrieve(
        &mut self,
        remote_path: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(i64, i64),
    ) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| TuneSyncError::LocalIo {
                path: parent.to_path_buf(),
                message: format!("cannot create directory: {}", e),
            })?;
        }
        let file = File::create(destination).map_err(|e| TuneSyncError::LocalIo {
            path: destination.to_path_buf(),
            message: format!("cannot create file: {}", e),
        })?;

        let total_bytes = self.remote_size(remote_path);
        debug!("Transfer starting with size {}", total_bytes);

        let (data_host, data_port) = self.enter_passive()?;
        let mut data = DataConnection::open(&data_host, data_port, self.timeout)?;

        self.control
            .send_command(&FtpCommand::Retr(remote_path.to_string()))?;
        let reply = self.control.read_response()?;
        if !responses::is_preliminary(reply.code) {
            return Err(TuneSyncError::from_ftp_response(reply.code, reply.message));
        }

        if let Some(config) = &self.tls_config {
            data.secure(config.clone(), self.control.host())?;
        }

        let mut writer = BufWriter::new(file);
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut received: i64 = 0;

        on_progress(0, total_bytes);
        loop {
            match data.receive(&mut buffer)? {
                0 => break,
                n => {
                    writer
                        .write_all(&buffer[..n])
                        .map_err(|e| TuneSyncError::LocalIo {
                            path: destination.to_path_buf(),
                            message: format!("write failed: {}", e),
                        })?;
                    received += n as i64;
                    on_progress(received, total_bytes);
                }
            }
        }

        writer.flush().map_err(|e| TuneSyncError::LocalIo {
            path: destination.to_path_buf(),
            message: format!("flush failed: {}", e),
        })?;
        data.close()?;

        // The final control reply decides whether the stream was complete
        let final_reply = self.control.read_response()?;
        if !responses::is_success(final_reply.code) {
            return Err(TuneSyncError::from_ftp_response(
                final_reply.code,
                final_reply.message,
            ));
        }

        info!("Transfer complete: {} bytes", received);
        Ok(())
    }

    // Best-effort logout; transfer errors must not be masked by QUIT noise
    fn finish(mut self) {
        if !self.control.is_connected() {
            return;
        }
        if self.control.send_command(&FtpCommand::Quit).is_ok() {
            match self.control.read_response() {
                Ok(reply) => debug!("Server goodbye: {}", reply),
                Err(e) => debug!("No goodbye from server: {}", e),
            }
        }
        if let Err(e) = self.control.disconnect() {
            warn!("Disconnect failed: {}", e);
        }
    }
}
