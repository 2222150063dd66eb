//! Control connection management
//!
//! Handles the FTP command channel: connect, optional TLS wrap, CRLF
//! command writes and single/multi-line response reads.

use log::{debug, info};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::commands::FtpCommand;
use crate::connection::stream::SecurableStream;
use crate::connection::tls;
use crate::error::{Result, TuneSyncError};
use crate::responses::{FtpResponse, parse_response};

// Control replies are short lines; anything longer is a broken peer
const MAX_LINE_LEN: usize = 4096;

/// Manages the FTP control connection
pub struct ControlConnection {
    stream: Option<SecurableStream>,
    host: String,
    port: u16,
}

impl ControlConnection {
    /// Open a TCP connection to the server with connect and socket timeouts
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        debug!("Connecting to {}:{}", host, port);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| TuneSyncError::InvalidHost(format!("{}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| {
                TuneSyncError::InvalidHost(format!("{}:{} did not resolve", host, port))
            })?;

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut => {
                TuneSyncError::ConnectionTimeout(format!("connect to {}:{}", host, port))
            }
            io::ErrorKind::ConnectionRefused => {
                TuneSyncError::ConnectionRefused(format!("{}:{}", host, port))
            }
            _ => TuneSyncError::Io(e),
        })?;

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        info!("Connected to FTP server at {}:{}", host, port);

        Ok(Self {
            stream: Some(SecurableStream::Plain(stream)),
            host: host.to_string(),
            port,
        })
    }

    /// Wrap the control channel in TLS (implicit mode, or after AUTH TLS)
    pub fn upgrade_to_tls(&mut self, config: Arc<rustls::ClientConfig>) -> Result<()> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| TuneSyncError::NotConnected("no control connection".to_string()))?;

        match stream {
            SecurableStream::Plain(sock) => {
                let tls_stream = tls::wrap_stream(sock, config, &self.host)?;
                debug!("Control channel secured");
                self.stream = Some(SecurableStream::Tls(Box::new(tls_stream)));
                Ok(())
            }
            already_tls @ SecurableStream::Tls(_) => {
                self.stream = Some(already_tls);
                Err(TuneSyncError::InvalidResponse(
                    "control channel is already secured".to_string(),
                ))
            }
        }
    }

    /// Check if the connection is active
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Host this connection was opened against
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Send an FTP command (adds CRLF)
    pub fn send_command(&mut self, command: &FtpCommand) -> Result<()> {
        debug!("Sending command: {}", command);
        let wire = format!("{}\r\n", command.to_ftp_string());
        self.send_bytes(wire.as_bytes())
    }

    fn send_bytes(&mut self, data: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TuneSyncError::NotConnected("no control connection".to_string()))?;

        let result = stream.write_all(data).and_then(|_| stream.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) => match e.kind() {
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionAborted => {
                    self.stream = None;
                    Err(TuneSyncError::ConnectionLost(
                        "connection lost while sending".to_string(),
                    ))
                }
                _ => Err(TuneSyncError::Io(e)),
            },
        }
    }

    /// Read an FTP response, collapsing multi-line replies into one
    pub fn read_response(&mut self) -> Result<FtpResponse> {
        let first_line = self.read_line()?;
        let response = parse_response(&first_line)?;

        // "xyz-" opens a multi-line reply terminated by "xyz "
        let is_multiline = first_line.trim_end().len() >= 4
            && first_line.as_bytes().get(3) == Some(&b'-');

        if is_multiline {
            let terminator = format!("{:03} ", response.code);
            loop {
                let line = self.read_line()?;
                if line.starts_with(&terminator) {
                    break;
                }
            }
        }

        debug!("Received response: {}", response);
        Ok(response)
    }

    // Byte-wise line read: control lines are tiny and this keeps the
    // logic identical for plain and TLS streams
    fn read_line(&mut self) -> Result<String> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TuneSyncError::NotConnected("no control connection".to_string()))?;

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match stream.read(&mut byte) {
                Ok(0) => {
                    self.stream = None;
                    return Err(TuneSyncError::ConnectionLost(
                        "server closed the control connection".to_string(),
                    ));
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    if byte[0] != b'\r' {
                        line.push(byte[0]);
                    }
                    if line.len() > MAX_LINE_LEN {
                        return Err(TuneSyncError::InvalidResponse(
                            "control line exceeds maximum length".to_string(),
                        ));
                    }
                }
                Err(e) => match e.kind() {
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                        return Err(TuneSyncError::ConnectionTimeout(
                            "waiting for server response".to_string(),
                        ));
                    }
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionAborted => {
                        self.stream = None;
                        return Err(TuneSyncError::ConnectionLost(
                            "connection lost while reading".to_string(),
                        ));
                    }
                    _ => return Err(TuneSyncError::Io(e)),
                },
            }
        }

        let text = String::from_utf8_lossy(&line).into_owned();
        debug!("Read line: {}", text);
        Ok(text)
    }

    /// Disconnect from the server
    pub fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            info!("Disconnecting from {}:{}", self.host, self.port);
            stream.shutdown().map_err(TuneSyncError::Io)?;
        }
        Ok(())
    }
}

impl Drop for ControlConnection {
    fn drop(&mut self) {
        if self.stream.is_some() {
            let _ = self.disconnect();
        }
    }
}
