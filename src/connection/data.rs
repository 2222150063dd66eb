//! Passive-mode data connection for file retrieval

use log::{debug, info};
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::connection::stream::SecurableStream;
use crate::connection::tls;
use crate::error::{Result, TuneSyncError};

/// One passive-mode data channel, opened per transfer
pub struct DataConnection {
    stream: Option<SecurableStream>,
}

impl DataConnection {
    /// Connect to the endpoint the server advertised in its PASV reply
    pub fn open(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        info!("Opening data connection to {}:{}", host, port);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                TuneSyncError::DataConnectionFailed(format!("{}:{}: {}", host, port, e))
            })?
            .next()
            .ok_or_else(|| {
                TuneSyncError::DataConnectionFailed(format!("{}:{} did not resolve", host, port))
            })?;

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            TuneSyncError::DataConnectionFailed(format!("connect to {}:{}: {}", host, port, e))
        })?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        Ok(Self {
            stream: Some(SecurableStream::Plain(stream)),
        })
    }

    /// Wrap the data channel in TLS after the server accepted the transfer.
    /// SNI uses the control-channel host, not the PASV address.
    pub fn secure(&mut self, config: Arc<rustls::ClientConfig>, host: &str) -> Result<()> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| TuneSyncError::DataConnectionFailed("not connected".to_string()))?;

        match stream {
            SecurableStream::Plain(sock) => {
                let tls_stream = tls::wrap_stream(sock, config, host)?;
                debug!("Data channel secured");
                self.stream = Some(SecurableStream::Tls(Box::new(tls_stream)));
                Ok(())
            }
            already_tls @ SecurableStream::Tls(_) => {
                self.stream = Some(already_tls);
                Err(TuneSyncError::DataConnectionFailed(
                    "data channel is already secured".to_string(),
                ))
            }
        }
    }

    /// Receive a chunk, returning 0 at end of stream
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TuneSyncError::DataConnectionFailed("not connected".to_string()))?;

        match stream.read(buffer) {
            Ok(n) => Ok(n),
            // Some servers drop the data socket without close_notify; the
            // final control reply decides whether the transfer completed
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("Data channel closed without close_notify");
                Ok(0)
            }
            Err(e) => Err(TuneSyncError::DataConnectionFailed(format!(
                "receive failed: {}",
                e
            ))),
        }
    }

    /// Close the data connection
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().map_err(TuneSyncError::Io)?;
            debug!("Data connection closed");
        }
        Ok(())
    }
}

impl Drop for DataConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
