//! Plain-or-TLS stream used by both FTP channels

use std::io::{self, Read, Write};
use std::net::TcpStream;

use rustls::{ClientConnection, StreamOwned};

/// A socket that may be wrapped in TLS after construction (AUTH TLS upgrade)
pub enum SecurableStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl SecurableStream {
    /// Shut the connection down, sending close_notify first on TLS streams
    pub fn shutdown(&mut self) -> io::Result<()> {
        match self {
            SecurableStream::Plain(sock) => sock.shutdown(std::net::Shutdown::Both),
            SecurableStream::Tls(stream) => {
                stream.conn.send_close_notify();
                let _ = stream.conn.write_tls(&mut stream.sock);
                stream.sock.shutdown(std::net::Shutdown::Both)
            }
        }
    }
}

impl Read for SecurableStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SecurableStream::Plain(sock) => sock.read(buf),
            SecurableStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for SecurableStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SecurableStream::Plain(sock) => sock.write(buf),
            SecurableStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SecurableStream::Plain(sock) => sock.flush(),
            SecurableStream::Tls(stream) => stream.flush(),
        }
    }
}
