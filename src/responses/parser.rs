//! FTP response parsing functionality

use log::debug;

use crate::error::{Result, TuneSyncError};
use crate::responses::status_codes::FILE_STATUS;

/// Parsed FTP response from server
#[derive(Debug, Clone, PartialEq)]
pub struct FtpResponse {
    /// Response code (e.g., 230, 530, 227)
    pub code: u16,

    /// Response message (e.g., "User logged in, proceed")
    pub message: String,
}

impl FtpResponse {
    /// Create a new FTP response
    pub fn new(code: u16, message: String) -> Self {
        Self { code, message }
    }
}

impl std::fmt::Display for FtpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Parse FTP response string into structured response
pub fn parse_response(response: &str) -> Result<FtpResponse> {
    let response = response.trim();

    if response.is_empty() {
        return Err(TuneSyncError::InvalidResponse("empty response".to_string()));
    }

    // FTP responses start with a 3-digit code followed by space or dash
    if response.len() < 3 {
        return Err(TuneSyncError::InvalidResponse(format!(
            "response too short: '{}'",
            response
        )));
    }

    let code_str = &response[0..3];
    let code = code_str.parse::<u16>().map_err(|_| {
        TuneSyncError::InvalidResponse(format!("invalid response code: '{}'", code_str))
    })?;

    let separator = response.chars().nth(3).unwrap_or(' ');
    if separator != ' ' && separator != '-' {
        return Err(TuneSyncError::InvalidResponse(format!(
            "missing separator after code: '{}'",
            response
        )));
    }

    let message = if response.len() > 4 {
        response[4..].to_string()
    } else {
        String::new()
    };

    debug!("Parsed FTP response: code={}, message='{}'", code, message);

    Ok(FtpResponse::new(code, message))
}

/// Parse a 227 reply into the data connection endpoint.
///
/// Expected format per RFC 959: "227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)".
/// An advertised 0.0.0.0 is replaced by `control_host` (NAT setups announce it).
pub fn parse_pasv_addr(response: &FtpResponse, control_host: &str) -> Result<(String, u16)> {
    let text = &response.message;

    let start = text.find('(');
    let end = text.find(')');
    let fields = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start + 1..end],
        _ => {
            return Err(TuneSyncError::DataConnectionFailed(format!(
                "malformed PASV reply: '{}'",
                response
            )));
        }
    };

    let parts: Vec<u16> = fields
        .split(',')
        .map(|part| part.trim().parse::<u16>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| {
            TuneSyncError::DataConnectionFailed(format!("malformed PASV reply: '{}'", response))
        })?;

    if parts.len() != 6 || parts.iter().any(|field| *field > 255) {
        return Err(TuneSyncError::DataConnectionFailed(format!(
            "malformed PASV reply: '{}'",
            response
        )));
    }

    let host = format!("{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[3]);
    let port = parts[4] * 256 + parts[5];

    let host = if host == "0.0.0.0" {
        debug!("PASV advertised 0.0.0.0, falling back to control host");
        control_host.to_string()
    } else {
        host
    };

    Ok((host, port))
}

/// Extract the file length from a 213 SIZE reply, -1 when unavailable.
pub fn parse_size(response: &FtpResponse) -> i64 {
    if response.code != FILE_STATUS {
        return -1;
    }
    response
        .message
        .split_whitespace()
        .next()
        .and_then(|field| field.parse::<i64>().ok())
        .unwrap_or(-1)
}
