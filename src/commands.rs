//! FTP command definitions

/// FTP commands used for catalog and song retrieval
#[derive(Debug, Clone, PartialEq)]
pub enum FtpCommand {
    /// USER - Username for authentication
    User(String),

    /// PASS - Password for authentication
    Pass(String),

    /// TYPE I - Switch to binary transfer mode
    TypeBinary,

    /// PASV - Enter passive mode
    Pasv,

    /// SIZE - Query remote file length
    Size(String),

    /// RETR - Retrieve/download file from server
    Retr(String),

    /// AUTH TLS - Upgrade the control connection to TLS
    AuthTls,

    /// PBSZ 0 - Protection buffer size, required before PROT
    Pbsz,

    /// PROT P - Switch the data channel to private (TLS)
    ProtPrivate,

    /// QUIT - Quit connection
    Quit,
}

impl FtpCommand {
    /// Convert command to FTP protocol string
    pub fn to_ftp_string(&self) -> String {
        match self {
            FtpCommand::User(username) => format!("USER {username}"),
            FtpCommand::Pass(password) => format!("PASS {password}"),
            FtpCommand::TypeBinary => "TYPE I".to_string(),
            FtpCommand::Pasv => "PASV".to_string(),
            FtpCommand::Size(path) => format!("SIZE {path}"),
            FtpCommand::Retr(path) => format!("RETR {path}"),
            FtpCommand::AuthTls => "AUTH TLS".to_string(),
            FtpCommand::Pbsz => "PBSZ 0".to_string(),
            FtpCommand::ProtPrivate => "PROT P".to_string(),
            FtpCommand::Quit => "QUIT".to_string(),
        }
    }
}

impl std::fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Never echo credentials into logs
            FtpCommand::Pass(_) => write!(f, "PASS [hidden]"),
            command => write!(f, "{}", command.to_ftp_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(FtpCommand::User("anna".to_string()).to_ftp_string(), "USER anna");
        assert_eq!(FtpCommand::TypeBinary.to_ftp_string(), "TYPE I");
        assert_eq!(FtpCommand::Size("a/s1.mp3".to_string()).to_ftp_string(), "SIZE a/s1.mp3");
        assert_eq!(FtpCommand::Pbsz.to_ftp_string(), "PBSZ 0");
        assert_eq!(FtpCommand::ProtPrivate.to_ftp_string(), "PROT P");
    }

    #[test]
    fn test_password_is_masked_in_display() {
        let display = format!("{}", FtpCommand::Pass("hunter2".to_string()));
        assert_eq!(display, "PASS [hidden]");
        assert!(!display.contains("hunter2"));
    }
}
