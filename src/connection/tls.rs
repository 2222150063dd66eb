//! TLS client configuration for FTPS channels

use std::net::TcpStream;
use std::sync::Arc;

use log::warn;
use once_cell::sync::Lazy;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme, StreamOwned};
use rustls_platform_verifier::BuilderVerifierExt;

use crate::error::{Result, TuneSyncError};

static PROVIDER: Lazy<Arc<CryptoProvider>> =
    Lazy::new(|| Arc::new(rustls::crypto::ring::default_provider()));

/// Build the rustls client config for the configured trust policy.
///
/// Default: certificates validated by the platform verifier. With
/// `accept_any_certificate` every server certificate is accepted, which
/// matches servers running self-signed certificates but permits
/// man-in-the-middle interception.
pub fn client_config(accept_any_certificate: bool) -> Result<Arc<ClientConfig>> {
    let provider = PROVIDER.clone();
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| TuneSyncError::TlsHandshakeFailed(format!("protocol setup: {}", e)))?;

    let config = if accept_any_certificate {
        warn!("TLS certificate validation disabled by configuration");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
            .with_no_client_auth()
    } else {
        builder
            .with_platform_verifier()
            .with_no_client_auth()
    };

    Ok(Arc::new(config))
}

/// Wrap a connected socket in TLS, completing the handshake eagerly so
/// failures surface here instead of on the first protocol read.
pub fn wrap_stream(
    mut sock: TcpStream,
    config: Arc<ClientConfig>,
    host: &str,
) -> Result<StreamOwned<ClientConnection, TcpStream>> {
    let server_name = ServerName::try_from(host.to_string()).map_err(|_| {
        TuneSyncError::InvalidHost(format!("'{}' is not a valid TLS server name", host))
    })?;

    let mut conn = ClientConnection::new(config, server_name)
        .map_err(|e| TuneSyncError::TlsHandshakeFailed(e.to_string()))?;

    while conn.is_handshaking() {
        conn.complete_io(&mut sock).map_err(|e| {
            TuneSyncError::TlsHandshakeFailed(format!("handshake with {}: {}", host, e))
        })?;
    }

    Ok(StreamOwned::new(conn, sock))
}

/// Verifier that accepts every server certificate.
///
/// Signatures are still checked against the presented certificate, only
/// the chain-of-trust and hostname checks are skipped.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
