use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::net::AsyncSocket;
use crate::options::SslMode;

/// A socket that may or may not have been upgraded to TLS mid-stream.
///
/// The handshake state machine (§4.4) decides whether to send an SSL request
/// based on the negotiated capabilities and the configured [`SslMode`]; this
/// type is what the rest of the protocol engine reads and writes afterwards,
/// so callers above the packet layer never need to know which branch they're
/// on.
pub enum MaybeTlsStream {
    Raw(Box<dyn AsyncSocket>),
    Tls(Box<TlsStream<Box<dyn AsyncSocket>>>),
}

impl MaybeTlsStream {
    pub fn raw(socket: Box<dyn AsyncSocket>) -> Self {
        MaybeTlsStream::Raw(socket)
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, MaybeTlsStream::Tls(_))
    }

    /// Performs a client-side TLS handshake over the existing socket and
    /// replaces it with the resulting TLS session. `accept_invalid_certs`
    /// corresponds to [`SslMode::Required`] (encrypt, don't verify), as
    /// opposed to [`SslMode::VerifyCa`]/[`SslMode::VerifyIdentity`].
    pub async fn upgrade(
        self,
        server_name: &str,
        mode: SslMode,
        root_store: rustls::RootCertStore,
    ) -> crate::Result<Self> {
        let raw = match self {
            MaybeTlsStream::Raw(raw) => raw,
            already @ MaybeTlsStream::Tls(_) => return Ok(already),
        };

        let mut config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        if matches!(mode, SslMode::Required) {
            config
                .dangerous()
                .set_certificate_verifier(Arc::new(danger::NoVerify));
        }

        let connector = TlsConnector::from(Arc::new(config));
        let name = rustls::pki_types::ServerName::try_from(server_name.to_owned())
            .map_err(|_| invalid_server_name(server_name))?;

        let stream = connector
            .connect(name, raw)
            .await
            .map_err(|e| crate::Error::transient_connection(format!("TLS handshake failed: {e}")))?;

        Ok(MaybeTlsStream::Tls(Box::new(stream)))
    }

    pub fn shutdown_now(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s.as_mut()).poll_shutdown_both(cx),
            MaybeTlsStream::Tls(s) => AsyncWrite::poll_shutdown(Pin::new(s.as_mut()), cx),
        }
    }
}

fn invalid_server_name(server_name: &str) -> crate::Error {
    crate::Error::configuration(format!("invalid server name for TLS: {server_name}"))
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Raw(s) => Pin::new(s.as_mut()).poll_flush(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shutdown_now(cx)
    }
}

/// Certificate verifier used only for [`SslMode::Required`], which asks for
/// an encrypted channel without authenticating the server's identity.
mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

    #[derive(Debug)]
    pub(super) struct NoVerify;

    impl ServerCertVerifier for NoVerify {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &rustls::DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &rustls::DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}
