use rumqttc::tokio_rustls::rustls::{ClientConfig, RootCertStore};
use std::io::BufReader;
use tracksim_domain::{CredentialMaterial, DomainError, DomainResult};

/// Build the mutual-TLS client configuration for one device.
///
/// The client side presents the device certificate and key from the secret
/// store; server trust comes from the bundled web PKI roots, which the
/// broker's certificate chains to.
pub fn build_tls_config(credentials: &CredentialMaterial) -> DomainResult<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut cert_reader = BufReader::new(credentials.certificate.as_bytes());
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DomainError::Connection(format!("invalid client certificate: {e}")))?;
    if certs.is_empty() {
        return Err(DomainError::Connection(
            "client certificate PEM contained no certificates".to_string(),
        ));
    }

    let mut key_reader = BufReader::new(credentials.private_key.as_bytes());
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| DomainError::Connection(format!("invalid private key: {e}")))?
        .ok_or_else(|| {
            DomainError::Connection("private key PEM contained no key".to_string())
        })?;

    ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| DomainError::Connection(format!("TLS configuration rejected: {e}")))
}
