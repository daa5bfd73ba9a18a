//! PostgreSQL TLS support
//!
//! Maps libpq-style `sslmode`/`sslrootcert`/`sslcert`/`sslkey` connection
//! parameters onto a `native-tls` connector for tokio-postgres.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use native_tls::{Certificate, Identity, TlsConnector as NativeTlsConnector, TlsConnectorBuilder};
use postgres_native_tls::MakeTlsConnector;
use sqlcompat_core::ConnectionConfig;
use tracing::debug;

/// Error types for TLS setup
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Unknown sslmode '{0}' (expected disable, allow, prefer, require, verify-ca or verify-full)")]
    InvalidSslMode(String),

    #[error("Failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid CA certificate format: {0}")]
    InvalidCaCert(String),

    #[error("Failed to load client certificate from {path}: {source}")]
    ClientCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to load client key from {path}: {source}")]
    ClientKeyLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid client identity (cert + key): {0}")]
    InvalidClientIdentity(String),

    #[error("sslcert and sslkey must be given together")]
    IncompleteClientIdentity,

    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

/// libpq `sslmode` values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// Whether the server certificate chain is checked regardless of a root cert
    pub fn verifies_certificate(&self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }

    /// The closest mode tokio-postgres understands
    pub fn to_client_mode(self) -> tokio_postgres::config::SslMode {
        use tokio_postgres::config::SslMode as ClientMode;
        match self {
            SslMode::Disable => ClientMode::Disable,
            SslMode::Allow | SslMode::Prefer => ClientMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => ClientMode::Require,
        }
    }
}

impl FromStr for SslMode {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            _ => Err(TlsError::InvalidSslMode(s.to_string())),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS parameters taken from a connection configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub mode: SslMode,
    pub root_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

impl TlsSettings {
    /// Read `sslmode`, `sslrootcert`, `sslcert` and `sslkey` from `config`.
    ///
    /// Missing `sslmode` means `prefer`. Blank paths are ignored.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, TlsError> {
        let path = |key: &str| {
            config
                .params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        let mode = match config.params.get("sslmode") {
            Some(raw) => raw.parse()?,
            None => SslMode::default(),
        };

        let settings = Self {
            mode,
            root_cert: path("sslrootcert"),
            client_cert: path("sslcert"),
            client_key: path("sslkey"),
        };
        if settings.client_cert.is_some() != settings.client_key.is_some() {
            return Err(TlsError::IncompleteClientIdentity);
        }
        Ok(settings)
    }
}

/// Builds `MakeTlsConnector`s for tokio-postgres
#[derive(Debug, Clone)]
pub struct PostgresTlsConnector;

impl PostgresTlsConnector {
    /// Build a connector for `settings`.
    ///
    /// Returns `None` for `sslmode=disable`.
    pub fn build(settings: &TlsSettings) -> Result<Option<MakeTlsConnector>, TlsError> {
        if settings.mode == SslMode::Disable {
            return Ok(None);
        }

        debug!(mode = %settings.mode, "building PostgreSQL TLS connector");
        let mut builder = NativeTlsConnector::builder();
        configure_verification(&mut builder, settings);

        if let Some(path) = &settings.root_cert {
            apply_ca_cert(&mut builder, path)?;
        }
        if let (Some(cert), Some(key)) = (&settings.client_cert, &settings.client_key) {
            apply_client_cert(&mut builder, cert, key)?;
        }

        let connector = builder
            .build()
            .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;
        Ok(Some(MakeTlsConnector::new(connector)))
    }
}

/// libpq semantics: the weaker modes only verify when a root cert is given,
/// `verify-ca` skips the hostname check.
fn configure_verification(builder: &mut TlsConnectorBuilder, settings: &TlsSettings) {
    match settings.mode {
        SslMode::Disable => {}
        SslMode::Allow | SslMode::Prefer | SslMode::Require => {
            if settings.root_cert.is_none() {
                builder.danger_accept_invalid_certs(true);
            }
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyCa => {
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyFull => {}
    }
}

fn apply_ca_cert(builder: &mut TlsConnectorBuilder, path: &Path) -> Result<(), TlsError> {
    debug!(path = %path.display(), "loading CA certificate");

    let pem = fs::read(path).map_err(|source| TlsError::CaCertLoadFailed {
        path: path.display().to_string(),
        source,
    })?;
    let cert = Certificate::from_pem(&pem).map_err(|e| TlsError::InvalidCaCert(e.to_string()))?;
    builder.add_root_certificate(cert);
    Ok(())
}

fn apply_client_cert(
    builder: &mut TlsConnectorBuilder,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), TlsError> {
    debug!(
        cert_path = %cert_path.display(),
        key_path = %key_path.display(),
        "loading client certificate and key"
    );

    let cert_pem = fs::read(cert_path).map_err(|source| TlsError::ClientCertLoadFailed {
        path: cert_path.display().to_string(),
        source,
    })?;
    let key_pem = fs::read(key_path).map_err(|source| TlsError::ClientKeyLoadFailed {
        path: key_path.display().to_string(),
        source,
    })?;

    let identity = Identity::from_pkcs8(&cert_pem, &key_pem)
        .map_err(|e| TlsError::InvalidClientIdentity(e.to_string()))?;
    builder.identity(identity);
    Ok(())
}

#[cfg(test)]
mod tests;
