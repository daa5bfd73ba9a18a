use super::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

const NOT_A_CERT_PEM: &[u8] = b"-----BEGIN CERTIFICATE-----
bm90IGEgY2VydGlmaWNhdGU=
-----END CERTIFICATE-----
";

fn temp_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

fn config_with(params: &[(&str, &str)]) -> ConnectionConfig {
    params
        .iter()
        .fold(ConnectionConfig::new("postgres", "origin"), |config, (k, v)| {
            config.with_param(k, *v)
        })
}

#[rstest]
#[case("disable", SslMode::Disable)]
#[case("allow", SslMode::Allow)]
#[case("PREFER", SslMode::Prefer)]
#[case("require", SslMode::Require)]
#[case("verify_ca", SslMode::VerifyCa)]
#[case("verify-full", SslMode::VerifyFull)]
fn parses_sslmode(#[case] raw: &str, #[case] expected: SslMode) {
    assert_eq!(raw.parse::<SslMode>().unwrap(), expected);
}

#[test]
fn rejects_unknown_sslmode() {
    let err = "sometimes".parse::<SslMode>().unwrap_err();
    assert!(matches!(err, TlsError::InvalidSslMode(ref m) if m == "sometimes"));
}

#[test]
fn client_modes() {
    use tokio_postgres::config::SslMode as ClientMode;
    assert!(matches!(SslMode::Disable.to_client_mode(), ClientMode::Disable));
    assert!(matches!(SslMode::Allow.to_client_mode(), ClientMode::Prefer));
    assert!(matches!(SslMode::VerifyFull.to_client_mode(), ClientMode::Require));
    assert!(SslMode::VerifyCa.verifies_certificate());
    assert!(!SslMode::Require.verifies_certificate());
}

#[test]
fn settings_default_to_prefer() {
    let settings = TlsSettings::from_config(&ConnectionConfig::new("postgres", "origin")).unwrap();
    assert_eq!(settings, TlsSettings::default());
    assert_eq!(settings.mode, SslMode::Prefer);
}

#[test]
fn settings_read_paths_and_ignore_blanks() {
    let settings = TlsSettings::from_config(&config_with(&[
        ("sslmode", "verify-full"),
        ("sslrootcert", "/etc/ssl/ca.pem"),
        ("sslcert", " "),
        ("sslkey", ""),
    ]))
    .unwrap();

    assert_eq!(settings.mode, SslMode::VerifyFull);
    assert_eq!(settings.root_cert, Some(PathBuf::from("/etc/ssl/ca.pem")));
    assert_eq!(settings.client_cert, None);
}

#[test]
fn settings_require_cert_and_key_together() {
    let err = TlsSettings::from_config(&config_with(&[("sslcert", "/tmp/client.pem")])).unwrap_err();
    assert!(matches!(err, TlsError::IncompleteClientIdentity));
}

#[test]
fn disable_builds_no_connector() {
    let settings = TlsSettings {
        mode: SslMode::Disable,
        ..TlsSettings::default()
    };
    assert!(PostgresTlsConnector::build(&settings).unwrap().is_none());
}

#[test]
fn prefer_builds_connector() {
    assert!(PostgresTlsConnector::build(&TlsSettings::default())
        .unwrap()
        .is_some());
}

#[test]
fn missing_ca_file_is_reported() {
    let settings = TlsSettings {
        mode: SslMode::VerifyCa,
        root_cert: Some(PathBuf::from("/nonexistent/ca.pem")),
        ..TlsSettings::default()
    };
    let err = PostgresTlsConnector::build(&settings).err().unwrap();
    assert!(matches!(err, TlsError::CaCertLoadFailed { ref path, .. } if path == "/nonexistent/ca.pem"));
}

#[test]
fn invalid_ca_contents_are_reported() {
    let file = temp_file(NOT_A_CERT_PEM);
    let settings = TlsSettings {
        mode: SslMode::VerifyFull,
        root_cert: Some(file.path().to_path_buf()),
        ..TlsSettings::default()
    };
    let err = PostgresTlsConnector::build(&settings).err().unwrap();
    assert!(matches!(err, TlsError::InvalidCaCert(_)));
}
