// src/config.rs
//! Service configuration.
//!
//! Values come from a JSON file (path given on the command line) layered with
//! `BOARDING_PASS__`-prefixed environment variables, e.g.
//! `BOARDING_PASS__SERVER_CONFIG__PORT=9090`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Root configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server_config: ServerConfig,
    pub credential_config: CredentialConfig,
    pub storage_config: StorageConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL the verifier should call back on. Derived from the
    /// inbound request headers when absent.
    #[serde(default)]
    pub next_session_url: Option<String>,
    /// Deadline for inbound requests and for each outbound verifier call.
    pub request_timeout_secs: u64,
}

/// Everything needed to talk to the verifier and build protocol payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    pub private_key_path: String,
    pub irma_server_url: String,
    pub requestor_id: String,
    pub scheme_manager: String,
    pub issuer_id: String,
    pub credential: String,
    pub attribute: String,
    pub boarding_pass_credential: String,
    /// When set, callback JWTs must verify against this RS256 public key.
    #[serde(default)]
    pub verifier_public_key_path: Option<String>,
}

impl CredentialConfig {
    /// Fully qualified identifier of the attribute that must be disclosed.
    pub fn expected_attribute(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.scheme_manager, self.issuer_id, self.credential, self.attribute
        )
    }
}

/// Token storage backend selection.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    #[serde(default)]
    pub redis_config: RedisConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StorageType {
    #[serde(rename = "inmemory")]
    InMemory,
    #[serde(rename = "redis")]
    Redis,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub namespace: String,
}

impl AppConfig {
    /// Loads the configuration file at `path` and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server_config.host", "127.0.0.1")?
            .set_default("server_config.port", 8080)?
            .set_default("server_config.request_timeout_secs", 15)?
            .set_default("credential_config.scheme_manager", "pbdf-staging")?
            .set_default(
                "credential_config.boarding_pass_credential",
                "irma-demo.demo-airline.boardingpass",
            )?
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("BOARDING_PASS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("boarding-pass-{}-{}.json", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_applies_defaults() {
        let path = write_config(
            "defaults",
            r#"{
                "server_config": {},
                "credential_config": {
                    "private_key_path": "./secrets/priv.pem",
                    "irma_server_url": "http://localhost:8088",
                    "requestor_id": "boarding-pass",
                    "issuer_id": "pbdf",
                    "credential": "passport",
                    "attribute": "documentNumber"
                },
                "storage_config": { "type": "inmemory" }
            }"#,
        );

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server_config.port, 8080);
        assert_eq!(config.server_config.request_timeout_secs, 15);
        assert_eq!(config.storage_config.storage_type, StorageType::InMemory);
        assert_eq!(
            config.credential_config.expected_attribute(),
            "pbdf-staging.pbdf.passport.documentNumber"
        );
        assert!(config.credential_config.verifier_public_key_path.is_none());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_redis_backend() {
        let path = write_config(
            "redis",
            r#"{
                "server_config": { "host": "0.0.0.0", "port": 9000 },
                "credential_config": {
                    "private_key_path": "k.pem",
                    "irma_server_url": "http://irma",
                    "requestor_id": "r",
                    "scheme_manager": "pbdf",
                    "issuer_id": "pbdf",
                    "credential": "passport",
                    "attribute": "documentNumber"
                },
                "storage_config": {
                    "type": "redis",
                    "redis_config": { "host": "redis", "port": 6379, "password": "pw", "namespace": "bp" }
                }
            }"#,
        );

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.storage_config.storage_type, StorageType::Redis);
        assert_eq!(config.storage_config.redis_config.namespace, "bp");
        assert_eq!(config.credential_config.expected_attribute(), "pbdf.pbdf.passport.documentNumber");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_unknown_storage_type_is_rejected() {
        let path = write_config(
            "unknown",
            r#"{
                "server_config": {},
                "credential_config": {
                    "private_key_path": "k.pem", "irma_server_url": "x", "requestor_id": "r",
                    "issuer_id": "i", "credential": "c", "attribute": "a"
                },
                "storage_config": { "type": "etcd" }
            }"#,
        );

        assert!(AppConfig::load(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_example_config_checks_callback_signatures() {
        let config = AppConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json")).unwrap();

        assert!(config.credential_config.verifier_public_key_path.is_some());
        assert_eq!(config.storage_config.storage_type, StorageType::Redis);
        assert_eq!(
            config.credential_config.expected_attribute(),
            "pbdf-staging.pbdf.passport.documentNumber"
        );
    }
}
