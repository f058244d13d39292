//! # Agent Configuration
//!
//! Read from `VERA_*` environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `VERA_HOSTNAME` | `localhost:8080` | public host for `did:web` and the DIDComm endpoint |
//! | `VERA_KEY_STORE` | `memory` | `memory` or `encrypted-file` |
//! | `VERA_KEY_DIR` | `./keys` | encrypted keys, plus identifier records under `identifiers/` |
//! | `VERA_MASTER_KEY` | (none) | 64 hex chars; required for `encrypted-file` |
//! | `VERA_RESOLVE_TIMEOUT_MS` | `10000` | per-resolution deadline |
//! | `VERA_SIGN_TIMEOUT_MS` | `5000` | per-signature deadline |
//! | `VERA_SYNC_INTERVAL_SECS` | `60` | period between sync passes |

use std::path::PathBuf;
use std::time::Duration;

use vera_core::{ConfigurationError, VeraError};
use vera_kms::MasterKey;

/// Where private keys live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreConfig {
    /// Process memory. Keys are lost on exit.
    Memory,
    /// Encrypted files under `dir`. Identifiers and their key bindings are
    /// kept alongside, so a restart keeps the same DIDs.
    EncryptedFile {
        /// Store directory.
        dir: PathBuf,
    },
}

/// Agent composition settings.
#[derive(Clone)]
pub struct AgentConfig {
    /// Public hostname, optionally with port.
    pub hostname: String,
    /// Private key backend.
    pub key_store: KeyStoreConfig,
    /// Key-encryption key for [`KeyStoreConfig::EncryptedFile`].
    pub master_key: Option<MasterKey>,
    /// Deadline for one DID resolution.
    pub resolve_timeout: Duration,
    /// Deadline for one signature.
    pub sign_timeout: Duration,
    /// Period between sync passes.
    pub sync_interval: Duration,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("hostname", &self.hostname)
            .field("key_store", &self.key_store)
            .field(
                "master_key",
                &self.master_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("resolve_timeout", &self.resolve_timeout)
            .field("sign_timeout", &self.sign_timeout)
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost:8080".to_string(),
            key_store: KeyStoreConfig::Memory,
            master_key: None,
            resolve_timeout: Duration::from_millis(10_000),
            sign_timeout: Duration::from_millis(5_000),
            sync_interval: Duration::from_secs(60),
        }
    }
}

impl AgentConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, VeraError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, VeraError> {
        let defaults = Self::default();

        let key_store = match lookup("VERA_KEY_STORE").as_deref() {
            None | Some("memory") => KeyStoreConfig::Memory,
            Some("encrypted-file") => KeyStoreConfig::EncryptedFile {
                dir: lookup("VERA_KEY_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./keys")),
            },
            Some(other) => {
                return Err(invalid(format!(
                    "VERA_KEY_STORE must be memory or encrypted-file, got {other}"
                )))
            }
        };

        let master_key = lookup("VERA_MASTER_KEY")
            .map(|hex| {
                MasterKey::from_hex(hex.trim())
                    .map_err(|e| invalid(format!("VERA_MASTER_KEY: {e}")))
            })
            .transpose()?;
        if matches!(key_store, KeyStoreConfig::EncryptedFile { .. }) && master_key.is_none() {
            return Err(invalid(
                "VERA_MASTER_KEY is required for the encrypted-file key store",
            ));
        }

        Ok(Self {
            hostname: lookup("VERA_HOSTNAME").unwrap_or(defaults.hostname),
            key_store,
            master_key,
            resolve_timeout: millis(&lookup, "VERA_RESOLVE_TIMEOUT_MS")?
                .unwrap_or(defaults.resolve_timeout),
            sign_timeout: millis(&lookup, "VERA_SIGN_TIMEOUT_MS")?
                .unwrap_or(defaults.sign_timeout),
            sync_interval: number(&lookup, "VERA_SYNC_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_interval),
        })
    }
}

fn invalid(message: impl Into<String>) -> VeraError {
    ConfigurationError::Invalid(message.into()).into()
}

fn number(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>, VeraError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) => Err(invalid(format!("{name} must be positive"))),
            Ok(n) => Ok(Some(n)),
            Err(e) => Err(invalid(format!("{name}: {e}"))),
        },
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<Duration>, VeraError> {
    Ok(number(lookup, name)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn defaults() {
        let cfg = AgentConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.hostname, "localhost:8080");
        assert_eq!(cfg.key_store, KeyStoreConfig::Memory);
        assert_eq!(cfg.sign_timeout, Duration::from_secs(5));
        assert_eq!(cfg.sync_interval, Duration::from_secs(60));
    }

    #[test]
    fn encrypted_store_needs_a_master_key() {
        let err = AgentConfig::from_lookup(env(&[("VERA_KEY_STORE", "encrypted-file")])).unwrap_err();
        assert_eq!(err.class(), vera_core::ErrorClass::Configuration);

        let cfg = AgentConfig::from_lookup(env(&[
            ("VERA_KEY_STORE", "encrypted-file"),
            ("VERA_KEY_DIR", "/var/lib/vera/keys"),
            ("VERA_MASTER_KEY", HEX_KEY),
        ]))
        .unwrap();
        assert_eq!(
            cfg.key_store,
            KeyStoreConfig::EncryptedFile {
                dir: PathBuf::from("/var/lib/vera/keys")
            }
        );
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        for pairs in [
            [("VERA_KEY_STORE", "vault")],
            [("VERA_SIGN_TIMEOUT_MS", "soon")],
            [("VERA_SYNC_INTERVAL_SECS", "0")],
            [("VERA_MASTER_KEY", "abcd")],
        ] {
            let err = AgentConfig::from_lookup(env(&pairs)).unwrap_err();
            assert_eq!(err.class(), vera_core::ErrorClass::Configuration, "{pairs:?}");
        }
    }

    #[test]
    fn debug_redacts_the_master_key() {
        let cfg = AgentConfig::from_lookup(env(&[("VERA_MASTER_KEY", HEX_KEY)])).unwrap();
        let shown = format!("{cfg:?}");
        assert!(shown.contains("[REDACTED]"));
        assert!(!shown.contains(HEX_KEY));
        assert!(!shown.contains("0001020304"));
    }
}
