//! # Encrypted-at-rest Key Store
//!
//! One JSON file per key under a directory. The private half is sealed
//! with XChaCha20-Poly1305 under a 32-byte [`MasterKey`]; the key id is bound
//! in as associated data so a sealed blob cannot be replayed under another
//! id. Public material is stored in the clear so lookups never decrypt.
//!
//! Writes go to a hidden temp file in the same directory and are then
//! renamed into place. A cancelled or crashed write leaves at most a stray
//! temp file, never a truncated key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use serde::{Deserialize, Serialize};
use vera_crypto::ed25519::{bytes_to_hex, hex_to_bytes};
use vera_crypto::{CryptoError, Ed25519KeyPair, X25519KeyPair};
use zeroize::Zeroizing;

use crate::error::KmsError;
use crate::store::KeyStore;
use crate::types::{KeyId, KeyKind, KeyPair};

const SEALED_VERSION: u8 = 1;
const NONCE_LEN: usize = 24;

/// 32-byte key-encryption key. Zeroized on drop; never printed.
#[derive(Clone)]
pub struct MasterKey(Zeroizing<[u8; 32]>);

impl MasterKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex_to_bytes(hex.trim()).map_err(CryptoError::KeyError)?);
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::KeyError(format!("master key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_bytes(arr))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey(<redacted>)")
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedKey {
    version: u8,
    #[serde(flatten)]
    public: KeyPair,
    nonce: String,
    ciphertext: String,
}

/// Key store writing one sealed file per key.
pub struct EncryptedFileKeyStore {
    dir: PathBuf,
    cipher: XChaCha20Poly1305,
}

impl EncryptedFileKeyStore {
    /// Open (and create if needed) a key directory.
    pub async fn open(dir: impl Into<PathBuf>, master_key: &MasterKey) -> Result<Self, KmsError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| backend(format!("cannot create {}: {e}", dir.display())))?;
        let cipher = XChaCha20Poly1305::new_from_slice(master_key.0.as_slice())
            .map_err(|e| backend(format!("invalid master key: {e}")))?;
        tracing::info!(dir = %dir.display(), "encrypted key store opened");
        Ok(Self { dir, cipher })
    }

    /// The directory keys are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key_id: &KeyId) -> Result<PathBuf, KmsError> {
        let id = key_id.as_str();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KmsError::KeyNotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn read_sealed(&self, key_id: &KeyId) -> Result<Option<SealedKey>, KmsError> {
        let path = self.path_for(key_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(backend(format!("cannot read {}: {e}", path.display()))),
        };
        let sealed: SealedKey = serde_json::from_slice(&bytes)
            .map_err(|e| backend(format!("corrupt key file {}: {e}", path.display())))?;
        if sealed.version != SEALED_VERSION {
            return Err(backend(format!(
                "unsupported key file version {} in {}",
                sealed.version,
                path.display()
            )));
        }
        Ok(Some(sealed))
    }

    fn seal(&self, public: KeyPair, secret: &[u8; 32]) -> Result<SealedKey, KmsError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: secret,
                    aad: public.key_id.as_str().as_bytes(),
                },
            )
            .map_err(|_| backend("encryption failed".to_string()))?;
        Ok(SealedKey {
            version: SEALED_VERSION,
            public,
            nonce: bytes_to_hex(&nonce),
            ciphertext: bytes_to_hex(&ciphertext),
        })
    }

    fn unseal(&self, sealed: &SealedKey) -> Result<Zeroizing<[u8; 32]>, KmsError> {
        let nonce = hex_to_bytes(&sealed.nonce).map_err(backend)?;
        if nonce.len() != NONCE_LEN {
            return Err(backend(format!("nonce must be {NONCE_LEN} bytes")));
        }
        let ciphertext = hex_to_bytes(&sealed.ciphertext).map_err(backend)?;
        let plain = Zeroizing::new(
            self.cipher
                .decrypt(
                    XNonce::from_slice(&nonce),
                    Payload {
                        msg: &ciphertext,
                        aad: sealed.public.key_id.as_str().as_bytes(),
                    },
                )
                .map_err(|_| backend(format!("cannot unseal key {}", sealed.public.key_id)))?,
        );
        let mut out = Zeroizing::new([0u8; 32]);
        if plain.len() != out.len() {
            return Err(backend("sealed secret has wrong length".to_string()));
        }
        out.copy_from_slice(&plain);
        Ok(out)
    }

    async fn write_atomic(&self, sealed: &SealedKey) -> Result<(), KmsError> {
        let path = self.path_for(&sealed.public.key_id)?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", sealed.public.key_id, uuid::Uuid::new_v4()));
        let body = serde_json::to_vec_pretty(sealed)
            .map_err(|e| backend(format!("cannot encode key file: {e}")))?;
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| backend(format!("cannot write {}: {e}", tmp.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| backend(format!("cannot restrict {}: {e}", tmp.display())))?;
        }
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| backend(format!("cannot commit {}: {e}", path.display())))
    }
}

impl std::fmt::Debug for EncryptedFileKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileKeyStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

fn backend(reason: String) -> KmsError {
    KmsError::Backend {
        store: "encrypted-file".to_string(),
        reason,
    }
}

#[async_trait]
impl KeyStore for EncryptedFileKeyStore {
    fn name(&self) -> &str {
        "encrypted-file"
    }

    async fn generate(&self, kind: KeyKind) -> Result<KeyPair, KmsError> {
        let sealed = match kind {
            KeyKind::Ed25519 => {
                let kp = Ed25519KeyPair::generate();
                let public = KeyPair::new(kind, kp.public_key().as_bytes(), self.name());
                self.seal(public, &kp.seed())?
            }
            KeyKind::X25519 => {
                let kp = X25519KeyPair::generate();
                let public = KeyPair::new(kind, kp.public_key().as_bytes(), self.name());
                self.seal(public, &kp.secret_bytes())?
            }
        };
        self.write_atomic(&sealed).await?;
        tracing::debug!(key_id = %sealed.public.key_id, %kind, "key sealed to disk");
        Ok(sealed.public)
    }

    async fn get(&self, key_id: &KeyId) -> Result<Option<KeyPair>, KmsError> {
        if self.path_for(key_id).is_err() {
            return Ok(None);
        }
        Ok(self.read_sealed(key_id).await?.map(|s| s.public))
    }

    async fn sign(&self, key_id: &KeyId, payload: &[u8]) -> Result<Vec<u8>, KmsError> {
        let sealed = self
            .read_sealed(key_id)
            .await?
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))?;
        if !sealed.public.kind.can_sign() {
            return Err(KmsError::NotSigningKey(key_id.to_string()));
        }
        let seed = self.unseal(&sealed)?;
        let kp = Ed25519KeyPair::from_seed(&seed);
        Ok(kp.sign(payload).as_bytes().to_vec())
    }

    async fn list(&self) -> Result<Vec<KeyPair>, KmsError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| backend(format!("cannot list {}: {e}", self.dir.display())))?;
        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| backend(e.to_string()))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Some(sealed) = self.read_sealed(&KeyId::new(stem)).await? {
                keys.push(sealed.public);
            }
        }
        keys.sort_by(|a, b| a.key_id.cmp(&b.key_id));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vera_crypto::{verify_with_public_key, Ed25519PublicKey, Ed25519Signature};

    fn master() -> MasterKey {
        MasterKey::from_bytes([9u8; 32])
    }

    #[tokio::test]
    async fn keys_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let kp = {
            let store = EncryptedFileKeyStore::open(dir.path(), &master()).await.unwrap();
            store.generate(KeyKind::Ed25519).await.unwrap()
        };

        let store = EncryptedFileKeyStore::open(dir.path(), &master()).await.unwrap();
        let found = store.get(&kp.key_id).await.unwrap().unwrap();
        assert_eq!(found, kp);

        let sig = store.sign(&kp.key_id, b"hello").await.unwrap();
        let pk = Ed25519PublicKey::from_hex(&kp.public_key.public_key_hex).unwrap();
        verify_with_public_key(b"hello", &Ed25519Signature::from_slice(&sig).unwrap(), &pk).unwrap();
    }

    #[tokio::test]
    async fn private_material_is_not_on_disk_in_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileKeyStore::open(dir.path(), &master()).await.unwrap();
        let kp = store.generate(KeyKind::Ed25519).await.unwrap();
        let body = std::fs::read_to_string(dir.path().join(format!("{}.json", kp.key_id))).unwrap();
        let v: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["keyId"], kp.key_id.as_str());
        // 32-byte secret + 16-byte tag
        assert_eq!(v["ciphertext"].as_str().unwrap().len(), 96);
    }

    #[tokio::test]
    async fn wrong_master_key_fails_to_sign() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileKeyStore::open(dir.path(), &master()).await.unwrap();
        let kp = store.generate(KeyKind::Ed25519).await.unwrap();

        let other = EncryptedFileKeyStore::open(dir.path(), &MasterKey::from_bytes([1u8; 32]))
            .await
            .unwrap();
        assert!(matches!(
            other.sign(&kp.key_id, b"x").await,
            Err(KmsError::Backend { .. })
        ));
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileKeyStore::open(dir.path(), &master()).await.unwrap();
        store.generate(KeyKind::Ed25519).await.unwrap();
        store.generate(KeyKind::X25519).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(".json") && !n.starts_with('.')));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn path_traversal_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileKeyStore::open(dir.path(), &master()).await.unwrap();
        assert!(store.get(&KeyId::new("../etc/passwd")).await.unwrap().is_none());
        assert!(matches!(
            store.sign(&KeyId::new("../x"), b"x").await,
            Err(KmsError::KeyNotFound(_))
        ));
    }

    #[test]
    fn master_key_debug_is_redacted() {
        let mk = MasterKey::from_hex(&"ab".repeat(32)).unwrap();
        assert_eq!(format!("{mk:?}"), "MasterKey(<redacted>)");
        assert!(MasterKey::from_hex("abcd").is_err());
    }
}
