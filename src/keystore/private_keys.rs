//! Private key store: identity keys and bound/unbound session keys.

use async_trait::async_trait;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

use crate::error::{AwalaError, Result};
use crate::keys::{
    self, EcdhPrivateKey, IdentityKeyOptions, IdentityKeyPair,
};
use crate::keystore::BackendResult;

/// Stored session private-key record.
///
/// `peer_private_address` is `None` for unbound (initial) keys; that is the
/// single representation of absence, in memory and in serialized records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPrivateKeyData {
    pub key_serialized: Vec<u8>,
    pub private_address: String,
    pub peer_private_address: Option<String>,
}

/// Store for a node's own private keys.
#[async_trait]
pub trait PrivateKeyStore: Send + Sync {
    // ----- Backend primitives -----

    async fn save_identity_key_serialized(
        &self,
        private_address: &str,
        key_serialized: &[u8],
    ) -> BackendResult<()>;

    async fn retrieve_identity_key_serialized(
        &self,
        private_address: &str,
    ) -> BackendResult<Option<Vec<u8>>>;

    async fn save_session_key_data(
        &self,
        key_id_hex: &str,
        data: SessionPrivateKeyData,
    ) -> BackendResult<()>;

    async fn retrieve_session_key_data(
        &self,
        key_id_hex: &str,
    ) -> BackendResult<Option<SessionPrivateKeyData>>;

    // ----- Public operations -----

    /// Generate an RSA-PSS identity key pair and persist the private key
    /// under the derived private address.
    async fn generate_identity_key_pair(
        &self,
        options: IdentityKeyOptions,
    ) -> Result<IdentityKeyPair> {
        let pair = keys::generate_rsa_key_pair(&options)?;
        let key_serialized = keys::private_key_to_der(&pair.private_key)?;
        self.save_identity_key_serialized(&pair.private_address, &key_serialized)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to save key for {}: {e}",
                    pair.private_address
                ))
            })?;
        Ok(pair)
    }

    async fn retrieve_identity_key(&self, private_address: &str) -> Result<Option<RsaPrivateKey>> {
        let serialized = self
            .retrieve_identity_key_serialized(private_address)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to retrieve key for {private_address}: {e}"
                ))
            })?;
        serialized
            .map(|der| keys::private_key_from_der(&der))
            .transpose()
    }

    /// Persist a session private key, bound to `peer_private_address` when
    /// given and unbound (initial) otherwise.
    async fn save_session_key(
        &self,
        private_key: &EcdhPrivateKey,
        key_id: &[u8],
        private_address: &str,
        peer_private_address: Option<&str>,
    ) -> Result<()> {
        let key_id_hex = hex::encode(key_id);
        let data = SessionPrivateKeyData {
            key_serialized: private_key.to_der()?,
            private_address: private_address.to_string(),
            peer_private_address: peer_private_address.map(str::to_string),
        };
        self.save_session_key_data(&key_id_hex, data)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!("Failed to save key {key_id_hex}: {e}"))
            })
    }

    /// Retrieve an initial session key. Bound keys are treated as missing.
    async fn retrieve_unbound_session_key(
        &self,
        key_id: &[u8],
        private_address: &str,
    ) -> Result<EcdhPrivateKey> {
        let key_id_hex = hex::encode(key_id);
        let data = self
            .retrieve_session_key_record(&key_id_hex, private_address)
            .await?;
        if data.peer_private_address.is_some() {
            return Err(AwalaError::UnknownKey(format!(
                "Session key {key_id_hex} is bound"
            )));
        }
        EcdhPrivateKey::from_der(&data.key_serialized)
    }

    /// Retrieve a session key for the given peer: unbound keys and keys bound
    /// to that peer qualify.
    async fn retrieve_session_key(
        &self,
        key_id: &[u8],
        private_address: &str,
        peer_private_address: &str,
    ) -> Result<EcdhPrivateKey> {
        let key_id_hex = hex::encode(key_id);
        let data = self
            .retrieve_session_key_record(&key_id_hex, private_address)
            .await?;
        if let Some(bound_peer) = &data.peer_private_address {
            if bound_peer != peer_private_address {
                return Err(AwalaError::UnknownKey(format!(
                    "Session key {key_id_hex} is bound to another node ({bound_peer}, not {peer_private_address})"
                )));
            }
        }
        EcdhPrivateKey::from_der(&data.key_serialized)
    }

    /// Fetch a session key record, enforcing the ownership rule: records
    /// owned by a different node are treated as missing.
    async fn retrieve_session_key_record(
        &self,
        key_id_hex: &str,
        private_address: &str,
    ) -> Result<SessionPrivateKeyData> {
        let data = self
            .retrieve_session_key_data(key_id_hex)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!("Failed to retrieve key {key_id_hex}: {e}"))
            })?
            .ok_or_else(|| {
                AwalaError::UnknownKey(format!("Key {key_id_hex} does not exist"))
            })?;
        if data.private_address != private_address {
            return Err(AwalaError::UnknownKey(
                "Key is owned by a different node".to_string(),
            ));
        }
        Ok(data)
    }
}
