//! Public key store: peers' identity keys and their latest session keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::error::{AwalaError, Result};
use crate::keys::{self, EcdhPublicKey};
use crate::keystore::BackendResult;
use crate::session::SessionKey;

/// Stored session public-key record for one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPublicKeyData {
    pub key_id: Vec<u8>,
    pub key_der: Vec<u8>,
    pub creation_time: DateTime<Utc>,
}

/// Store for peers' public keys, keyed by peer private address.
#[async_trait]
pub trait PublicKeyStore: Send + Sync {
    // ----- Backend primitives -----

    async fn save_identity_key_serialized(
        &self,
        peer_private_address: &str,
        key_serialized: &[u8],
    ) -> BackendResult<()>;

    async fn retrieve_identity_key_serialized(
        &self,
        peer_private_address: &str,
    ) -> BackendResult<Option<Vec<u8>>>;

    async fn save_session_key_data(
        &self,
        peer_private_address: &str,
        data: SessionPublicKeyData,
    ) -> BackendResult<()>;

    async fn retrieve_session_key_data(
        &self,
        peer_private_address: &str,
    ) -> BackendResult<Option<SessionPublicKeyData>>;

    // ----- Public operations -----

    /// Persist a peer identity key under its derived private address.
    async fn save_identity_key(&self, key: &RsaPublicKey) -> Result<()> {
        let peer_private_address = keys::derive_private_address(key)?;
        let key_serialized = keys::public_key_to_der(key)?;
        self.save_identity_key_serialized(&peer_private_address, &key_serialized)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to save identity key for {peer_private_address}: {e}"
                ))
            })
    }

    async fn retrieve_identity_key(
        &self,
        peer_private_address: &str,
    ) -> Result<Option<RsaPublicKey>> {
        let serialized = self
            .retrieve_identity_key_serialized(peer_private_address)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to retrieve identity key for {peer_private_address}: {e}"
                ))
            })?;
        serialized
            .map(|der| keys::public_key_from_der(&der))
            .transpose()
    }

    /// Persist a peer's session key. Saving is a no-op when a newer key is
    /// already stored (latest wins, monotonically).
    async fn save_session_key(
        &self,
        key: &SessionKey,
        peer_private_address: &str,
        creation_time: DateTime<Utc>,
    ) -> Result<()> {
        let existing = self
            .retrieve_session_key_data(peer_private_address)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to retrieve session key for {peer_private_address}: {e}"
                ))
            })?;
        if let Some(existing) = existing {
            if creation_time < existing.creation_time {
                debug!("Skipping stale session key for {peer_private_address}");
                return Ok(());
            }
        }
        let data = SessionPublicKeyData {
            key_id: key.key_id.clone(),
            key_der: key.public_key.to_der()?,
            creation_time,
        };
        self.save_session_key_data(peer_private_address, data)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to save session key for {peer_private_address}: {e}"
                ))
            })
    }

    /// The peer's most recently saved session key, if any.
    async fn retrieve_last_session_key(
        &self,
        peer_private_address: &str,
    ) -> Result<Option<SessionKey>> {
        let data = self
            .retrieve_session_key_data(peer_private_address)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to retrieve session key for {peer_private_address}: {e}"
                ))
            })?;
        data.map(|data| {
            Ok(SessionKey {
                key_id: data.key_id,
                public_key: EcdhPublicKey::from_der(&data.key_der)?,
            })
        })
        .transpose()
    }
}
