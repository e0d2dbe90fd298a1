//! In-memory store implementations for tests and examples.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::keystore::certificates::{CertificateData, CertificateStore};
use crate::keystore::private_keys::{PrivateKeyStore, SessionPrivateKeyData};
use crate::keystore::public_keys::{PublicKeyStore, SessionPublicKeyData};
use crate::keystore::BackendResult;

/// In-memory [`PrivateKeyStore`].
#[derive(Default)]
pub struct MockPrivateKeyStore {
    identity_keys: RwLock<HashMap<String, Vec<u8>>>,
    session_keys: RwLock<HashMap<String, SessionPrivateKeyData>>,
}

impl MockPrivateKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrivateKeyStore for MockPrivateKeyStore {
    async fn save_identity_key_serialized(
        &self,
        private_address: &str,
        key_serialized: &[u8],
    ) -> BackendResult<()> {
        self.identity_keys
            .write()
            .await
            .insert(private_address.to_string(), key_serialized.to_vec());
        Ok(())
    }

    async fn retrieve_identity_key_serialized(
        &self,
        private_address: &str,
    ) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.identity_keys.read().await.get(private_address).cloned())
    }

    async fn save_session_key_data(
        &self,
        key_id_hex: &str,
        data: SessionPrivateKeyData,
    ) -> BackendResult<()> {
        self.session_keys
            .write()
            .await
            .insert(key_id_hex.to_string(), data);
        Ok(())
    }

    async fn retrieve_session_key_data(
        &self,
        key_id_hex: &str,
    ) -> BackendResult<Option<SessionPrivateKeyData>> {
        Ok(self.session_keys.read().await.get(key_id_hex).cloned())
    }
}

/// In-memory [`PublicKeyStore`].
#[derive(Default)]
pub struct MockPublicKeyStore {
    identity_keys: RwLock<HashMap<String, Vec<u8>>>,
    session_keys: RwLock<HashMap<String, SessionPublicKeyData>>,
}

impl MockPublicKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublicKeyStore for MockPublicKeyStore {
    async fn save_identity_key_serialized(
        &self,
        peer_private_address: &str,
        key_serialized: &[u8],
    ) -> BackendResult<()> {
        self.identity_keys
            .write()
            .await
            .insert(peer_private_address.to_string(), key_serialized.to_vec());
        Ok(())
    }

    async fn retrieve_identity_key_serialized(
        &self,
        peer_private_address: &str,
    ) -> BackendResult<Option<Vec<u8>>> {
        Ok(self
            .identity_keys
            .read()
            .await
            .get(peer_private_address)
            .cloned())
    }

    async fn save_session_key_data(
        &self,
        peer_private_address: &str,
        data: SessionPublicKeyData,
    ) -> BackendResult<()> {
        self.session_keys
            .write()
            .await
            .insert(peer_private_address.to_string(), data);
        Ok(())
    }

    async fn retrieve_session_key_data(
        &self,
        peer_private_address: &str,
    ) -> BackendResult<Option<SessionPublicKeyData>> {
        Ok(self
            .session_keys
            .read()
            .await
            .get(peer_private_address)
            .cloned())
    }
}

/// In-memory [`CertificateStore`].
#[derive(Default)]
pub struct MockCertificateStore {
    records: RwLock<HashMap<(String, String), Vec<CertificateData>>>,
}

impl MockCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CertificateStore for MockCertificateStore {
    async fn save_data(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
        data: CertificateData,
    ) -> BackendResult<()> {
        self.records
            .write()
            .await
            .entry((
                subject_private_address.to_string(),
                issuer_private_address.to_string(),
            ))
            .or_default()
            .push(data);
        Ok(())
    }

    async fn retrieve_all_data(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
    ) -> BackendResult<Vec<CertificateData>> {
        Ok(self
            .records
            .read()
            .await
            .get(&(
                subject_private_address.to_string(),
                issuer_private_address.to_string(),
            ))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_expired_data(&self) -> BackendResult<()> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        for entries in records.values_mut() {
            entries.retain(|data| now < data.expiry_date);
        }
        records.retain(|_, entries| !entries.is_empty());
        Ok(())
    }
}
