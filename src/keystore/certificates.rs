//! Certificate store: certification paths with expiry-driven lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AwalaError, Result};
use crate::keystore::BackendResult;
use crate::pki::CertificationPath;

/// Stored certification-path record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateData {
    pub serialization: Vec<u8>,
    pub expiry_date: DateTime<Utc>,
}

/// Store for certification paths, keyed by subject and issuer private
/// addresses.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    // ----- Backend primitives -----

    async fn save_data(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
        data: CertificateData,
    ) -> BackendResult<()>;

    async fn retrieve_all_data(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
    ) -> BackendResult<Vec<CertificateData>>;

    async fn delete_expired_data(&self) -> BackendResult<()>;

    // ----- Public operations -----

    /// Persist a certification path under its leaf's subject, unless the leaf
    /// is already expired.
    async fn save(&self, path: &CertificationPath, issuer_private_address: &str) -> Result<()> {
        let leaf = &path.leaf_certificate;
        let expiry_date = leaf.expiry_date()?;
        if expiry_date <= Utc::now() {
            debug!("Skipping save of expired certificate (expired {expiry_date})");
            return Ok(());
        }
        let subject_private_address = leaf.calculate_subject_private_address()?;
        let data = CertificateData {
            serialization: path.serialize()?,
            expiry_date,
        };
        self.save_data(&subject_private_address, issuer_private_address, data)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to save certificate for {subject_private_address}: {e}"
                ))
            })
    }

    /// The non-expired path with the greatest expiry date, or `None`.
    async fn retrieve_latest(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
    ) -> Result<Option<CertificationPath>> {
        let latest = self
            .retrieve_fresh_data(subject_private_address, issuer_private_address)
            .await?
            .into_iter()
            .max_by_key(|data| data.expiry_date);
        latest
            .map(|data| CertificationPath::deserialize(&data.serialization))
            .transpose()
    }

    /// Every non-expired path for the subject/issuer tuple, unordered.
    async fn retrieve_all(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
    ) -> Result<Vec<CertificationPath>> {
        self.retrieve_fresh_data(subject_private_address, issuer_private_address)
            .await?
            .into_iter()
            .map(|data| CertificationPath::deserialize(&data.serialization))
            .collect()
    }

    /// Best-effort purge of expired records.
    async fn delete_expired(&self) -> Result<()> {
        self.delete_expired_data()
            .await
            .map_err(|e| AwalaError::KeyStore(format!("Failed to delete expired certificates: {e}")))
    }

    async fn retrieve_fresh_data(
        &self,
        subject_private_address: &str,
        issuer_private_address: &str,
    ) -> Result<Vec<CertificateData>> {
        let now = Utc::now();
        let records = self
            .retrieve_all_data(subject_private_address, issuer_private_address)
            .await
            .map_err(|e| {
                AwalaError::KeyStore(format!(
                    "Failed to retrieve certificates for {subject_private_address}: {e}"
                ))
            })?;
        Ok(records
            .into_iter()
            .filter(|data| now < data.expiry_date)
            .collect())
    }
}
