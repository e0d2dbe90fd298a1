//! Typed certificate issuance and certification paths.
//!
//! Gateways are CAs that may delegate two levels down; endpoints are CAs so
//! they can issue delivery authorizations; delivery authorizations are leaf
//! certificates with a short lifetime and a renewal window.

use chrono::{DateTime, Duration, Utc};
use der::asn1::OctetString;
use der::{Decode, Encode, Sequence};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::certificate::{Certificate, IssuanceOptions};
use crate::error::{AwalaError, Result};
use crate::keys::{derive_private_address, HashAlgorithm};

/// How long a renewed channel delivery authorization remains valid.
pub const DELIVERY_AUTHORIZATION_VALIDITY_DAYS: i64 = 180;

/// Remaining validity below which a delivery authorization should be renewed.
pub const MIN_DELIVERY_AUTHORIZATION_REMAINING_DAYS: i64 = 90;

/// Common options for the typed issuance helpers.
pub struct PkiIssuanceOptions<'a> {
    pub subject_public_key: &'a RsaPublicKey,
    pub issuer_private_key: &'a RsaPrivateKey,
    pub validity_end: DateTime<Utc>,
    pub validity_start: Option<DateTime<Utc>>,
    /// Absent for self-signed certificates.
    pub issuer_certificate: Option<&'a Certificate>,
}

/// Issue a gateway certificate: a CA that can delegate two levels down.
pub fn issue_gateway_certificate(options: PkiIssuanceOptions<'_>) -> Result<Certificate> {
    issue(options, true, 2)
}

/// Issue an endpoint certificate: a CA so the endpoint can authorize senders.
pub fn issue_endpoint_certificate(options: PkiIssuanceOptions<'_>) -> Result<Certificate> {
    issue(options, true, 0)
}

/// Issue a parcel/cargo delivery authorization: a short-lived leaf
/// certificate for the authorized sender.
pub fn issue_delivery_authorization(options: PkiIssuanceOptions<'_>) -> Result<Certificate> {
    issue(options, false, 0)
}

fn issue(
    options: PkiIssuanceOptions<'_>,
    is_ca: bool,
    path_len_constraint: u8,
) -> Result<Certificate> {
    let common_name = derive_private_address(options.subject_public_key)?;
    Certificate::issue(IssuanceOptions {
        issuer_private_key: options.issuer_private_key,
        subject_public_key: options.subject_public_key,
        common_name,
        validity_start: options.validity_start,
        validity_end: options.validity_end,
        issuer_certificate: options.issuer_certificate,
        is_ca,
        path_len_constraint,
        hash: HashAlgorithm::default(),
    })
}

/// Whether a delivery authorization is within its renewal window.
pub fn delivery_authorization_needs_renewal(certificate: &Certificate) -> Result<bool> {
    let remaining = certificate.expiry_date()? - Utc::now();
    Ok(remaining < Duration::days(MIN_DELIVERY_AUTHORIZATION_REMAINING_DAYS))
}

/// A leaf certificate plus its authorities, ordered issuer outward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationPath {
    pub leaf_certificate: Certificate,
    pub certificate_authorities: Vec<Certificate>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct CertificationPathSchema {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    leaf: OctetString,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT")]
    authorities: Vec<OctetString>,
}

impl CertificationPath {
    pub fn new(
        leaf_certificate: Certificate,
        certificate_authorities: Vec<Certificate>,
    ) -> CertificationPath {
        CertificationPath {
            leaf_certificate,
            certificate_authorities,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let leaf = OctetString::new(self.leaf_certificate.serialize())
            .map_err(|e| AwalaError::InvalidMessage(format!("Failed to encode leaf: {e}")))?;
        let authorities = self
            .certificate_authorities
            .iter()
            .map(|authority| {
                OctetString::new(authority.serialize()).map_err(|e| {
                    AwalaError::InvalidMessage(format!("Failed to encode authority: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        CertificationPathSchema { leaf, authorities }
            .to_der()
            .map_err(|e| AwalaError::InvalidMessage(format!("Failed to encode path: {e}")))
    }

    pub fn deserialize(serialization: &[u8]) -> Result<CertificationPath> {
        let schema = CertificationPathSchema::from_der(serialization).map_err(|e| {
            AwalaError::InvalidMessage(format!(
                "Serialization is not a valid CertificationPath: {e}"
            ))
        })?;
        let leaf_certificate = Certificate::deserialize(schema.leaf.as_bytes())?;
        let certificate_authorities = schema
            .authorities
            .iter()
            .map(|authority| Certificate::deserialize(authority.as_bytes()))
            .collect::<Result<Vec<_>>>()?;
        Ok(CertificationPath {
            leaf_certificate,
            certificate_authorities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_rsa_key_pair, IdentityKeyOptions};

    fn key_pair() -> crate::keys::IdentityKeyPair {
        generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap()
    }

    #[test]
    fn gateway_certificates_can_delegate() {
        let gateway = key_pair();
        let certificate = issue_gateway_certificate(PkiIssuanceOptions {
            subject_public_key: &gateway.public_key,
            issuer_private_key: &gateway.private_key,
            validity_end: Utc::now() + Duration::days(365),
            validity_start: None,
            issuer_certificate: None,
        })
        .unwrap();
        assert!(certificate.is_ca().unwrap());
        assert_eq!(certificate.common_name().unwrap(), gateway.private_address);
    }

    #[test]
    fn endpoint_certificates_chain_under_gateways() {
        let gateway = key_pair();
        let gateway_certificate = issue_gateway_certificate(PkiIssuanceOptions {
            subject_public_key: &gateway.public_key,
            issuer_private_key: &gateway.private_key,
            validity_end: Utc::now() + Duration::days(365),
            validity_start: None,
            issuer_certificate: None,
        })
        .unwrap();

        let endpoint = key_pair();
        let endpoint_certificate = issue_endpoint_certificate(PkiIssuanceOptions {
            subject_public_key: &endpoint.public_key,
            issuer_private_key: &gateway.private_key,
            validity_end: Utc::now() + Duration::days(30),
            validity_start: None,
            issuer_certificate: Some(&gateway_certificate),
        })
        .unwrap();
        assert!(endpoint_certificate.is_ca().unwrap());
        assert!(endpoint_certificate
            .verify_issued_by(&gateway_certificate)
            .is_ok());
        assert!(
            endpoint_certificate.expiry_date().unwrap()
                <= gateway_certificate.expiry_date().unwrap()
        );
    }

    #[test]
    fn delivery_authorizations_are_not_cas() {
        let endpoint = key_pair();
        let endpoint_certificate = issue_endpoint_certificate(PkiIssuanceOptions {
            subject_public_key: &endpoint.public_key,
            issuer_private_key: &endpoint.private_key,
            validity_end: Utc::now() + Duration::days(365),
            validity_start: None,
            issuer_certificate: None,
        })
        .unwrap();

        let sender = key_pair();
        let authorization = issue_delivery_authorization(PkiIssuanceOptions {
            subject_public_key: &sender.public_key,
            issuer_private_key: &endpoint.private_key,
            validity_end: Utc::now() + Duration::days(DELIVERY_AUTHORIZATION_VALIDITY_DAYS),
            validity_start: None,
            issuer_certificate: Some(&endpoint_certificate),
        })
        .unwrap();
        assert!(!authorization.is_ca().unwrap());
    }

    #[test]
    fn renewal_window_is_ninety_days() {
        let pair = key_pair();
        let fresh = issue_delivery_authorization(PkiIssuanceOptions {
            subject_public_key: &pair.public_key,
            issuer_private_key: &pair.private_key,
            validity_end: Utc::now() + Duration::days(DELIVERY_AUTHORIZATION_VALIDITY_DAYS),
            validity_start: None,
            issuer_certificate: None,
        })
        .unwrap();
        assert!(!delivery_authorization_needs_renewal(&fresh).unwrap());

        let expiring = issue_delivery_authorization(PkiIssuanceOptions {
            subject_public_key: &pair.public_key,
            issuer_private_key: &pair.private_key,
            validity_end: Utc::now()
                + Duration::days(MIN_DELIVERY_AUTHORIZATION_REMAINING_DAYS - 1),
            validity_start: None,
            issuer_certificate: None,
        })
        .unwrap();
        assert!(delivery_authorization_needs_renewal(&expiring).unwrap());
    }

    #[test]
    fn certification_path_round_trips() {
        let root = key_pair();
        let root_certificate = issue_gateway_certificate(PkiIssuanceOptions {
            subject_public_key: &root.public_key,
            issuer_private_key: &root.private_key,
            validity_end: Utc::now() + Duration::days(365),
            validity_start: None,
            issuer_certificate: None,
        })
        .unwrap();
        let leaf = key_pair();
        let leaf_certificate = issue_endpoint_certificate(PkiIssuanceOptions {
            subject_public_key: &leaf.public_key,
            issuer_private_key: &root.private_key,
            validity_end: Utc::now() + Duration::days(30),
            validity_start: None,
            issuer_certificate: Some(&root_certificate),
        })
        .unwrap();

        let path = CertificationPath::new(leaf_certificate, vec![root_certificate]);
        let serialization = path.serialize().unwrap();
        assert_eq!(CertificationPath::deserialize(&serialization).unwrap(), path);
    }

    #[test]
    fn malformed_path_serialization_is_rejected() {
        assert!(matches!(
            CertificationPath::deserialize(b"bogus"),
            Err(AwalaError::InvalidMessage(_))
        ));
    }
}
