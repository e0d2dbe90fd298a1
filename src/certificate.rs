//! X.509 certificate issuance, validation and chain walking.
//!
//! Certificates are value objects wrapping a parsed `x509_cert::Certificate`
//! together with the canonical DER they were built from. Subject DNs carry a
//! single BMPString CommonName holding the node's private or public address.

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use der::asn1::{BitString, BmpString, OctetString, PrintableStringRef, UtcTime, Utf8StringRef};
use der::{Any, Decode, Encode, Tag, Tagged};
use rand::RngCore;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::{AuthorityKeyIdentifier, BasicConstraints, SubjectKeyIdentifier};
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate as X509CertificateInner, TbsCertificate, Version};

use crate::error::{AwalaError, Result};
use crate::keys::{self, HashAlgorithm};
use crate::oids;
use crate::pss;

pub const MAX_PATH_LENGTH_CONSTRAINT: u8 = 2;

/// Options for issuing a certificate.
pub struct IssuanceOptions<'a> {
    pub issuer_private_key: &'a RsaPrivateKey,
    pub subject_public_key: &'a RsaPublicKey,
    pub common_name: String,
    /// Defaults to the current time, truncated to whole seconds.
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: DateTime<Utc>,
    /// Absent for self-signed certificates.
    pub issuer_certificate: Option<&'a Certificate>,
    pub is_ca: bool,
    pub path_len_constraint: u8,
    pub hash: HashAlgorithm,
}

/// X.509 v3 certificate wrapper.
#[derive(Debug, Clone)]
pub struct Certificate {
    certificate: X509CertificateInner,
    der: Vec<u8>,
    private_address_cache: OnceLock<String>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Issue a new certificate.
    ///
    /// When an issuer certificate is supplied, the validity end is clamped to
    /// the issuer's and the issuer must be a CA; the issuer DN becomes this
    /// certificate's issuer DN.
    pub fn issue(options: IssuanceOptions<'_>) -> Result<Certificate> {
        if MAX_PATH_LENGTH_CONSTRAINT < options.path_len_constraint {
            return Err(AwalaError::Certificate(format!(
                "Path length constraint must be at most {MAX_PATH_LENGTH_CONSTRAINT} ({} given)",
                options.path_len_constraint
            )));
        }

        let start = truncate_to_seconds(options.validity_start.unwrap_or_else(Utc::now));
        let mut end = truncate_to_seconds(options.validity_end);
        if let Some(issuer) = options.issuer_certificate {
            end = end.min(issuer.expiry_date()?);
        }
        if end < start {
            return Err(AwalaError::Certificate(format!(
                "The end date must be later than the start date ({end} vs {start})"
            )));
        }
        if let Some(issuer) = options.issuer_certificate {
            if !issuer.is_ca()? {
                return Err(AwalaError::Certificate(
                    "Issuer is not a certification authority".to_string(),
                ));
            }
        }

        let subject = common_name_dn(&options.common_name)?;
        let issuer_dn = match options.issuer_certificate {
            Some(issuer) => issuer.certificate.tbs_certificate.subject.clone(),
            None => subject.clone(),
        };

        let subject_spki_der = keys::public_key_to_der(options.subject_public_key)?;
        let subject_spki = SubjectPublicKeyInfoOwned::from_der(&subject_spki_der)
            .map_err(|e| AwalaError::Certificate(format!("Failed to decode subject SPKI: {e}")))?;
        let issuer_spki_der = match options.issuer_certificate {
            Some(issuer) => issuer.subject_public_key_der()?,
            None => subject_spki_der.clone(),
        };

        let extensions = vec![
            basic_constraints_extension(options.is_ca, options.path_len_constraint)?,
            authority_key_identifier_extension(&issuer_spki_der)?,
            subject_key_identifier_extension(&subject_spki_der)?,
        ];

        let signature_algorithm = pss::algorithm_identifier(options.hash)?;
        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: generate_serial_number()?,
            signature: signature_algorithm.clone(),
            issuer: issuer_dn,
            validity: Validity {
                not_before: to_der_time(start)?,
                not_after: to_der_time(end)?,
            },
            subject,
            subject_public_key_info: subject_spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        };

        let tbs_der = tbs
            .to_der()
            .map_err(|e| AwalaError::Certificate(format!("Failed to encode TBS: {e}")))?;
        let signature = pss::sign(options.issuer_private_key, options.hash, &tbs_der)?;

        let certificate = X509CertificateInner {
            tbs_certificate: tbs,
            signature_algorithm,
            signature: BitString::from_bytes(&signature).map_err(|e| {
                AwalaError::Certificate(format!("Failed to encode signature: {e}"))
            })?,
        };
        let der = certificate
            .to_der()
            .map_err(|e| AwalaError::Certificate(format!("Failed to encode certificate: {e}")))?;
        Ok(Certificate {
            certificate,
            der,
            private_address_cache: OnceLock::new(),
        })
    }

    /// Parse a certificate from DER.
    pub fn deserialize(der_bytes: &[u8]) -> Result<Certificate> {
        let certificate = X509CertificateInner::from_der(der_bytes)
            .map_err(|e| AwalaError::Certificate(format!("Failed to parse certificate: {e}")))?;
        Ok(Certificate {
            certificate,
            der: der_bytes.to_vec(),
            private_address_cache: OnceLock::new(),
        })
    }

    /// The certificate's canonical DER.
    pub fn serialize(&self) -> &[u8] {
        &self.der
    }

    pub fn start_date(&self) -> Result<DateTime<Utc>> {
        from_der_time(&self.certificate.tbs_certificate.validity.not_before)
    }

    pub fn expiry_date(&self) -> Result<DateTime<Utc>> {
        from_der_time(&self.certificate.tbs_certificate.validity.not_after)
    }

    /// Serial number content octets, big endian.
    pub fn serial_number(&self) -> Vec<u8> {
        self.certificate
            .tbs_certificate
            .serial_number
            .as_bytes()
            .to_vec()
    }

    /// The single CommonName in the subject DN.
    pub fn common_name(&self) -> Result<String> {
        dn_common_name(&self.certificate.tbs_certificate.subject)
            .ok_or_else(|| AwalaError::Certificate("Subject DN has no CommonName".to_string()))
    }

    /// SPKI DER of the subject public key.
    pub fn subject_public_key_der(&self) -> Result<Vec<u8>> {
        self.certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| AwalaError::Certificate(format!("Failed to encode subject SPKI: {e}")))
    }

    /// The subject public key as an RSA key.
    pub fn subject_rsa_public_key(&self) -> Result<RsaPublicKey> {
        keys::public_key_from_der(&self.subject_public_key_der()?)
            .map_err(|e| AwalaError::Certificate(format!("Invalid subject public key: {e}")))
    }

    /// Derive the subject's private address. Memoized: the value is a pure
    /// function of the immutable subject public key.
    pub fn calculate_subject_private_address(&self) -> Result<String> {
        if let Some(cached) = self.private_address_cache.get() {
            return Ok(cached.clone());
        }
        let spki_der = self.subject_public_key_der()?;
        let address = format!("0{}", hex::encode(Sha256::digest(&spki_der)));
        Ok(self
            .private_address_cache
            .get_or_init(|| address)
            .clone())
    }

    /// The issuer's private address, recovered from the AuthorityKeyIdentifier
    /// key id, or `None` when the extension is absent.
    pub fn issuer_private_address(&self) -> Result<Option<String>> {
        let Some(extension) = self.find_extension(&oids::ID_AUTHORITY_KEY_IDENTIFIER) else {
            return Ok(None);
        };
        let aki = AuthorityKeyIdentifier::from_der(extension.extn_value.as_bytes())
            .map_err(|e| AwalaError::Certificate(format!("Malformed AKI extension: {e}")))?;
        Ok(aki
            .key_identifier
            .map(|key_id| format!("0{}", hex::encode(key_id.as_bytes()))))
    }

    /// Whether the certificate may act as a certification authority.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .basic_constraints()?
            .map(|bc| bc.ca)
            .unwrap_or(false))
    }

    pub(crate) fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        let Some(extension) = self.find_extension(&oids::ID_BASIC_CONSTRAINTS) else {
            return Ok(None);
        };
        BasicConstraints::from_der(extension.extn_value.as_bytes())
            .map(Some)
            .map_err(|e| AwalaError::Certificate(format!("Malformed BasicConstraints: {e}")))
    }

    /// Enforce X.509 v3 and the validity window against the current time.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now())
    }

    pub(crate) fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        if self.certificate.tbs_certificate.version != Version::V3 {
            return Err(AwalaError::Certificate(
                "Only X.509 v3 certificates are supported".to_string(),
            ));
        }
        if now < self.start_date()? {
            return Err(AwalaError::Certificate(
                "Certificate is not yet valid".to_string(),
            ));
        }
        if self.expiry_date()? < now {
            return Err(AwalaError::Certificate("Certificate already expired".to_string()));
        }
        Ok(())
    }

    /// Whether this certificate names `candidate`'s subject as its issuer.
    pub(crate) fn names_as_issuer(&self, candidate: &Certificate) -> bool {
        let issuer = self.certificate.tbs_certificate.issuer.to_der();
        let subject = candidate.certificate.tbs_certificate.subject.to_der();
        matches!((issuer, subject), (Ok(i), Ok(s)) if i == s)
    }

    /// Verify this certificate's signature against the candidate issuer's key.
    pub(crate) fn verify_issued_by(&self, issuer: &Certificate) -> Result<()> {
        let hash = pss::hash_from_algorithm(&self.certificate.signature_algorithm)
            .map_err(|e| AwalaError::Certificate(e.to_string()))?;
        let tbs_der = self
            .certificate
            .tbs_certificate
            .to_der()
            .map_err(|e| AwalaError::Certificate(format!("Failed to encode TBS: {e}")))?;
        let signature = self
            .certificate
            .signature
            .as_bytes()
            .ok_or_else(|| AwalaError::Certificate("Malformed signature bit string".to_string()))?;
        pss::verify(&issuer.subject_rsa_public_key()?, hash, &tbs_der, signature)
            .map_err(|e| AwalaError::Certificate(format!("Issuer signature check failed: {e}")))
    }

    /// Compute the certification path from this certificate to one of the
    /// trusted certificates, ordered leaf first.
    ///
    /// Intermediates that issued any of the trusted certificates are ignored.
    pub fn certification_path(
        &self,
        intermediates: &[Certificate],
        trusted: &[Certificate],
    ) -> Result<Vec<Certificate>> {
        let usable: Vec<&Certificate> = intermediates
            .iter()
            .filter(|candidate| !trusted.iter().any(|t| t.names_as_issuer(candidate)))
            .collect();

        self.validate()?;
        let mut path = vec![self.clone()];
        let mut current = self.clone();
        // Bounded walk; cycles cannot extend past the candidate count.
        for _ in 0..=(usable.len() + trusted.len()) {
            if let Some(root) = trusted.iter().find(|t| *t == &current) {
                debug_assert_eq!(path.last(), Some(root));
                return Ok(path);
            }
            let issuer = trusted
                .iter()
                .chain(usable.iter().copied())
                .find(|candidate| {
                    current.names_as_issuer(candidate)
                        && candidate.validate().is_ok()
                        && current.verify_issued_by(candidate).is_ok()
                });
            match issuer {
                Some(issuer) if trusted.contains(issuer) => {
                    path.push(issuer.clone());
                    return Ok(path);
                }
                Some(issuer) => {
                    path.push(issuer.clone());
                    current = issuer.clone();
                }
                None => break,
            }
        }
        Err(AwalaError::Certificate(
            "No certification path to a trusted certificate".to_string(),
        ))
    }

    pub(crate) fn as_x509(&self) -> &X509CertificateInner {
        &self.certificate
    }

    pub(crate) fn issuer_name(&self) -> &Name {
        &self.certificate.tbs_certificate.issuer
    }

    pub(crate) fn serial(&self) -> &SerialNumber {
        &self.certificate.tbs_certificate.serial_number
    }

    fn find_extension(&self, oid: &der::asn1::ObjectIdentifier) -> Option<&Extension> {
        self.certificate
            .tbs_certificate
            .extensions
            .as_deref()?
            .iter()
            .find(|extension| extension.extn_id == *oid)
    }
}

/// Serial numbers are fresh 64-bit random values, zero-prefixed when the most
/// significant bit is set so the INTEGER stays positive.
fn generate_serial_number() -> Result<SerialNumber> {
    let mut value = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut value);
    let bytes = if value[0] & 0x80 != 0 {
        let mut padded = Vec::with_capacity(9);
        padded.push(0);
        padded.extend_from_slice(&value);
        padded
    } else {
        value.to_vec()
    };
    SerialNumber::new(&bytes)
        .map_err(|e| AwalaError::Certificate(format!("Invalid serial number: {e}")))
}

fn basic_constraints_extension(is_ca: bool, path_len: u8) -> Result<Extension> {
    let bc = BasicConstraints {
        ca: is_ca,
        path_len_constraint: Some(path_len),
    };
    extension(oids::ID_BASIC_CONSTRAINTS, true, &bc)
}

fn authority_key_identifier_extension(issuer_spki_der: &[u8]) -> Result<Extension> {
    let key_id = OctetString::new(Sha256::digest(issuer_spki_der).to_vec())
        .map_err(|e| AwalaError::Certificate(format!("Failed to encode AKI key id: {e}")))?;
    let aki = AuthorityKeyIdentifier {
        key_identifier: Some(key_id),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    extension(oids::ID_AUTHORITY_KEY_IDENTIFIER, false, &aki)
}

fn subject_key_identifier_extension(subject_spki_der: &[u8]) -> Result<Extension> {
    let key_id = OctetString::new(Sha256::digest(subject_spki_der).to_vec())
        .map_err(|e| AwalaError::Certificate(format!("Failed to encode SKI key id: {e}")))?;
    extension(
        oids::ID_SUBJECT_KEY_IDENTIFIER,
        false,
        &SubjectKeyIdentifier(key_id),
    )
}

fn extension<T: Encode>(
    oid: der::asn1::ObjectIdentifier,
    critical: bool,
    value: &T,
) -> Result<Extension> {
    let der = value
        .to_der()
        .map_err(|e| AwalaError::Certificate(format!("Failed to encode extension {oid}: {e}")))?;
    Ok(Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(der)
            .map_err(|e| AwalaError::Certificate(format!("Failed to wrap extension {oid}: {e}")))?,
    })
}

/// Build a DN holding a single BMPString CommonName.
fn common_name_dn(common_name: &str) -> Result<Name> {
    let value = BmpString::from_utf8(common_name)
        .map_err(|e| AwalaError::Certificate(format!("CommonName is not BMP-encodable: {e}")))?;
    let atv = AttributeTypeAndValue {
        oid: oids::ID_COMMON_NAME,
        value: Any::encode_from(&value)
            .map_err(|e| AwalaError::Certificate(format!("Failed to encode CommonName: {e}")))?,
    };
    let rdn = RelativeDistinguishedName(
        der::asn1::SetOfVec::try_from(vec![atv])
            .map_err(|e| AwalaError::Certificate(format!("Failed to build RDN: {e}")))?,
    );
    Ok(RdnSequence(vec![rdn]))
}

/// Extract the first CommonName from a DN.
fn dn_common_name(name: &Name) -> Option<String> {
    for rdn in name.0.iter() {
        for atv in rdn.0.iter() {
            if atv.oid != oids::ID_COMMON_NAME {
                continue;
            }
            let decoded = match atv.value.tag() {
                Tag::BmpString => atv
                    .value
                    .decode_as::<BmpString>()
                    .ok()
                    .map(|s| s.to_string()),
                Tag::Utf8String => atv
                    .value
                    .decode_as::<Utf8StringRef<'_>>()
                    .ok()
                    .map(|s| s.to_string()),
                Tag::PrintableString => atv
                    .value
                    .decode_as::<PrintableStringRef<'_>>()
                    .ok()
                    .map(|s| s.to_string()),
                _ => None,
            };
            if decoded.is_some() {
                return decoded;
            }
        }
    }
    None
}

pub(crate) fn truncate_to_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(date.timestamp(), 0).unwrap_or(date)
}

pub(crate) fn to_der_time(date: DateTime<Utc>) -> Result<Time> {
    let seconds = u64::try_from(date.timestamp())
        .map_err(|_| AwalaError::Certificate(format!("Unrepresentable date: {date}")))?;
    let datetime = der::DateTime::from_unix_duration(Duration::from_secs(seconds))
        .map_err(|e| AwalaError::Certificate(format!("Unrepresentable date {date}: {e}")))?;
    if datetime.year() < 2050 {
        let utc = UtcTime::from_date_time(datetime)
            .map_err(|e| AwalaError::Certificate(format!("Unrepresentable date {date}: {e}")))?;
        Ok(Time::UtcTime(utc))
    } else {
        Ok(Time::GeneralTime(der::asn1::GeneralizedTime::from_date_time(datetime)))
    }
}

pub(crate) fn from_der_time(time: &Time) -> Result<DateTime<Utc>> {
    let datetime = match time {
        Time::UtcTime(t) => t.to_date_time(),
        Time::GeneralTime(t) => t.to_date_time(),
    };
    let seconds = datetime.unix_duration().as_secs();
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .ok_or_else(|| AwalaError::Certificate(format!("Unrepresentable date: {datetime}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_rsa_key_pair, IdentityKeyOptions};
    use chrono::Duration as ChronoDuration;

    fn key_pair() -> crate::keys::IdentityKeyPair {
        generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap()
    }

    fn self_signed(pair: &crate::keys::IdentityKeyPair, days: i64) -> Certificate {
        Certificate::issue(IssuanceOptions {
            issuer_private_key: &pair.private_key,
            subject_public_key: &pair.public_key,
            common_name: pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(days),
            issuer_certificate: None,
            is_ca: true,
            path_len_constraint: 2,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap()
    }

    #[test]
    fn serialization_round_trips_byte_for_byte() {
        let pair = key_pair();
        let cert = self_signed(&pair, 1);
        let restored = Certificate::deserialize(cert.serialize()).unwrap();
        assert_eq!(cert, restored);
        assert_eq!(cert.serialize(), restored.serialize());
    }

    #[test]
    fn subject_private_address_matches_key_derivation() {
        let pair = key_pair();
        let cert = self_signed(&pair, 1);
        assert_eq!(
            cert.calculate_subject_private_address().unwrap(),
            pair.private_address
        );
        // Memoized: repeated calls agree.
        assert_eq!(
            cert.calculate_subject_private_address().unwrap(),
            cert.calculate_subject_private_address().unwrap()
        );
    }

    #[test]
    fn issuer_private_address_comes_from_aki() {
        let pair = key_pair();
        let cert = self_signed(&pair, 1);
        assert_eq!(
            cert.issuer_private_address().unwrap(),
            Some(pair.private_address.clone())
        );
    }

    #[test]
    fn issued_certificate_is_clamped_to_issuer_expiry() {
        let ca_pair = key_pair();
        let ca = self_signed(&ca_pair, 10);
        let subject_pair = key_pair();
        let cert = Certificate::issue(IssuanceOptions {
            issuer_private_key: &ca_pair.private_key,
            subject_public_key: &subject_pair.public_key,
            common_name: subject_pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(365),
            issuer_certificate: Some(&ca),
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();
        assert_eq!(cert.expiry_date().unwrap(), ca.expiry_date().unwrap());
        assert!(cert.verify_issued_by(&ca).is_ok());
    }

    #[test]
    fn non_ca_issuer_is_rejected() {
        let ca_pair = key_pair();
        let ca = self_signed(&ca_pair, 10);
        let middle_pair = key_pair();
        let middle = Certificate::issue(IssuanceOptions {
            issuer_private_key: &ca_pair.private_key,
            subject_public_key: &middle_pair.public_key,
            common_name: middle_pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(5),
            issuer_certificate: Some(&ca),
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();
        let leaf_pair = key_pair();
        let outcome = Certificate::issue(IssuanceOptions {
            issuer_private_key: &middle_pair.private_key,
            subject_public_key: &leaf_pair.public_key,
            common_name: leaf_pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(1),
            issuer_certificate: Some(&middle),
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        });
        assert!(matches!(outcome, Err(AwalaError::Certificate(_))));
    }

    #[test]
    fn excessive_path_length_is_rejected() {
        let pair = key_pair();
        let outcome = Certificate::issue(IssuanceOptions {
            issuer_private_key: &pair.private_key,
            subject_public_key: &pair.public_key,
            common_name: pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(1),
            issuer_certificate: None,
            is_ca: true,
            path_len_constraint: 3,
            hash: HashAlgorithm::Sha256,
        });
        assert!(matches!(outcome, Err(AwalaError::Certificate(_))));
    }

    #[test]
    fn expired_certificate_fails_validation() {
        let pair = key_pair();
        let cert = Certificate::issue(IssuanceOptions {
            issuer_private_key: &pair.private_key,
            subject_public_key: &pair.public_key,
            common_name: pair.private_address.clone(),
            validity_start: Some(Utc::now() - ChronoDuration::days(2)),
            validity_end: Utc::now() - ChronoDuration::seconds(1),
            issuer_certificate: None,
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();
        assert!(cert.validate().is_err());
    }

    #[test]
    fn certification_path_walks_to_trusted_root() {
        let root_pair = key_pair();
        let root = self_signed(&root_pair, 10);
        let mid_pair = key_pair();
        let mid = Certificate::issue(IssuanceOptions {
            issuer_private_key: &root_pair.private_key,
            subject_public_key: &mid_pair.public_key,
            common_name: mid_pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(5),
            issuer_certificate: Some(&root),
            is_ca: true,
            path_len_constraint: 1,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();
        let leaf_pair = key_pair();
        let leaf = Certificate::issue(IssuanceOptions {
            issuer_private_key: &mid_pair.private_key,
            subject_public_key: &leaf_pair.public_key,
            common_name: leaf_pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + ChronoDuration::days(1),
            issuer_certificate: Some(&mid),
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();

        let path = leaf
            .certification_path(std::slice::from_ref(&mid), std::slice::from_ref(&root))
            .unwrap();
        assert_eq!(path, vec![leaf.clone(), mid.clone(), root.clone()]);

        // Unrelated leaf cannot reach the root.
        let stranger_pair = key_pair();
        let stranger = self_signed(&stranger_pair, 1);
        assert!(stranger
            .certification_path(&[], std::slice::from_ref(&root))
            .is_err());
    }
}
