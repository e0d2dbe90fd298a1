//! CMS SignedData: attached and detached signatures with certificate chains.

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::CmsVersion;
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData as CmsSignedData, SignerIdentifier,
    SignerInfo, SignerInfos,
};
use der::asn1::{OctetString, SetOfVec};
use der::Encode;
use rsa::RsaPrivateKey;
use spki::AlgorithmIdentifierOwned;

use crate::certificate::Certificate;
use crate::cms::{
    attribute, decode_certificate_set, decode_content_info, encode_content_info,
    single_attribute_value,
};
use crate::error::{AwalaError, Result};
use crate::keys::{digest, HashAlgorithm};
use crate::oids;
use crate::pss;

/// Options for producing a SignedData value.
#[derive(Debug, Clone, Copy)]
pub struct SignatureOptions {
    pub hash: HashAlgorithm,
    /// Embed the plaintext in the signature (attached) or leave it out
    /// (detached).
    pub encapsulated: bool,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::Sha256,
            encapsulated: true,
        }
    }
}

/// A CMS SignedData value with exactly one signer.
#[derive(Debug, Clone)]
pub struct SignedData {
    inner: CmsSignedData,
    signer_certificate: Certificate,
    attached_certificates: Vec<Certificate>,
}

impl SignedData {
    /// Sign `plaintext` with the given key, attaching the signer certificate
    /// and the supplied CA chain.
    pub fn sign(
        plaintext: &[u8],
        signer_private_key: &RsaPrivateKey,
        signer_certificate: &Certificate,
        ca_certificates: &[Certificate],
        options: SignatureOptions,
    ) -> Result<SignedData> {
        let plaintext_digest = digest(options.hash, plaintext);
        let signed_attrs = SetOfVec::try_from(vec![
            attribute(oids::ID_CONTENT_TYPE, &oids::ID_DATA)?,
            attribute(
                oids::ID_MESSAGE_DIGEST,
                &OctetString::new(plaintext_digest).map_err(|e| {
                    AwalaError::Cms(format!("Failed to encode message digest: {e}"))
                })?,
            )?,
        ])
        .map_err(|e| AwalaError::Cms(format!("Failed to build signed attributes: {e}")))?;

        // The signature covers the signed attributes re-encoded as SET OF.
        let signed_attrs_der = signed_attrs
            .to_der()
            .map_err(|e| AwalaError::Cms(format!("Failed to encode signed attributes: {e}")))?;
        let signature = pss::sign(signer_private_key, options.hash, &signed_attrs_der)?;

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: signer_certificate.issuer_name().clone(),
                serial_number: signer_certificate.serial().clone(),
            }),
            digest_alg: AlgorithmIdentifierOwned {
                oid: options.hash.oid(),
                parameters: None,
            },
            signed_attrs: Some(signed_attrs),
            signature_algorithm: pss::algorithm_identifier(options.hash)?,
            signature: OctetString::new(signature)
                .map_err(|e| AwalaError::Cms(format!("Failed to encode signature: {e}")))?,
            unsigned_attrs: None,
        };

        let econtent = if options.encapsulated {
            let wrapped = OctetString::new(plaintext)
                .map_err(|e| AwalaError::Cms(format!("Failed to encapsulate content: {e}")))?;
            Some(
                der::Any::encode_from(&wrapped)
                    .map_err(|e| AwalaError::Cms(format!("Failed to encapsulate content: {e}")))?,
            )
        } else {
            None
        };

        let mut certificate_choices = vec![certificate_choice(signer_certificate)?];
        for ca_certificate in ca_certificates {
            certificate_choices.push(certificate_choice(ca_certificate)?);
        }

        let inner = CmsSignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![AlgorithmIdentifierOwned {
                oid: options.hash.oid(),
                parameters: None,
            }])
            .map_err(|e| AwalaError::Cms(format!("Failed to build digest algorithms: {e}")))?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: oids::ID_DATA,
                econtent,
            },
            certificates: Some(CertificateSet(
                SetOfVec::try_from(certificate_choices)
                    .map_err(|e| AwalaError::Cms(format!("Failed to build certificate set: {e}")))?,
            )),
            crls: None,
            signer_infos: SignerInfos(
                SetOfVec::try_from(vec![signer_info])
                    .map_err(|e| AwalaError::Cms(format!("Failed to build signer infos: {e}")))?,
            ),
        };

        let mut attached_certificates = vec![signer_certificate.clone()];
        attached_certificates.extend(ca_certificates.iter().cloned());
        Ok(SignedData {
            inner,
            signer_certificate: signer_certificate.clone(),
            attached_certificates,
        })
    }

    /// Serialize as a ContentInfo-wrapped SignedData.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode_content_info(oids::ID_SIGNED_DATA, &self.inner)
    }

    /// Parse a ContentInfo-wrapped SignedData and run the structural checks:
    /// exactly one signer, identified by a certificate present in the bag.
    pub fn deserialize(der_bytes: &[u8]) -> Result<SignedData> {
        let content = decode_content_info(der_bytes, oids::ID_SIGNED_DATA)?;
        let inner: CmsSignedData = content
            .decode_as()
            .map_err(|e| AwalaError::Cms(format!("Malformed SignedData: {e}")))?;

        if inner.signer_infos.0.len() != 1 {
            return Err(AwalaError::Cms(format!(
                "SignedData must have exactly one SignerInfo ({} found)",
                inner.signer_infos.0.len()
            )));
        }
        let signer_info = inner
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| AwalaError::Cms("SignedData has no SignerInfo".to_string()))?;

        let attached_certificates = match &inner.certificates {
            Some(set) => decode_certificate_set(set)?,
            None => Vec::new(),
        };
        let signer_certificate = find_signer_certificate(signer_info, &attached_certificates)?
            .ok_or_else(|| {
                AwalaError::Cms("Signer certificate is missing from SignedData".to_string())
            })?;

        Ok(SignedData {
            inner,
            signer_certificate,
            attached_certificates,
        })
    }

    /// The encapsulated plaintext, when the signature is attached.
    pub fn plaintext(&self) -> Result<Option<Vec<u8>>> {
        match &self.inner.encap_content_info.econtent {
            None => Ok(None),
            Some(content) => {
                let wrapped: OctetString = content
                    .decode_as()
                    .map_err(|e| AwalaError::Cms(format!("Malformed encapsulated content: {e}")))?;
                Ok(Some(wrapped.as_bytes().to_vec()))
            }
        }
    }

    pub fn signer_certificate(&self) -> &Certificate {
        &self.signer_certificate
    }

    /// Every certificate attached to the value, signer included.
    pub fn attached_certificates(&self) -> &[Certificate] {
        &self.attached_certificates
    }

    /// Verify the signature, returning the signed plaintext.
    ///
    /// `expected_plaintext` must be supplied for detached signatures and must
    /// be absent for attached ones.
    pub fn verify(&self, expected_plaintext: Option<&[u8]>) -> Result<Vec<u8>> {
        let encapsulated = self.plaintext()?;
        let plaintext = match (&encapsulated, expected_plaintext) {
            (Some(_), Some(_)) => {
                return Err(AwalaError::Cms(
                    "The plaintext should only be provided when content is detached".to_string(),
                ))
            }
            (None, None) => {
                return Err(AwalaError::Cms(
                    "The plaintext is required when content is detached".to_string(),
                ))
            }
            (Some(content), None) => content.clone(),
            (None, Some(external)) => external.to_vec(),
        };

        let signer_info = self
            .inner
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| AwalaError::Cms("SignedData has no SignerInfo".to_string()))?;

        let digest_hash = HashAlgorithm::from_oid(&signer_info.digest_alg.oid)?;
        let signed_attrs = signer_info
            .signed_attrs
            .as_ref()
            .ok_or_else(|| AwalaError::Cms("Signed attributes are missing".to_string()))?;

        let digest_value = single_attribute_value(signed_attrs.iter(), oids::ID_MESSAGE_DIGEST)?;
        let claimed_digest: OctetString = digest_value
            .decode_as()
            .map_err(|e| AwalaError::Cms(format!("Malformed message digest attribute: {e}")))?;
        if claimed_digest.as_bytes() != digest(digest_hash, &plaintext).as_slice() {
            return Err(AwalaError::Cms(
                "The plaintext digest does not match the signed digest".to_string(),
            ));
        }

        let signed_attrs_der = signed_attrs
            .to_der()
            .map_err(|e| AwalaError::Cms(format!("Failed to encode signed attributes: {e}")))?;
        let signature_hash = pss::hash_from_algorithm(&signer_info.signature_algorithm)?;
        pss::verify(
            &self.signer_certificate.subject_rsa_public_key()?,
            signature_hash,
            &signed_attrs_der,
            signer_info.signature.as_bytes(),
        )?;
        Ok(plaintext)
    }
}

fn certificate_choice(certificate: &Certificate) -> Result<CertificateChoices> {
    Ok(CertificateChoices::Certificate(
        certificate.as_x509().clone(),
    ))
}

fn find_signer_certificate(
    signer_info: &SignerInfo,
    candidates: &[Certificate],
) -> Result<Option<Certificate>> {
    let SignerIdentifier::IssuerAndSerialNumber(sid) = &signer_info.sid else {
        return Err(AwalaError::Cms(
            "SignerInfo must identify the signer by issuer and serial number".to_string(),
        ));
    };
    let sid_issuer = sid
        .issuer
        .to_der()
        .map_err(|e| AwalaError::Cms(format!("Malformed signer issuer: {e}")))?;
    for candidate in candidates {
        let issuer = candidate
            .issuer_name()
            .to_der()
            .map_err(|e| AwalaError::Cms(format!("Malformed certificate issuer: {e}")))?;
        if issuer == sid_issuer && candidate.serial() == &sid.serial_number {
            return Ok(Some(candidate.clone()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::IssuanceOptions;
    use crate::keys::{generate_rsa_key_pair, IdentityKeyOptions};
    use chrono::{Duration, Utc};

    fn signer() -> (crate::keys::IdentityKeyPair, Certificate) {
        let pair = generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap();
        let certificate = Certificate::issue(IssuanceOptions {
            issuer_private_key: &pair.private_key,
            subject_public_key: &pair.public_key,
            common_name: pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + Duration::days(1),
            issuer_certificate: None,
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();
        (pair, certificate)
    }

    #[test]
    fn attached_signature_round_trips() {
        let (pair, certificate) = signer();
        let signed = SignedData::sign(
            b"the plaintext",
            &pair.private_key,
            &certificate,
            &[],
            SignatureOptions::default(),
        )
        .unwrap();
        let serialized = signed.serialize().unwrap();

        let restored = SignedData::deserialize(&serialized).unwrap();
        let plaintext = restored.verify(None).unwrap();
        assert_eq!(plaintext, b"the plaintext");
        assert_eq!(restored.signer_certificate(), &certificate);
        assert_eq!(restored.attached_certificates(), &[certificate]);
    }

    #[test]
    fn detached_signature_requires_external_plaintext() {
        let (pair, certificate) = signer();
        let options = SignatureOptions {
            hash: HashAlgorithm::Sha256,
            encapsulated: false,
        };
        let signed =
            SignedData::sign(b"detached", &pair.private_key, &certificate, &[], options).unwrap();
        let restored = SignedData::deserialize(&signed.serialize().unwrap()).unwrap();

        assert!(restored.verify(None).is_err());
        assert_eq!(restored.verify(Some(b"detached")).unwrap(), b"detached");
        assert!(restored.verify(Some(b"tampered")).is_err());
    }

    #[test]
    fn tampered_content_fails_verification() {
        let (pair, certificate) = signer();
        let signed = SignedData::sign(
            b"original",
            &pair.private_key,
            &certificate,
            &[],
            SignatureOptions::default(),
        )
        .unwrap();
        let mut inner = signed.inner.clone();
        inner.encap_content_info.econtent = Some(
            der::Any::encode_from(&OctetString::new(b"altered".to_vec()).unwrap()).unwrap(),
        );
        let tampered = SignedData {
            inner,
            signer_certificate: signed.signer_certificate.clone(),
            attached_certificates: signed.attached_certificates.clone(),
        };
        assert!(tampered.verify(None).is_err());
    }

    #[test]
    fn sha384_and_sha512_are_supported() {
        for hash in [HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            let (pair, certificate) = signer();
            let options = SignatureOptions {
                hash,
                encapsulated: true,
            };
            let signed =
                SignedData::sign(b"data", &pair.private_key, &certificate, &[], options).unwrap();
            let restored = SignedData::deserialize(&signed.serialize().unwrap()).unwrap();
            assert_eq!(restored.verify(None).unwrap(), b"data");
        }
    }

    #[test]
    fn ca_chain_is_attached() {
        let (_ca_pair, ca_certificate) = signer();
        let pair = generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap();
        let certificate = Certificate::issue(IssuanceOptions {
            issuer_private_key: &pair.private_key,
            subject_public_key: &pair.public_key,
            common_name: pair.private_address.clone(),
            validity_start: None,
            validity_end: Utc::now() + Duration::days(1),
            issuer_certificate: None,
            is_ca: false,
            path_len_constraint: 0,
            hash: HashAlgorithm::Sha256,
        })
        .unwrap();

        let signed = SignedData::sign(
            b"data",
            &pair.private_key,
            &certificate,
            std::slice::from_ref(&ca_certificate),
            SignatureOptions::default(),
        )
        .unwrap();
        let restored = SignedData::deserialize(&signed.serialize().unwrap()).unwrap();
        assert_eq!(restored.attached_certificates().len(), 2);
        assert!(restored.attached_certificates().contains(&ca_certificate));
    }
}
