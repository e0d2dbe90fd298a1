//! CMS (RFC 5652) wrappers: SignedData signatures and EnvelopedData payloads.

pub mod enveloped_data;
pub mod signed_data;

pub use enveloped_data::{
    EncryptionOptions, EnvelopedData, SessionEncryptionResult, SessionEnvelopedData,
    SessionlessEnvelopedData,
};
pub use signed_data::{SignatureOptions, SignedData};

use cms::content_info::ContentInfo;
use der::asn1::ObjectIdentifier;
use der::{Any, Decode, Encode};
use x509_cert::attr::Attribute;

use crate::certificate::Certificate;
use crate::error::{AwalaError, Result};

/// Wrap a CMS structure in a ContentInfo and serialize it.
pub(crate) fn encode_content_info<T: der::EncodeValue + der::Tagged>(
    content_type: ObjectIdentifier,
    content: &T,
) -> Result<Vec<u8>> {
    let content = Any::encode_from(content)
        .map_err(|e| AwalaError::Cms(format!("Failed to encode CMS content: {e}")))?;
    ContentInfo {
        content_type,
        content,
    }
    .to_der()
    .map_err(|e| AwalaError::Cms(format!("Failed to encode ContentInfo: {e}")))
}

/// Parse a ContentInfo and check it carries the expected content type.
pub(crate) fn decode_content_info(
    der_bytes: &[u8],
    expected_content_type: ObjectIdentifier,
) -> Result<Any> {
    let content_info = ContentInfo::from_der(der_bytes)
        .map_err(|e| AwalaError::Cms(format!("Malformed ContentInfo: {e}")))?;
    if content_info.content_type != expected_content_type {
        return Err(AwalaError::Cms(format!(
            "ContentInfo does not wrap the expected type (got {}, expected {})",
            content_info.content_type, expected_content_type
        )));
    }
    Ok(content_info.content)
}

/// Build a single-valued CMS attribute.
pub(crate) fn attribute<T: der::EncodeValue + der::Tagged>(
    oid: ObjectIdentifier,
    value: &T,
) -> Result<Attribute> {
    let value = Any::encode_from(value)
        .map_err(|e| AwalaError::Cms(format!("Failed to encode attribute {oid}: {e}")))?;
    Ok(Attribute {
        oid,
        values: der::asn1::SetOfVec::try_from(vec![value])
            .map_err(|e| AwalaError::Cms(format!("Failed to build attribute {oid}: {e}")))?,
    })
}

/// Find an attribute by OID and return its sole value.
pub(crate) fn single_attribute_value<'a>(
    attributes: impl Iterator<Item = &'a Attribute>,
    oid: ObjectIdentifier,
) -> Result<&'a Any> {
    for attr in attributes {
        if attr.oid == oid {
            return attr
                .values
                .iter()
                .next()
                .ok_or_else(|| AwalaError::Cms(format!("Attribute {oid} is empty")));
        }
    }
    Err(AwalaError::Cms(format!("Attribute {oid} is missing")))
}

/// Decode the certificates attached to a CMS value.
pub(crate) fn decode_certificate_set(
    certificates: &cms::signed_data::CertificateSet,
) -> Result<Vec<Certificate>> {
    let mut decoded = Vec::new();
    for choice in certificates.0.iter() {
        if let cms::cert::CertificateChoices::Certificate(certificate) = choice {
            let der = certificate.to_der().map_err(|e| {
                AwalaError::Cms(format!("Failed to re-encode attached certificate: {e}"))
            })?;
            decoded.push(Certificate::deserialize(&der)?);
        }
    }
    Ok(decoded)
}
