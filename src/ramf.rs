//! RAMF wire format: framing, field set and the SignedData envelope.
//!
//! Every serialized message is the 10-byte format signature (`Relaynet` plus
//! the concrete type and version octets) followed by a CMS SignedData value
//! encapsulating the DER field set. The field-set tag order is part of the
//! wire contract.

use chrono::{DateTime, Utc};
use der::asn1::{GeneralizedTime, Int, OctetString};
use der::{Decode, Encode, Sequence};
use rsa::RsaPrivateKey;

use crate::certificate::{truncate_to_seconds, Certificate};
use crate::cms::{SignatureOptions, SignedData};
use crate::der_visible_string::VisibleString;
use crate::error::{AwalaError, Result};

pub const FORMAT_SIGNATURE_PREFIX: &[u8; 8] = b"Relaynet";
pub const FORMAT_SIGNATURE_LENGTH: usize = 10;

pub const MAX_RAMF_MESSAGE_LENGTH: usize = 9_437_184;
pub const MAX_PAYLOAD_LENGTH: usize = (1 << 23) - 1;
pub const MAX_RECIPIENT_ADDRESS_LENGTH: usize = 1024;
pub const MAX_ID_LENGTH: usize = 64;
pub const MAX_TTL_SECONDS: u32 = 15_552_000;

/// The biggest TTL the field set may carry before narrowing; larger values
/// are rejected even though the TTL cap would catch them anyway.
const MAX_SAFE_INTEGER: u128 = (1 << 53) - 1;

/// The generic RAMF message: concrete types supply the type/version octets.
#[derive(Debug, Clone)]
pub struct RamfMessage {
    pub recipient_address: String,
    pub id: String,
    pub creation_date: DateTime<Utc>,
    pub ttl: u32,
    pub payload: Vec<u8>,
    pub sender_certificate: Certificate,
    pub sender_ca_certificate_chain: Vec<Certificate>,
}

/// Optional attributes for new messages.
#[derive(Debug, Clone, Default)]
pub struct MessageOptions {
    /// Defaults to a random UUID.
    pub id: Option<String>,
    /// Defaults to the current time, truncated to whole seconds.
    pub creation_date: Option<DateTime<Utc>>,
    /// Defaults to five minutes.
    pub ttl: Option<u32>,
    pub sender_ca_certificate_chain: Vec<Certificate>,
}

const DEFAULT_TTL_SECONDS: u32 = 5 * 60;

impl RamfMessage {
    pub fn new(
        recipient_address: String,
        sender_certificate: Certificate,
        payload: Vec<u8>,
        options: MessageOptions,
    ) -> RamfMessage {
        RamfMessage {
            recipient_address,
            id: options.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            creation_date: truncate_to_seconds(options.creation_date.unwrap_or_else(Utc::now)),
            ttl: options.ttl.unwrap_or(DEFAULT_TTL_SECONDS),
            payload,
            sender_certificate,
            sender_ca_certificate_chain: options.sender_ca_certificate_chain,
        }
    }

    /// When the message ceases to be valid.
    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.creation_date + chrono::Duration::seconds(i64::from(self.ttl))
    }
}

/// The RAMF field set. The implicit tag order is the wire contract.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct MessageFieldSet {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    recipient_address: VisibleString,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT")]
    id: VisibleString,
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT")]
    creation_date: GeneralizedTime,
    #[asn1(context_specific = "3", tag_mode = "IMPLICIT")]
    ttl: Int,
    #[asn1(context_specific = "4", tag_mode = "IMPLICIT")]
    payload: OctetString,
}

/// Serialize and sign a message.
pub fn serialize(
    message: &RamfMessage,
    concrete_message_type: u8,
    concrete_message_version: u8,
    sender_private_key: &RsaPrivateKey,
    signature_options: SignatureOptions,
) -> Result<Vec<u8>> {
    validate_message_bounds(message)?;

    let field_set = MessageFieldSet {
        recipient_address: VisibleString::new(&message.recipient_address).map_err(|e| {
            AwalaError::RamfSyntax(format!("Recipient address is not a visible string: {e}"))
        })?,
        id: VisibleString::new(&message.id).map_err(|e| {
            AwalaError::RamfSyntax(format!("Message id is not a visible string: {e}"))
        })?,
        creation_date: date_to_generalized_time(message.creation_date)?,
        ttl: encode_ttl(message.ttl)?,
        payload: OctetString::new(message.payload.clone())
            .map_err(|e| AwalaError::RamfSyntax(format!("Failed to encode payload: {e}")))?,
    };
    let field_set_der = field_set
        .to_der()
        .map_err(|e| AwalaError::RamfSyntax(format!("Failed to encode field set: {e}")))?;

    let signed_data = SignedData::sign(
        &field_set_der,
        sender_private_key,
        &message.sender_certificate,
        &message.sender_ca_certificate_chain,
        signature_options,
    )?;
    let signature = signed_data.serialize()?;

    let mut serialization = Vec::with_capacity(FORMAT_SIGNATURE_LENGTH + signature.len());
    serialization.extend_from_slice(FORMAT_SIGNATURE_PREFIX);
    serialization.push(concrete_message_type);
    serialization.push(concrete_message_version);
    serialization.extend_from_slice(&signature);

    if MAX_RAMF_MESSAGE_LENGTH < serialization.len() {
        return Err(AwalaError::RamfSyntax(format!(
            "Serialization is larger than the limit of {MAX_RAMF_MESSAGE_LENGTH} octets ({} octets)",
            serialization.len()
        )));
    }
    Ok(serialization)
}

/// Parse and verify a serialized message.
pub fn deserialize(
    serialization: &[u8],
    concrete_message_type: u8,
    concrete_message_version: u8,
) -> Result<RamfMessage> {
    // The size check comes before any decoding work.
    if MAX_RAMF_MESSAGE_LENGTH < serialization.len() {
        return Err(AwalaError::RamfSyntax(format!(
            "Message should not be longer than {MAX_RAMF_MESSAGE_LENGTH} octets ({} octets given)",
            serialization.len()
        )));
    }
    if serialization.len() < FORMAT_SIGNATURE_LENGTH
        || &serialization[..FORMAT_SIGNATURE_PREFIX.len()] != FORMAT_SIGNATURE_PREFIX
    {
        return Err(AwalaError::RamfSyntax(
            "Serialization is not a valid RAMF message: format signature not found".to_string(),
        ));
    }
    let message_type = serialization[8];
    if message_type != concrete_message_type {
        return Err(AwalaError::RamfSyntax(format!(
            "Expected concrete message type 0x{concrete_message_type:x} but got 0x{message_type:x}"
        )));
    }
    let message_version = serialization[9];
    if message_version != concrete_message_version {
        return Err(AwalaError::RamfSyntax(format!(
            "Expected concrete message version 0x{concrete_message_version:x} but got 0x{message_version:x}"
        )));
    }

    let signed_data = SignedData::deserialize(&serialization[FORMAT_SIGNATURE_LENGTH..])
        .map_err(|e| AwalaError::RamfValidation(format!("Invalid RAMF serialization: {e}")))?;
    let field_set_der = signed_data
        .verify(None)
        .map_err(|e| AwalaError::RamfValidation(format!("Invalid RAMF signature: {e}")))?;

    let field_set = MessageFieldSet::from_der(&field_set_der)
        .map_err(|e| AwalaError::RamfSyntax(format!("Invalid RAMF fields: {e}")))?;

    let recipient_address = field_set.recipient_address.as_str().to_owned();
    let id = field_set.id.as_str().to_owned();
    let creation_date = generalized_time_to_date(&field_set.creation_date)?;
    let ttl = decode_ttl(&field_set.ttl)?;
    let payload = field_set.payload.as_bytes().to_vec();

    let message = RamfMessage {
        recipient_address,
        id,
        creation_date,
        ttl,
        payload,
        sender_certificate: signed_data.signer_certificate().clone(),
        sender_ca_certificate_chain: signed_data.attached_certificates().to_vec(),
    };
    validate_message_bounds(&message)?;
    validate_recipient_address(&message.recipient_address)?;
    Ok(message)
}

fn validate_message_bounds(message: &RamfMessage) -> Result<()> {
    if MAX_RECIPIENT_ADDRESS_LENGTH < message.recipient_address.len() {
        return Err(AwalaError::RamfSyntax(format!(
            "Recipient address should not span more than {MAX_RECIPIENT_ADDRESS_LENGTH} characters ({} characters given)",
            message.recipient_address.len()
        )));
    }
    if MAX_ID_LENGTH < message.id.len() {
        return Err(AwalaError::RamfSyntax(format!(
            "Id should not span more than {MAX_ID_LENGTH} characters ({} characters given)",
            message.id.len()
        )));
    }
    if MAX_TTL_SECONDS < message.ttl {
        return Err(AwalaError::RamfSyntax(format!(
            "TTL must be less than or equal to {MAX_TTL_SECONDS} ({} given)",
            message.ttl
        )));
    }
    if MAX_PAYLOAD_LENGTH < message.payload.len() {
        return Err(AwalaError::RamfSyntax(format!(
            "Payload size must not exceed {MAX_PAYLOAD_LENGTH} octets ({} octets given)",
            message.payload.len()
        )));
    }
    Ok(())
}

/// A recipient address must be a private address (lowercase hex) or an
/// absolute URL.
pub fn validate_recipient_address(address: &str) -> Result<()> {
    let is_private = !address.is_empty()
        && address
            .chars()
            .all(|c| matches!(c, '0'..='9' | 'a'..='f'));
    if is_private {
        return Ok(());
    }
    url::Url::parse(address).map_err(|_| {
        AwalaError::RamfValidation(format!(
            "Recipient address should be a private address or a valid URL ({address})"
        ))
    })?;
    Ok(())
}

fn date_to_generalized_time(date: DateTime<Utc>) -> Result<GeneralizedTime> {
    let seconds = u64::try_from(date.timestamp())
        .map_err(|_| AwalaError::RamfSyntax(format!("Unrepresentable date: {date}")))?;
    let datetime = der::DateTime::from_unix_duration(std::time::Duration::from_secs(seconds))
        .map_err(|e| AwalaError::RamfSyntax(format!("Unrepresentable date {date}: {e}")))?;
    Ok(GeneralizedTime::from_date_time(datetime))
}

fn generalized_time_to_date(time: &GeneralizedTime) -> Result<DateTime<Utc>> {
    let seconds = time.to_date_time().unix_duration().as_secs();
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .ok_or_else(|| AwalaError::RamfValidation("Message date is unrepresentable".to_string()))
}

/// TTLs are encoded as minimal positive INTEGERs.
fn encode_ttl(ttl: u32) -> Result<Int> {
    let bytes = ttl.to_be_bytes();
    let mut start = 0;
    while start < 3 && bytes[start] == 0 {
        start += 1;
    }
    let mut content = Vec::with_capacity(5);
    if bytes[start] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[start..]);
    Int::new(&content).map_err(|e| AwalaError::RamfSyntax(format!("Failed to encode TTL: {e}")))
}

/// TTLs are decoded as arbitrary-precision INTEGERs and narrowed, failing on
/// anything beyond 2^53 - 1 before the TTL cap is even considered.
fn decode_ttl(value: &Int) -> Result<u32> {
    let bytes = value.as_bytes();
    if bytes.is_empty() {
        return Err(AwalaError::RamfSyntax("TTL is empty".to_string()));
    }
    if bytes[0] & 0x80 != 0 {
        return Err(AwalaError::RamfSyntax("TTL must not be negative".to_string()));
    }
    let significant: &[u8] = {
        let mut start = 0;
        while start < bytes.len() - 1 && bytes[start] == 0 {
            start += 1;
        }
        &bytes[start..]
    };
    if 16 < significant.len() {
        return Err(AwalaError::RamfSyntax(
            "TTL is too large to be a safe integer".to_string(),
        ));
    }
    let mut ttl: u128 = 0;
    for byte in significant {
        ttl = (ttl << 8) | u128::from(*byte);
    }
    if MAX_SAFE_INTEGER < ttl {
        return Err(AwalaError::RamfSyntax(
            "TTL is too large to be a safe integer".to_string(),
        ));
    }
    u32::try_from(ttl).map_err(|_| {
        AwalaError::RamfSyntax(format!(
            "TTL must be less than or equal to {MAX_TTL_SECONDS} ({ttl} given)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::IssuanceOptions;
    use crate::keys::{generate_rsa_key_pair, HashAlgorithm, IdentityKeyOptions};
    use chrono::Duration;

    const TYPE_OCTET: u8 = 0x44;
    const VERSION_OCTET: u8 = 0x00;

    fn sender() -> (crate::keys::IdentityKeyPair, Certificate) {
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

    fn sample_message(certificate: Certificate) -> RamfMessage {
        RamfMessage::new(
            format!("0{}", "a".repeat(64)),
            certificate,
            vec![0xAB; 32],
            MessageOptions {
                id: Some("msg-1".to_string()),
                ttl: Some(1_000),
                ..MessageOptions::default()
            },
        )
    }

    #[test]
    fn round_trip_preserves_fields() {
        let (pair, certificate) = sender();
        let message = sample_message(certificate.clone());
        let serialization = serialize(
            &message,
            TYPE_OCTET,
            VERSION_OCTET,
            &pair.private_key,
            SignatureOptions::default(),
        )
        .unwrap();

        assert_eq!(&serialization[..8], FORMAT_SIGNATURE_PREFIX);
        assert_eq!(serialization[8], TYPE_OCTET);
        assert_eq!(serialization[9], VERSION_OCTET);

        let restored = deserialize(&serialization, TYPE_OCTET, VERSION_OCTET).unwrap();
        assert_eq!(restored.recipient_address, message.recipient_address);
        assert_eq!(restored.id, message.id);
        assert_eq!(restored.creation_date, message.creation_date);
        assert_eq!(restored.ttl, message.ttl);
        assert_eq!(restored.payload, message.payload);
        assert_eq!(restored.sender_certificate, certificate);
    }

    #[test]
    fn type_octet_mismatch_reports_both_in_hex() {
        let (pair, certificate) = sender();
        let message = sample_message(certificate);
        let serialization = serialize(
            &message,
            0x50,
            VERSION_OCTET,
            &pair.private_key,
            SignatureOptions::default(),
        )
        .unwrap();
        let error = deserialize(&serialization, 0x51, VERSION_OCTET).unwrap_err();
        let text = error.to_string();
        assert!(text.contains("0x50"), "{text}");
        assert!(text.contains("0x51"), "{text}");
    }

    #[test]
    fn version_octet_mismatch_is_a_syntax_error() {
        let (pair, certificate) = sender();
        let message = sample_message(certificate);
        let serialization = serialize(
            &message,
            TYPE_OCTET,
            0x00,
            &pair.private_key,
            SignatureOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            deserialize(&serialization, TYPE_OCTET, 0x01),
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[test]
    fn malformed_prefix_is_rejected() {
        assert!(matches!(
            deserialize(b"NotRelay\x50\x00rest", 0x50, 0x00),
            Err(AwalaError::RamfSyntax(_))
        ));
        assert!(matches!(
            deserialize(b"short", 0x50, 0x00),
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[test]
    fn oversized_message_is_rejected_before_decoding() {
        let oversized = vec![0u8; MAX_RAMF_MESSAGE_LENGTH + 1];
        assert!(matches!(
            deserialize(&oversized, 0x50, 0x00),
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[test]
    fn recipient_address_boundaries() {
        let (pair, certificate) = sender();
        let mut message = sample_message(certificate);

        message.recipient_address = "a".repeat(MAX_RECIPIENT_ADDRESS_LENGTH);
        assert!(serialize(
            &message,
            TYPE_OCTET,
            VERSION_OCTET,
            &pair.private_key,
            SignatureOptions::default()
        )
        .is_ok());

        message.recipient_address = "a".repeat(MAX_RECIPIENT_ADDRESS_LENGTH + 1);
        assert!(matches!(
            serialize(
                &message,
                TYPE_OCTET,
                VERSION_OCTET,
                &pair.private_key,
                SignatureOptions::default()
            ),
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[test]
    fn ttl_boundaries() {
        let (pair, certificate) = sender();
        let mut message = sample_message(certificate);

        for ttl in [0, MAX_TTL_SECONDS] {
            message.ttl = ttl;
            assert!(serialize(
                &message,
                TYPE_OCTET,
                VERSION_OCTET,
                &pair.private_key,
                SignatureOptions::default()
            )
            .is_ok());
        }
        message.ttl = MAX_TTL_SECONDS + 1;
        assert!(matches!(
            serialize(
                &message,
                TYPE_OCTET,
                VERSION_OCTET,
                &pair.private_key,
                SignatureOptions::default()
            ),
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[test]
    fn id_length_boundary() {
        let (pair, certificate) = sender();
        let mut message = sample_message(certificate);
        message.id = "i".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            serialize(
                &message,
                TYPE_OCTET,
                VERSION_OCTET,
                &pair.private_key,
                SignatureOptions::default()
            ),
            Err(AwalaError::RamfSyntax(_))
        ));
    }

    #[test]
    fn ttl_codec_round_trips() {
        for ttl in [0u32, 1, 127, 128, 255, 256, 1_000, MAX_TTL_SECONDS] {
            let encoded = encode_ttl(ttl).unwrap();
            assert_eq!(decode_ttl(&encoded).unwrap(), ttl);
        }
    }

    #[test]
    fn excessive_ttl_integer_is_rejected() {
        // 2^53 exceeds the safe-integer bound.
        let encoded = Int::new(&[0x20, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(matches!(decode_ttl(&encoded), Err(AwalaError::RamfSyntax(_))));
    }

    #[test]
    fn recipient_address_format_validation() {
        assert!(validate_recipient_address("0deadbeef").is_ok());
        assert!(validate_recipient_address("https://gateway.example.com").is_ok());
        assert!(validate_recipient_address("not a url").is_err());
        assert!(validate_recipient_address("DEADBEEF").is_err());
    }
}
