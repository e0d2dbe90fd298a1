//! RAMF boundary behavior across the documented size limits.

use awala_core::ramf::{
    self, MAX_PAYLOAD_LENGTH, MAX_RAMF_MESSAGE_LENGTH, MAX_TTL_SECONDS,
};
use awala_core::{
    issue_gateway_certificate, AwalaError, Certificate, IdentityKeyOptions, MessageOptions,
    Parcel, PkiIssuanceOptions, RamfMessage, SignatureOptions,
};
use chrono::{Duration, Utc};

fn sender() -> (awala_core::IdentityKeyPair, Certificate) {
    let pair = awala_core::generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap();
    let certificate = issue_gateway_certificate(PkiIssuanceOptions {
        subject_public_key: &pair.public_key,
        issuer_private_key: &pair.private_key,
        validity_end: Utc::now() + Duration::days(1),
        validity_start: None,
        issuer_certificate: None,
    })
    .unwrap();
    (pair, certificate)
}

#[test]
fn payload_boundary() {
    let (pair, certificate) = sender();
    let message = RamfMessage::new(
        "0deadbeef".to_string(),
        certificate.clone(),
        vec![0u8; MAX_PAYLOAD_LENGTH],
        MessageOptions::default(),
    );
    let serialization = ramf::serialize(
        &message,
        0x50,
        0x00,
        &pair.private_key,
        SignatureOptions::default(),
    )
    .unwrap();
    assert!(serialization.len() <= MAX_RAMF_MESSAGE_LENGTH);
    let restored = ramf::deserialize(&serialization, 0x50, 0x00).unwrap();
    assert_eq!(restored.payload.len(), MAX_PAYLOAD_LENGTH);

    let oversized = RamfMessage::new(
        "0deadbeef".to_string(),
        certificate,
        vec![0u8; MAX_PAYLOAD_LENGTH + 1],
        MessageOptions::default(),
    );
    assert!(matches!(
        ramf::serialize(
            &oversized,
            0x50,
            0x00,
            &pair.private_key,
            SignatureOptions::default()
        ),
        Err(AwalaError::RamfSyntax(_))
    ));
}

#[test]
fn message_size_ceiling_applies_before_parsing() {
    // One byte over the ceiling fails regardless of content.
    let oversized = vec![0u8; MAX_RAMF_MESSAGE_LENGTH + 1];
    let error = ramf::deserialize(&oversized, 0x50, 0x00).unwrap_err();
    assert!(matches!(error, AwalaError::RamfSyntax(_)));

    // At the ceiling the size check passes and parsing proceeds (and fails
    // later on the bogus prefix, still as a syntax error).
    let mut at_limit = vec![0u8; MAX_RAMF_MESSAGE_LENGTH];
    at_limit[..8].copy_from_slice(b"NotRamf!");
    let error = ramf::deserialize(&at_limit, 0x50, 0x00).unwrap_err();
    let AwalaError::RamfSyntax(message) = error else {
        panic!("expected a syntax error");
    };
    assert!(message.contains("format signature"), "{message}");
}

#[test]
fn spec_parcel_scenario_round_trips_exactly() {
    let (pair, certificate) = sender();
    let recipient = format!("0{}", "a".repeat(64));
    let parcel = Parcel::new(
        recipient.clone(),
        certificate,
        vec![0xAB; 32],
        MessageOptions {
            id: Some("msg-1".to_string()),
            ttl: Some(1_000),
            ..MessageOptions::default()
        },
    );
    let serialization = parcel
        .serialize(&pair.private_key, SignatureOptions::default())
        .unwrap();
    assert_eq!(serialization[8], 0x50);
    assert_eq!(serialization[9], 0x00);

    let restored = Parcel::deserialize(&serialization).unwrap();
    assert_eq!(restored.recipient_address, recipient);
    assert_eq!(restored.id, "msg-1");
    assert_eq!(restored.ttl, 1_000);
    assert_eq!(restored.payload, vec![0xAB; 32]);
    assert_eq!(restored.creation_date, parcel.creation_date);
}

#[test]
fn corrupted_signature_is_a_validation_error() {
    let (pair, certificate) = sender();
    let parcel = Parcel::new(
        "0deadbeef".to_string(),
        certificate,
        vec![1, 2, 3],
        MessageOptions::default(),
    );
    let mut serialization = parcel
        .serialize(&pair.private_key, SignatureOptions::default())
        .unwrap();
    // Flip a byte near the end, inside the signature.
    let index = serialization.len() - 10;
    serialization[index] ^= 0xFF;
    assert!(matches!(
        Parcel::deserialize(&serialization),
        Err(AwalaError::RamfValidation(_))
    ));
}

#[test]
fn invalid_recipient_address_is_a_validation_error() {
    let (pair, certificate) = sender();
    let message = RamfMessage::new(
        "Not a URL nor hex".to_string(),
        certificate,
        vec![],
        MessageOptions::default(),
    );
    let serialization = ramf::serialize(
        &message,
        0x50,
        0x00,
        &pair.private_key,
        SignatureOptions::default(),
    )
    .unwrap();
    assert!(matches!(
        ramf::deserialize(&serialization, 0x50, 0x00),
        Err(AwalaError::RamfValidation(_))
    ));
}

#[test]
fn ttl_cap_is_enforced_on_the_wire() {
    let (pair, certificate) = sender();
    let mut message = RamfMessage::new(
        "0deadbeef".to_string(),
        certificate,
        vec![],
        MessageOptions::default(),
    );
    message.ttl = MAX_TTL_SECONDS;
    assert!(ramf::serialize(
        &message,
        0x50,
        0x00,
        &pair.private_key,
        SignatureOptions::default()
    )
    .is_ok());
    message.ttl = MAX_TTL_SECONDS + 1;
    assert!(matches!(
        ramf::serialize(
            &message,
            0x50,
            0x00,
            &pair.private_key,
            SignatureOptions::default()
        ),
        Err(AwalaError::RamfSyntax(_))
    ));
}
