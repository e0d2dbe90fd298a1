//! Parcels: end-to-end messages carrying a single encrypted service data unit.

use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;

use crate::certificate::Certificate;
use crate::cms::SignatureOptions;
use crate::error::Result;
use crate::ramf::{self, MessageOptions, RamfMessage};

pub const PARCEL_MESSAGE_TYPE: u8 = 0x50;
pub const PARCEL_MESSAGE_VERSION: u8 = 0x00;

/// A RAMF parcel. The payload is expected to be a serialized EnvelopedData
/// value produced by one of the payload helpers.
#[derive(Debug, Clone)]
pub struct Parcel {
    message: RamfMessage,
}

impl Parcel {
    pub fn new(
        recipient_address: String,
        sender_certificate: Certificate,
        payload_serialized: Vec<u8>,
        options: MessageOptions,
    ) -> Parcel {
        Parcel {
            message: RamfMessage::new(
                recipient_address,
                sender_certificate,
                payload_serialized,
                options,
            ),
        }
    }

    pub fn serialize(
        &self,
        sender_private_key: &RsaPrivateKey,
        signature_options: SignatureOptions,
    ) -> Result<Vec<u8>> {
        ramf::serialize(
            &self.message,
            PARCEL_MESSAGE_TYPE,
            PARCEL_MESSAGE_VERSION,
            sender_private_key,
            signature_options,
        )
    }

    pub fn deserialize(serialization: &[u8]) -> Result<Parcel> {
        let message = ramf::deserialize(serialization, PARCEL_MESSAGE_TYPE, PARCEL_MESSAGE_VERSION)?;
        Ok(Parcel { message })
    }

    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.message.expiry_date()
    }
}

impl std::ops::Deref for Parcel {
    type Target = RamfMessage;

    fn deref(&self) -> &RamfMessage {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::IssuanceOptions;
    use crate::error::AwalaError;
    use crate::keys::{generate_rsa_key_pair, HashAlgorithm, IdentityKeyOptions};
    use chrono::Duration;

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

    #[test]
    fn parcel_round_trip() {
        let (pair, certificate) = sender();
        let parcel = Parcel::new(
            format!("0{}", "a".repeat(64)),
            certificate.clone(),
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
        assert_eq!(serialization[8], PARCEL_MESSAGE_TYPE);
        assert_eq!(serialization[9], PARCEL_MESSAGE_VERSION);

        let restored = Parcel::deserialize(&serialization).unwrap();
        assert_eq!(restored.recipient_address, parcel.recipient_address);
        assert_eq!(restored.id, "msg-1");
        assert_eq!(restored.ttl, 1_000);
        assert_eq!(restored.payload, vec![0xAB; 32]);
        assert_eq!(restored.sender_certificate, certificate);
    }

    #[test]
    fn parcel_rejects_foreign_type_octet() {
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
        serialization[8] = 0x51;
        assert!(matches!(
            Parcel::deserialize(&serialization),
            Err(AwalaError::RamfSyntax(_))
        ));
    }
}
