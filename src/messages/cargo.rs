//! Cargoes: store-and-forward containers batching encapsulated messages.

use chrono::{DateTime, Duration, Utc};
use rsa::RsaPrivateKey;

use crate::certificate::Certificate;
use crate::cms::SignatureOptions;
use crate::error::Result;
use crate::ramf::{self, MessageOptions, RamfMessage, MAX_TTL_SECONDS};

pub const CARGO_MESSAGE_TYPE: u8 = 0x43;
pub const CARGO_MESSAGE_VERSION: u8 = 0x00;

/// How far into the past a fresh cargo's creation date is moved to tolerate
/// clock drift between relaying gateways.
pub const CARGO_CLOCK_DRIFT_TOLERANCE_HOURS: i64 = 3;

/// A RAMF cargo. The payload is expected to be an enveloped
/// [`CargoMessageSet`](crate::messages::CargoMessageSet) serialization.
#[derive(Debug, Clone)]
pub struct Cargo {
    message: RamfMessage,
}

impl Cargo {
    /// Build a cargo. Unless a creation date is supplied, it is set to the
    /// current time minus the clock drift tolerance; the TTL is capped at the
    /// RAMF maximum.
    pub fn new(
        recipient_address: String,
        sender_certificate: Certificate,
        payload_serialized: Vec<u8>,
        options: MessageOptions,
    ) -> Cargo {
        let creation_date = options.creation_date.unwrap_or_else(|| {
            Utc::now() - Duration::hours(CARGO_CLOCK_DRIFT_TOLERANCE_HOURS)
        });
        let ttl = options.ttl.map(|ttl| ttl.min(MAX_TTL_SECONDS));
        let options = MessageOptions {
            creation_date: Some(creation_date),
            ttl,
            ..options
        };
        Cargo {
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
            CARGO_MESSAGE_TYPE,
            CARGO_MESSAGE_VERSION,
            sender_private_key,
            signature_options,
        )
    }

    pub fn deserialize(serialization: &[u8]) -> Result<Cargo> {
        let message = ramf::deserialize(serialization, CARGO_MESSAGE_TYPE, CARGO_MESSAGE_VERSION)?;
        Ok(Cargo { message })
    }

    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.message.expiry_date()
    }
}

impl std::ops::Deref for Cargo {
    type Target = RamfMessage;

    fn deref(&self) -> &RamfMessage {
        &self.message
    }
}
