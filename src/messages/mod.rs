//! Concrete RAMF message types and payload helpers.

mod cargo;
mod cargo_message_set;
mod parcel;

pub use cargo::{Cargo, CARGO_CLOCK_DRIFT_TOLERANCE_HOURS, CARGO_MESSAGE_TYPE, CARGO_MESSAGE_VERSION};
pub use cargo_message_set::{
    batch_messages_serialized, CargoMessageSet, CargoMessageSetBatch, CargoMessageWithExpiry,
    MAX_SDU_PLAINTEXT_LENGTH,
};
pub use parcel::{Parcel, PARCEL_MESSAGE_TYPE, PARCEL_MESSAGE_VERSION};

use crate::certificate::Certificate;
use crate::cms::{
    EncryptionOptions, SessionEncryptionResult, SessionEnvelopedData, SessionlessEnvelopedData,
};
use crate::error::{AwalaError, Result};
use crate::session::SessionKey;

fn check_sdu_length(sdu: &[u8]) -> Result<()> {
    if MAX_SDU_PLAINTEXT_LENGTH < sdu.len() {
        return Err(AwalaError::RamfSyntax(format!(
            "Service data unit must not exceed {MAX_SDU_PLAINTEXT_LENGTH} octets ({} octets given)",
            sdu.len()
        )));
    }
    Ok(())
}

/// Envelope a service data unit to the recipient's identity certificate
/// (sessionless channel).
pub fn encrypt_payload_sessionless(
    sdu: &[u8],
    recipient_certificate: &Certificate,
    options: EncryptionOptions,
) -> Result<Vec<u8>> {
    check_sdu_length(sdu)?;
    SessionlessEnvelopedData::encrypt(sdu, recipient_certificate, options)?.serialize()
}

/// Envelope a service data unit to the recipient's session key, returning the
/// serialization together with the originator key pair to persist.
pub fn encrypt_payload(
    sdu: &[u8],
    recipient_session_key: &SessionKey,
    options: EncryptionOptions,
) -> Result<(Vec<u8>, SessionEncryptionResult)> {
    check_sdu_length(sdu)?;
    let result = SessionEnvelopedData::encrypt(sdu, recipient_session_key, options)?;
    let serialization = result.enveloped_data.serialize()?;
    Ok((serialization, result))
}
