//! Connection parameters advertised by a public node.

use der::asn1::OctetString;
use der::{Decode, Encode, Sequence};
use rsa::RsaPublicKey;

use crate::der_visible_string::VisibleString;
use crate::error::{AwalaError, Result};
use crate::keys::{self, EcdhPublicKey};
use crate::session::SessionKey;

/// The parameters a public node publishes so private nodes can reach it:
/// its public address, identity key and current session key.
#[derive(Debug, Clone)]
pub struct PublicNodeConnectionParams {
    pub public_address: String,
    pub identity_key: RsaPublicKey,
    pub session_key: SessionKey,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SessionKeySchema {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    key_id: OctetString,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT")]
    public_key: OctetString,
}

// Only the two same-typed sessionKey members are context-tagged; the outer
// fields keep their universal tags.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct ParamsSchema {
    public_address: VisibleString,
    identity_key: OctetString,
    session_key: SessionKeySchema,
}

impl PublicNodeConnectionParams {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        validate_public_address(&self.public_address)?;
        let schema = ParamsSchema {
            public_address: VisibleString::new(&self.public_address).map_err(|e| {
                AwalaError::InvalidMessage(format!("Public address is not a visible string: {e}"))
            })?,
            identity_key: OctetString::new(keys::public_key_to_der(&self.identity_key)?)
                .map_err(|e| {
                    AwalaError::InvalidMessage(format!("Failed to encode identity key: {e}"))
                })?,
            session_key: SessionKeySchema {
                key_id: OctetString::new(self.session_key.key_id.clone()).map_err(|e| {
                    AwalaError::InvalidMessage(format!("Failed to encode session key id: {e}"))
                })?,
                public_key: OctetString::new(self.session_key.public_key.to_der()?).map_err(
                    |e| AwalaError::InvalidMessage(format!("Failed to encode session key: {e}")),
                )?,
            },
        };
        schema
            .to_der()
            .map_err(|e| AwalaError::InvalidMessage(format!("Failed to encode parameters: {e}")))
    }

    pub fn deserialize(serialization: &[u8]) -> Result<PublicNodeConnectionParams> {
        let schema = ParamsSchema::from_der(serialization).map_err(|e| {
            AwalaError::InvalidMessage(format!("Invalid connection parameters: {e}"))
        })?;
        let public_address = schema.public_address.as_str().to_owned();
        validate_public_address(&public_address)?;
        let identity_key =
            keys::public_key_from_der(schema.identity_key.as_bytes()).map_err(|e| {
                AwalaError::InvalidMessage(format!("Invalid identity key: {e}"))
            })?;
        let public_key = EcdhPublicKey::from_der(schema.session_key.public_key.as_bytes())
            .map_err(|e| AwalaError::InvalidMessage(format!("Invalid session key: {e}")))?;
        Ok(PublicNodeConnectionParams {
            public_address,
            identity_key,
            session_key: SessionKey {
                key_id: schema.session_key.key_id.as_bytes().to_vec(),
                public_key,
            },
        })
    }
}

/// A public address is a hostname, or a URL when it carries a scheme.
pub fn validate_public_address(address: &str) -> Result<()> {
    if address.contains("://") {
        url::Url::parse(address).map_err(|_| {
            AwalaError::InvalidMessage(format!("Public address is an invalid URL ({address})"))
        })?;
        return Ok(());
    }
    if is_valid_hostname(address) {
        Ok(())
    } else {
        Err(AwalaError::InvalidMessage(format!(
            "Public address is not a valid hostname ({address})"
        )))
    }
}

fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || 253 < hostname.len() {
        return false;
    }
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for label in &labels {
        if label.is_empty()
            || 63 < label.len()
            || label.starts_with('-')
            || label.ends_with('-')
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return false;
        }
    }
    // The TLD must be alphabetic.
    labels
        .last()
        .map(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false)
}
