//! Channel session keys and the receive-side session glue.
//!
//! A session key is an ephemeral ECDH public key published under an 8-byte
//! random id. The private half lives in a [`PrivateKeyStore`], either unbound
//! (an initial key any peer may use once) or bound to one peer.

use crate::cms::SessionEnvelopedData;
use crate::error::Result;
use crate::keys::{generate_key_id, EcdhCurve, EcdhPrivateKey, EcdhPublicKey};
use crate::keystore::PrivateKeyStore;

/// The public half of a channel session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    /// 8-byte random identifier.
    pub key_id: Vec<u8>,
    pub public_key: EcdhPublicKey,
}

/// A freshly generated session key pair.
pub struct SessionKeyPair {
    pub session_key: SessionKey,
    pub private_key: EcdhPrivateKey,
}

impl SessionKeyPair {
    /// Generate a P-256 session key pair.
    pub fn generate() -> Result<SessionKeyPair> {
        Self::generate_on_curve(EcdhCurve::default())
    }

    pub fn generate_on_curve(curve: EcdhCurve) -> Result<SessionKeyPair> {
        let private_key = EcdhPrivateKey::generate(curve);
        let session_key = SessionKey {
            key_id: generate_key_id(),
            public_key: private_key.public_key(),
        };
        Ok(SessionKeyPair {
            session_key,
            private_key,
        })
    }
}

/// Decrypt a session-enveloped payload by resolving the recipient session
/// private key from the store.
///
/// When the peer is already known its bound key is accepted; otherwise only
/// an unbound (initial) key will do. Returns the plaintext together with the
/// originator's session key, which the caller should persist bound to the
/// peer so the channel can continue.
pub async fn decrypt_session_payload(
    enveloped_data: &SessionEnvelopedData,
    store: &dyn PrivateKeyStore,
    private_address: &str,
    peer_private_address: Option<&str>,
) -> Result<(Vec<u8>, SessionKey)> {
    let key_id = enveloped_data.recipient_key_id()?;
    let session_private_key = match peer_private_address {
        Some(peer) => {
            store
                .retrieve_session_key(&key_id, private_address, peer)
                .await?
        }
        None => {
            store
                .retrieve_unbound_session_key(&key_id, private_address)
                .await?
        }
    };
    let plaintext = enveloped_data.decrypt(&session_private_key)?;
    let originator_key = enveloped_data.originator_key()?;
    Ok((plaintext, originator_key))
}
