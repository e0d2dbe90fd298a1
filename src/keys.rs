//! Identity and session key primitives.
//!
//! Identity keys are RSA-PSS pairs; session keys are ECDH pairs on the NIST
//! curves. A node's private address is derived from its identity public key.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::RngCore;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{AwalaError, Result};
use crate::oids;

/// Digest algorithms accepted for signatures and key generation.
///
/// SHA-1 is deliberately unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn oid(&self) -> der::asn1::ObjectIdentifier {
        match self {
            HashAlgorithm::Sha256 => oids::ID_SHA256,
            HashAlgorithm::Sha384 => oids::ID_SHA384,
            HashAlgorithm::Sha512 => oids::ID_SHA512,
        }
    }

    pub fn from_oid(oid: &der::asn1::ObjectIdentifier) -> Result<Self> {
        match *oid {
            oids::ID_SHA256 => Ok(HashAlgorithm::Sha256),
            oids::ID_SHA384 => Ok(HashAlgorithm::Sha384),
            oids::ID_SHA512 => Ok(HashAlgorithm::Sha512),
            _ => Err(AwalaError::Cms(format!("Unsupported digest algorithm: {oid}"))),
        }
    }

    /// Digest output length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

pub(crate) fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// Options for identity key generation.
#[derive(Debug, Clone, Copy)]
pub struct IdentityKeyOptions {
    pub modulus_bits: usize,
    pub hash: HashAlgorithm,
}

impl Default for IdentityKeyOptions {
    fn default() -> Self {
        Self {
            modulus_bits: MIN_RSA_MODULUS_BITS,
            hash: HashAlgorithm::Sha256,
        }
    }
}

/// An RSA-PSS identity key pair together with the derived private address.
#[derive(Debug, Clone)]
pub struct IdentityKeyPair {
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
    pub private_address: String,
}

/// Generate a fresh RSA identity key pair.
pub fn generate_rsa_key_pair(options: &IdentityKeyOptions) -> Result<IdentityKeyPair> {
    if options.modulus_bits < MIN_RSA_MODULUS_BITS {
        return Err(AwalaError::InvalidKey(format!(
            "RSA modulus must be at least {MIN_RSA_MODULUS_BITS} bits ({} requested)",
            options.modulus_bits
        )));
    }
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), options.modulus_bits)
        .map_err(|e| AwalaError::InvalidKey(format!("RSA key generation failed: {e}")))?;
    let public_key = private_key.to_public_key();
    let private_address = derive_private_address(&public_key)?;
    Ok(IdentityKeyPair {
        private_key,
        public_key,
        private_address,
    })
}

/// Derive a node's private address from its identity public key.
///
/// The address is the fixed version octet `0` followed by the lowercase hex
/// SHA-256 of the key's SPKI DER.
pub fn derive_private_address(public_key: &RsaPublicKey) -> Result<String> {
    let spki_der = public_key
        .to_public_key_der()
        .map_err(|e| AwalaError::InvalidKey(format!("Failed to encode public key SPKI: {e}")))?;
    Ok(format!("0{}", hex::encode(Sha256::digest(spki_der.as_bytes()))))
}

/// Serialize an RSA private key to PKCS#8 DER.
pub fn private_key_to_der(private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
    private_key
        .to_pkcs8_der()
        .map(|der| der.as_bytes().to_vec())
        .map_err(|e| AwalaError::InvalidKey(format!("PKCS#8 encoding error: {e}")))
}

/// Parse an RSA private key from PKCS#8 DER.
pub fn private_key_from_der(der_bytes: &[u8]) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_der(der_bytes)
        .map_err(|e| AwalaError::InvalidKey(format!("PKCS#8 decoding error: {e}")))
}

/// Serialize an RSA public key to SPKI DER.
pub fn public_key_to_der(public_key: &RsaPublicKey) -> Result<Vec<u8>> {
    public_key
        .to_public_key_der()
        .map(|der| der.as_bytes().to_vec())
        .map_err(|e| AwalaError::InvalidKey(format!("SPKI encoding error: {e}")))
}

/// Parse an RSA public key from SPKI DER.
pub fn public_key_from_der(der_bytes: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der_bytes)
        .map_err(|e| AwalaError::InvalidKey(format!("SPKI decoding error: {e}")))
}

/// NIST curves supported for channel session keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcdhCurve {
    #[default]
    P256,
    P384,
    P521,
}

impl EcdhCurve {
    pub fn oid(&self) -> der::asn1::ObjectIdentifier {
        match self {
            EcdhCurve::P256 => oids::ID_SECP256R1,
            EcdhCurve::P384 => oids::ID_SECP384R1,
            EcdhCurve::P521 => oids::ID_SECP521R1,
        }
    }

    pub fn from_oid(oid: &der::asn1::ObjectIdentifier) -> Result<Self> {
        match *oid {
            oids::ID_SECP256R1 => Ok(EcdhCurve::P256),
            oids::ID_SECP384R1 => Ok(EcdhCurve::P384),
            oids::ID_SECP521R1 => Ok(EcdhCurve::P521),
            _ => Err(AwalaError::InvalidKey(format!("Unsupported EC curve: {oid}"))),
        }
    }
}

/// An ECDH private key on one of the supported curves.
#[derive(Clone)]
pub enum EcdhPrivateKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl std::fmt::Debug for EcdhPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdhPrivateKey")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

impl EcdhPrivateKey {
    pub fn generate(curve: EcdhCurve) -> Self {
        let mut rng = rand::thread_rng();
        match curve {
            EcdhCurve::P256 => EcdhPrivateKey::P256(p256::SecretKey::random(&mut rng)),
            EcdhCurve::P384 => EcdhPrivateKey::P384(p384::SecretKey::random(&mut rng)),
            EcdhCurve::P521 => EcdhPrivateKey::P521(p521::SecretKey::random(&mut rng)),
        }
    }

    pub fn curve(&self) -> EcdhCurve {
        match self {
            EcdhPrivateKey::P256(_) => EcdhCurve::P256,
            EcdhPrivateKey::P384(_) => EcdhCurve::P384,
            EcdhPrivateKey::P521(_) => EcdhCurve::P521,
        }
    }

    pub fn public_key(&self) -> EcdhPublicKey {
        match self {
            EcdhPrivateKey::P256(key) => EcdhPublicKey::P256(key.public_key()),
            EcdhPrivateKey::P384(key) => EcdhPublicKey::P384(key.public_key()),
            EcdhPrivateKey::P521(key) => EcdhPublicKey::P521(key.public_key()),
        }
    }

    /// Serialize to PKCS#8 DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            EcdhPrivateKey::P256(key) => key.to_pkcs8_der(),
            EcdhPrivateKey::P384(key) => key.to_pkcs8_der(),
            EcdhPrivateKey::P521(key) => key.to_pkcs8_der(),
        };
        document
            .map(|der| der.as_bytes().to_vec())
            .map_err(|e| AwalaError::InvalidKey(format!("PKCS#8 encoding error: {e}")))
    }

    /// Parse from PKCS#8 DER, detecting the curve from the key's algorithm.
    pub fn from_der(der_bytes: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::SecretKey::from_pkcs8_der(der_bytes) {
            return Ok(EcdhPrivateKey::P256(key));
        }
        if let Ok(key) = p384::SecretKey::from_pkcs8_der(der_bytes) {
            return Ok(EcdhPrivateKey::P384(key));
        }
        p521::SecretKey::from_pkcs8_der(der_bytes)
            .map(EcdhPrivateKey::P521)
            .map_err(|e| AwalaError::InvalidKey(format!("Unsupported EC private key: {e}")))
    }
}

/// An ECDH public key on one of the supported curves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcdhPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl EcdhPublicKey {
    pub fn curve(&self) -> EcdhCurve {
        match self {
            EcdhPublicKey::P256(_) => EcdhCurve::P256,
            EcdhPublicKey::P384(_) => EcdhCurve::P384,
            EcdhPublicKey::P521(_) => EcdhCurve::P521,
        }
    }

    /// Serialize to SPKI DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            EcdhPublicKey::P256(key) => key.to_public_key_der(),
            EcdhPublicKey::P384(key) => key.to_public_key_der(),
            EcdhPublicKey::P521(key) => key.to_public_key_der(),
        };
        document
            .map(|der| der.as_bytes().to_vec())
            .map_err(|e| AwalaError::InvalidKey(format!("SPKI encoding error: {e}")))
    }

    /// Parse from SPKI DER, detecting the curve from the algorithm parameters.
    pub fn from_der(der_bytes: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::PublicKey::from_public_key_der(der_bytes) {
            return Ok(EcdhPublicKey::P256(key));
        }
        if let Ok(key) = p384::PublicKey::from_public_key_der(der_bytes) {
            return Ok(EcdhPublicKey::P384(key));
        }
        p521::PublicKey::from_public_key_der(der_bytes)
            .map(EcdhPublicKey::P521)
            .map_err(|e| AwalaError::InvalidKey(format!("Unsupported EC public key: {e}")))
    }

    /// Uncompressed SEC1 point.
    pub fn to_uncompressed_point(&self) -> Vec<u8> {
        match self {
            EcdhPublicKey::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            EcdhPublicKey::P384(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            EcdhPublicKey::P521(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Reconstruct from a SEC1 point on a known curve.
    pub fn from_sec1_bytes(curve: EcdhCurve, point: &[u8]) -> Result<Self> {
        match curve {
            EcdhCurve::P256 => p256::PublicKey::from_sec1_bytes(point)
                .map(EcdhPublicKey::P256)
                .map_err(|e| AwalaError::InvalidKey(format!("Invalid P-256 point: {e}"))),
            EcdhCurve::P384 => p384::PublicKey::from_sec1_bytes(point)
                .map(EcdhPublicKey::P384)
                .map_err(|e| AwalaError::InvalidKey(format!("Invalid P-384 point: {e}"))),
            EcdhCurve::P521 => p521::PublicKey::from_sec1_bytes(point)
                .map(EcdhPublicKey::P521)
                .map_err(|e| AwalaError::InvalidKey(format!("Invalid P-521 point: {e}"))),
        }
    }
}

/// ECDH key exchange between a private key and a peer public key.
///
/// Both keys must be on the same curve.
pub(crate) fn ecdh_shared_secret(
    private_key: &EcdhPrivateKey,
    public_key: &EcdhPublicKey,
) -> Result<Vec<u8>> {
    match (private_key, public_key) {
        (EcdhPrivateKey::P256(sk), EcdhPublicKey::P256(pk)) => Ok(
            p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                .raw_secret_bytes()
                .to_vec(),
        ),
        (EcdhPrivateKey::P384(sk), EcdhPublicKey::P384(pk)) => Ok(
            p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                .raw_secret_bytes()
                .to_vec(),
        ),
        (EcdhPrivateKey::P521(sk), EcdhPublicKey::P521(pk)) => Ok(
            p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine())
                .raw_secret_bytes()
                .to_vec(),
        ),
        _ => Err(AwalaError::InvalidKey(format!(
            "Key agreement requires matching curves ({:?} vs {:?})",
            private_key.curve(),
            public_key.curve()
        ))),
    }
}

/// Generate a random 64-bit key id as an 8-byte identifier.
pub(crate) fn generate_key_id() -> Vec<u8> {
    let mut id = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut id);
    id.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_address_is_versioned_sha256_of_spki() {
        let pair = generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap();
        let spki = public_key_to_der(&pair.public_key).unwrap();
        let expected = format!("0{}", hex::encode(Sha256::digest(&spki)));
        assert_eq!(pair.private_address, expected);
        // Idempotent across calls.
        assert_eq!(derive_private_address(&pair.public_key).unwrap(), expected);
    }

    #[test]
    fn small_rsa_modulus_is_rejected() {
        let options = IdentityKeyOptions {
            modulus_bits: 1024,
            hash: HashAlgorithm::Sha256,
        };
        assert!(matches!(
            generate_rsa_key_pair(&options),
            Err(AwalaError::InvalidKey(_))
        ));
    }

    #[test]
    fn ecdh_key_round_trips_through_pkcs8() {
        let key = EcdhPrivateKey::generate(EcdhCurve::P256);
        let der = key.to_der().unwrap();
        let restored = EcdhPrivateKey::from_der(&der).unwrap();
        assert_eq!(restored.curve(), EcdhCurve::P256);
        assert_eq!(
            key.public_key().to_uncompressed_point(),
            restored.public_key().to_uncompressed_point()
        );
    }

    #[test]
    fn shared_secret_is_symmetric() {
        let a = EcdhPrivateKey::generate(EcdhCurve::P384);
        let b = EcdhPrivateKey::generate(EcdhCurve::P384);
        let ab = ecdh_shared_secret(&a, &b.public_key()).unwrap();
        let ba = ecdh_shared_secret(&b, &a.public_key()).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn mismatched_curves_are_rejected() {
        let a = EcdhPrivateKey::generate(EcdhCurve::P256);
        let b = EcdhPrivateKey::generate(EcdhCurve::P384);
        assert!(ecdh_shared_secret(&a, &b.public_key()).is_err());
    }
}
