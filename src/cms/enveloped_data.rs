//! CMS EnvelopedData: sessionless (key transport) and session (key agreement)
//! payload encryption.
//!
//! The two variants form a tagged sum distinguished at parse time by the sole
//! RecipientInfo. Content encryption is AES-CBC; session key agreement is
//! ECDH single-pass with the X9.63 KDF and AES key wrap.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cms::cert::IssuerAndSerialNumber;
use cms::content_info::CmsVersion;
use cms::enveloped_data::{
    EncryptedContentInfo, EnvelopedData as CmsEnvelopedData, KeyAgreeRecipientIdentifier,
    KeyAgreeRecipientInfo, KeyTransRecipientInfo, OriginatorIdentifierOrKey, OriginatorPublicKey,
    RecipientEncryptedKey, RecipientIdentifier, RecipientInfo, RecipientInfos,
    RecipientKeyIdentifier,
};
use der::asn1::{BitString, ObjectIdentifier, OctetString, SetOfVec};
use der::{Any, Sequence};
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey};
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::SubjectKeyIdentifier;

use crate::certificate::Certificate;
use crate::cms::{attribute, decode_content_info, encode_content_info, single_attribute_value};
use crate::error::{AwalaError, Result};
use crate::keys::{self, generate_key_id, EcdhPrivateKey, EcdhPublicKey};
use crate::oids;
use crate::session::SessionKey;

const AES_BLOCK_SIZE: usize = 16;

/// Options for payload encryption.
#[derive(Debug, Clone, Copy)]
pub struct EncryptionOptions {
    /// AES key size in bits: 128, 192 or 256.
    pub aes_key_size: usize,
}

impl Default for EncryptionOptions {
    fn default() -> Self {
        Self { aes_key_size: 128 }
    }
}

impl EncryptionOptions {
    fn key_length(&self) -> Result<usize> {
        match self.aes_key_size {
            128 | 192 | 256 => Ok(self.aes_key_size / 8),
            _ => Err(AwalaError::Cms(format!(
                "Invalid AES key size ({} is not 128, 192 or 256)",
                self.aes_key_size
            ))),
        }
    }
}

/// A CMS EnvelopedData value with exactly one recipient.
#[derive(Debug, Clone)]
pub enum EnvelopedData {
    Sessionless(SessionlessEnvelopedData),
    Session(SessionEnvelopedData),
}

impl EnvelopedData {
    /// Parse a ContentInfo-wrapped EnvelopedData, branching on the variant of
    /// its sole RecipientInfo.
    pub fn deserialize(der_bytes: &[u8]) -> Result<EnvelopedData> {
        let content = decode_content_info(der_bytes, oids::ID_ENVELOPED_DATA)?;
        let inner: CmsEnvelopedData = content
            .decode_as()
            .map_err(|e| AwalaError::Cms(format!("Malformed EnvelopedData: {e}")))?;
        if inner.recip_infos.0.len() != 1 {
            return Err(AwalaError::Cms(format!(
                "EnvelopedData must have exactly one RecipientInfo ({} found)",
                inner.recip_infos.0.len()
            )));
        }
        let is_session = match inner.recip_infos.0.iter().next() {
            Some(RecipientInfo::Ktri(_)) => false,
            Some(RecipientInfo::Kari(_)) => true,
            _ => {
                return Err(AwalaError::Cms(
                    "RecipientInfo must use key transport or key agreement".to_string(),
                ))
            }
        };
        if is_session {
            Ok(EnvelopedData::Session(SessionEnvelopedData { inner }))
        } else {
            Ok(EnvelopedData::Sessionless(SessionlessEnvelopedData { inner }))
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        match self {
            EnvelopedData::Sessionless(value) => value.serialize(),
            EnvelopedData::Session(value) => value.serialize(),
        }
    }

    /// The id of the key the payload was encrypted to: the recipient
    /// certificate's serial number (sessionless) or the recipient session key
    /// id (session).
    pub fn recipient_key_id(&self) -> Result<Vec<u8>> {
        match self {
            EnvelopedData::Sessionless(value) => value.recipient_key_id(),
            EnvelopedData::Session(value) => value.recipient_key_id(),
        }
    }
}

/// Key-transport encryption to the recipient's RSA identity key.
#[derive(Debug, Clone)]
pub struct SessionlessEnvelopedData {
    inner: CmsEnvelopedData,
}

impl SessionlessEnvelopedData {
    /// Encrypt `plaintext` to the RSA key in the recipient certificate.
    pub fn encrypt(
        plaintext: &[u8],
        recipient_certificate: &Certificate,
        options: EncryptionOptions,
    ) -> Result<SessionlessEnvelopedData> {
        let key_length = options.key_length()?;
        let cek = random_bytes(key_length);
        let (content_enc_alg, encrypted_content) = encrypt_content(&cek, plaintext)?;

        let recipient_public_key = recipient_certificate.subject_rsa_public_key()?;
        let encrypted_key = recipient_public_key
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), &cek)
            .map_err(|e| AwalaError::Cms(format!("RSA-OAEP encryption failed: {e}")))?;

        let recipient_info = RecipientInfo::Ktri(KeyTransRecipientInfo {
            version: CmsVersion::V0,
            rid: RecipientIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: recipient_certificate.issuer_name().clone(),
                serial_number: recipient_certificate.serial().clone(),
            }),
            key_enc_alg: oaep_algorithm_identifier()?,
            enc_key: OctetString::new(encrypted_key)
                .map_err(|e| AwalaError::Cms(format!("Failed to encode encrypted key: {e}")))?,
        });

        let inner = CmsEnvelopedData {
            version: CmsVersion::V0,
            originator_info: None,
            recip_infos: RecipientInfos(
                SetOfVec::try_from(vec![recipient_info])
                    .map_err(|e| AwalaError::Cms(format!("Failed to build recipient info: {e}")))?,
            ),
            encrypted_content: EncryptedContentInfo {
                content_type: oids::ID_DATA,
                content_enc_alg,
                encrypted_content: Some(encrypted_content),
            },
            unprotected_attrs: None,
        };
        Ok(SessionlessEnvelopedData { inner })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode_content_info(oids::ID_ENVELOPED_DATA, &self.inner)
    }

    /// The recipient certificate's serial number.
    pub fn recipient_key_id(&self) -> Result<Vec<u8>> {
        let ktri = self.ktri()?;
        match &ktri.rid {
            RecipientIdentifier::IssuerAndSerialNumber(sid) => {
                Ok(sid.serial_number.as_bytes().to_vec())
            }
            RecipientIdentifier::SubjectKeyIdentifier(key_id) => Ok(key_id.0.as_bytes().to_vec()),
        }
    }

    /// Decrypt with the recipient's RSA identity private key.
    pub fn decrypt(&self, private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
        let ktri = self.ktri()?;
        if ktri.key_enc_alg.oid != oids::ID_RSAES_OAEP {
            return Err(AwalaError::Cms(format!(
                "Unsupported key encryption algorithm: {}",
                ktri.key_enc_alg.oid
            )));
        }
        let cek = private_key
            .decrypt(Oaep::new::<Sha256>(), ktri.enc_key.as_bytes())
            .map_err(|e| AwalaError::Cms(format!("RSA-OAEP decryption failed: {e}")))?;
        decrypt_content(&cek, &self.inner.encrypted_content)
    }

    fn ktri(&self) -> Result<&KeyTransRecipientInfo> {
        match self.inner.recip_infos.0.iter().next() {
            Some(RecipientInfo::Ktri(ktri)) => Ok(ktri),
            _ => Err(AwalaError::Cms(
                "EnvelopedData does not use key transport".to_string(),
            )),
        }
    }
}

/// Result of a session encryption: the new originator session key pair plus
/// the enveloped payload. The caller should persist the private key bound to
/// the recipient so responses can be decrypted.
pub struct SessionEncryptionResult {
    pub dh_private_key: EcdhPrivateKey,
    pub dh_key_id: Vec<u8>,
    pub enveloped_data: SessionEnvelopedData,
}

/// Key-agreement encryption to a recipient session key.
#[derive(Debug, Clone)]
pub struct SessionEnvelopedData {
    inner: CmsEnvelopedData,
}

impl SessionEnvelopedData {
    /// Encrypt `plaintext` to the recipient session key, generating a fresh
    /// originator ephemeral key pair on the same curve.
    pub fn encrypt(
        plaintext: &[u8],
        recipient_session_key: &SessionKey,
        options: EncryptionOptions,
    ) -> Result<SessionEncryptionResult> {
        let key_length = options.key_length()?;
        let cek = random_bytes(key_length);
        let (content_enc_alg, encrypted_content) = encrypt_content(&cek, plaintext)?;

        let curve = recipient_session_key.public_key.curve();
        let dh_private_key = EcdhPrivateKey::generate(curve);
        let dh_key_id = generate_key_id();

        let shared_secret =
            keys::ecdh_shared_secret(&dh_private_key, &recipient_session_key.public_key)?;
        let wrap_algorithm = AlgorithmIdentifierOwned {
            oid: aes_wrap_oid(key_length)?,
            parameters: None,
        };
        let kek = derive_kek(&shared_secret, &wrap_algorithm, key_length)?;
        let encrypted_key = wrap_key(&kek, &cek)?;

        let originator_point = dh_private_key.public_key().to_uncompressed_point();
        let originator = OriginatorIdentifierOrKey::OriginatorKey(OriginatorPublicKey {
            algorithm: AlgorithmIdentifierOwned {
                oid: oids::ID_EC_PUBLIC_KEY,
                parameters: Some(Any::encode_from(&curve.oid()).map_err(|e| {
                    AwalaError::Cms(format!("Failed to encode curve parameters: {e}"))
                })?),
            },
            public_key: BitString::from_bytes(&originator_point).map_err(|e| {
                AwalaError::Cms(format!("Failed to encode originator key: {e}"))
            })?,
        });

        let recipient_key_id = OctetString::new(recipient_session_key.key_id.clone())
            .map_err(|e| AwalaError::Cms(format!("Failed to encode recipient key id: {e}")))?;
        let recipient_info = RecipientInfo::Kari(KeyAgreeRecipientInfo {
            version: CmsVersion::V3,
            originator,
            ukm: None,
            key_enc_alg: AlgorithmIdentifierOwned {
                oid: oids::ID_DH_SINGLE_PASS_STD_DH_SHA256_KDF,
                parameters: Some(Any::encode_from(&wrap_algorithm).map_err(|e| {
                    AwalaError::Cms(format!("Failed to encode key wrap algorithm: {e}"))
                })?),
            },
            recipient_enc_keys: vec![RecipientEncryptedKey {
                rid: KeyAgreeRecipientIdentifier::RKeyId(RecipientKeyIdentifier {
                    subject_key_identifier: SubjectKeyIdentifier(recipient_key_id),
                    date: None,
                    other: None,
                }),
                enc_key: OctetString::new(encrypted_key)
                    .map_err(|e| AwalaError::Cms(format!("Failed to encode wrapped key: {e}")))?,
            }],
        });

        let key_id_attribute = attribute(
            oids::ID_ORIGINATOR_KEY_ID,
            &OctetString::new(dh_key_id.clone())
                .map_err(|e| AwalaError::Cms(format!("Failed to encode originator key id: {e}")))?,
        )?;

        let inner = CmsEnvelopedData {
            version: CmsVersion::V2,
            originator_info: None,
            recip_infos: RecipientInfos(
                SetOfVec::try_from(vec![recipient_info])
                    .map_err(|e| AwalaError::Cms(format!("Failed to build recipient info: {e}")))?,
            ),
            encrypted_content: EncryptedContentInfo {
                content_type: oids::ID_DATA,
                content_enc_alg,
                encrypted_content: Some(encrypted_content),
            },
            unprotected_attrs: Some(
                SetOfVec::try_from(vec![key_id_attribute]).map_err(|e| {
                    AwalaError::Cms(format!("Failed to build unprotected attributes: {e}"))
                })?,
            ),
        };

        Ok(SessionEncryptionResult {
            dh_private_key,
            dh_key_id,
            enveloped_data: SessionEnvelopedData { inner },
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode_content_info(oids::ID_ENVELOPED_DATA, &self.inner)
    }

    /// The recipient session key id.
    pub fn recipient_key_id(&self) -> Result<Vec<u8>> {
        let kari = self.kari()?;
        let encrypted_key = kari.recipient_enc_keys.first().ok_or_else(|| {
            AwalaError::Cms("KeyAgreeRecipientInfo has no encrypted keys".to_string())
        })?;
        match &encrypted_key.rid {
            KeyAgreeRecipientIdentifier::RKeyId(rid) => {
                Ok(rid.subject_key_identifier.0.as_bytes().to_vec())
            }
            _ => Err(AwalaError::Cms(
                "Recipient must be identified by its session key id".to_string(),
            )),
        }
    }

    /// The originator's ephemeral session key: the 64-bit key id from the
    /// unprotected attributes plus the EC public key from the recipient info.
    pub fn originator_key(&self) -> Result<SessionKey> {
        let kari = self.kari()?;
        let OriginatorIdentifierOrKey::OriginatorKey(originator) = &kari.originator else {
            return Err(AwalaError::Cms(
                "Originator must be identified by its public key".to_string(),
            ));
        };
        if originator.algorithm.oid != oids::ID_EC_PUBLIC_KEY {
            return Err(AwalaError::Cms(format!(
                "Unsupported originator key algorithm: {}",
                originator.algorithm.oid
            )));
        }
        let curve_parameters = originator.algorithm.parameters.as_ref().ok_or_else(|| {
            AwalaError::Cms("Originator key does not specify a curve".to_string())
        })?;
        let curve_oid: ObjectIdentifier = curve_parameters
            .decode_as()
            .map_err(|e| AwalaError::Cms(format!("Malformed curve parameters: {e}")))?;
        let curve = keys::EcdhCurve::from_oid(&curve_oid)
            .map_err(|e| AwalaError::Cms(e.to_string()))?;
        let point = originator.public_key.as_bytes().ok_or_else(|| {
            AwalaError::Cms("Originator key bit string is malformed".to_string())
        })?;
        let public_key = EcdhPublicKey::from_sec1_bytes(curve, point)
            .map_err(|e| AwalaError::Cms(format!("Invalid originator key: {e}")))?;

        let attributes = self.inner.unprotected_attrs.as_ref().ok_or_else(|| {
            AwalaError::Cms("EnvelopedData is missing the originator key id attribute".to_string())
        })?;
        let key_id_value = single_attribute_value(attributes.iter(), oids::ID_ORIGINATOR_KEY_ID)?;
        let key_id: OctetString = key_id_value
            .decode_as()
            .map_err(|e| AwalaError::Cms(format!("Malformed originator key id: {e}")))?;

        Ok(SessionKey {
            key_id: key_id.as_bytes().to_vec(),
            public_key,
        })
    }

    /// Decrypt with the recipient's session private key.
    pub fn decrypt(&self, session_private_key: &EcdhPrivateKey) -> Result<Vec<u8>> {
        let kari = self.kari()?;
        if kari.key_enc_alg.oid != oids::ID_DH_SINGLE_PASS_STD_DH_SHA256_KDF {
            return Err(AwalaError::Cms(format!(
                "Unsupported key agreement algorithm: {}",
                kari.key_enc_alg.oid
            )));
        }
        let wrap_parameters = kari.key_enc_alg.parameters.as_ref().ok_or_else(|| {
            AwalaError::Cms("Key agreement algorithm is missing the wrap algorithm".to_string())
        })?;
        let wrap_algorithm: AlgorithmIdentifierOwned = wrap_parameters
            .decode_as()
            .map_err(|e| AwalaError::Cms(format!("Malformed key wrap algorithm: {e}")))?;
        let kek_length = aes_wrap_key_length(&wrap_algorithm.oid)?;

        let originator = self.originator_key()?;
        let shared_secret = keys::ecdh_shared_secret(session_private_key, &originator.public_key)
            .map_err(|e| AwalaError::Cms(e.to_string()))?;
        let kek = derive_kek(&shared_secret, &wrap_algorithm, kek_length)?;

        let encrypted_key = kari.recipient_enc_keys.first().ok_or_else(|| {
            AwalaError::Cms("KeyAgreeRecipientInfo has no encrypted keys".to_string())
        })?;
        let cek = unwrap_key(&kek, encrypted_key.enc_key.as_bytes())?;
        decrypt_content(&cek, &self.inner.encrypted_content)
    }

    fn kari(&self) -> Result<&KeyAgreeRecipientInfo> {
        match self.inner.recip_infos.0.iter().next() {
            Some(RecipientInfo::Kari(kari)) => Ok(kari),
            _ => Err(AwalaError::Cms(
                "EnvelopedData does not use key agreement".to_string(),
            )),
        }
    }
}

/// ECC-CMS-SharedInfo (RFC 5753 §7.2), the KDF shared info.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct EccCmsSharedInfo {
    key_info: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    entity_u_info: Option<OctetString>,
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT")]
    supp_pub_info: OctetString,
}

/// Derive the key-encryption key with the X9.63 KDF over SHA-256.
fn derive_kek(
    shared_secret: &[u8],
    wrap_algorithm: &AlgorithmIdentifierOwned,
    kek_length: usize,
) -> Result<Vec<u8>> {
    let kek_bits = (kek_length as u32) * 8;
    let shared_info = EccCmsSharedInfo {
        key_info: wrap_algorithm.clone(),
        entity_u_info: None,
        supp_pub_info: OctetString::new(kek_bits.to_be_bytes().to_vec())
            .map_err(|e| AwalaError::Cms(format!("Failed to encode KDF shared info: {e}")))?,
    };
    let shared_info_der = der::Encode::to_der(&shared_info)
        .map_err(|e| AwalaError::Cms(format!("Failed to encode KDF shared info: {e}")))?;

    let mut output = Vec::with_capacity(kek_length + Sha256::output_size());
    let mut counter: u32 = 1;
    while output.len() < kek_length {
        let mut hasher = Sha256::new();
        hasher.update(shared_secret);
        hasher.update(counter.to_be_bytes());
        hasher.update(&shared_info_der);
        output.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    output.truncate(kek_length);
    Ok(output)
}

fn wrap_key(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>> {
    match kek.len() {
        16 => aes_kw::Kek::<aes::Aes128>::try_from(kek)
            .map_err(|e| AwalaError::Cms(format!("Invalid KEK: {e}")))?
            .wrap_vec(cek)
            .map_err(|e| AwalaError::Cms(format!("Key wrap failed: {e}"))),
        24 => aes_kw::Kek::<aes::Aes192>::try_from(kek)
            .map_err(|e| AwalaError::Cms(format!("Invalid KEK: {e}")))?
            .wrap_vec(cek)
            .map_err(|e| AwalaError::Cms(format!("Key wrap failed: {e}"))),
        32 => aes_kw::Kek::<aes::Aes256>::try_from(kek)
            .map_err(|e| AwalaError::Cms(format!("Invalid KEK: {e}")))?
            .wrap_vec(cek)
            .map_err(|e| AwalaError::Cms(format!("Key wrap failed: {e}"))),
        length => Err(AwalaError::Cms(format!("Invalid KEK length: {length}"))),
    }
}

fn unwrap_key(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    match kek.len() {
        16 => aes_kw::Kek::<aes::Aes128>::try_from(kek)
            .map_err(|e| AwalaError::Cms(format!("Invalid KEK: {e}")))?
            .unwrap_vec(wrapped)
            .map_err(|e| AwalaError::Cms(format!("Key unwrap failed: {e}"))),
        24 => aes_kw::Kek::<aes::Aes192>::try_from(kek)
            .map_err(|e| AwalaError::Cms(format!("Invalid KEK: {e}")))?
            .unwrap_vec(wrapped)
            .map_err(|e| AwalaError::Cms(format!("Key unwrap failed: {e}"))),
        32 => aes_kw::Kek::<aes::Aes256>::try_from(kek)
            .map_err(|e| AwalaError::Cms(format!("Invalid KEK: {e}")))?
            .unwrap_vec(wrapped)
            .map_err(|e| AwalaError::Cms(format!("Key unwrap failed: {e}"))),
        length => Err(AwalaError::Cms(format!("Invalid KEK length: {length}"))),
    }
}

/// AES-CBC encrypt the content, returning the algorithm identifier (carrying
/// the IV) and the ciphertext.
fn encrypt_content(cek: &[u8], plaintext: &[u8]) -> Result<(AlgorithmIdentifierOwned, OctetString)> {
    let iv = random_bytes(AES_BLOCK_SIZE);
    let ciphertext = match cek.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(cek, &iv)
            .map_err(|e| AwalaError::Cms(format!("Invalid AES key or IV: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(cek, &iv)
            .map_err(|e| AwalaError::Cms(format!("Invalid AES key or IV: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(cek, &iv)
            .map_err(|e| AwalaError::Cms(format!("Invalid AES key or IV: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        length => return Err(AwalaError::Cms(format!("Invalid AES key length: {length}"))),
    };
    let algorithm = AlgorithmIdentifierOwned {
        oid: aes_cbc_oid(cek.len())?,
        parameters: Some(
            Any::encode_from(&OctetString::new(iv).map_err(|e| {
                AwalaError::Cms(format!("Failed to encode IV: {e}"))
            })?)
            .map_err(|e| AwalaError::Cms(format!("Failed to encode IV: {e}")))?,
        ),
    };
    let encrypted = OctetString::new(ciphertext)
        .map_err(|e| AwalaError::Cms(format!("Failed to encode ciphertext: {e}")))?;
    Ok((algorithm, encrypted))
}

fn decrypt_content(cek: &[u8], encrypted_content: &EncryptedContentInfo) -> Result<Vec<u8>> {
    let expected_key_length = aes_cbc_key_length(&encrypted_content.content_enc_alg.oid)?;
    if cek.len() != expected_key_length {
        return Err(AwalaError::Cms(format!(
            "Content encryption key length mismatch ({} vs {expected_key_length})",
            cek.len()
        )));
    }
    let iv_parameters = encrypted_content
        .content_enc_alg
        .parameters
        .as_ref()
        .ok_or_else(|| AwalaError::Cms("Content encryption is missing the IV".to_string()))?;
    let iv: OctetString = iv_parameters
        .decode_as()
        .map_err(|e| AwalaError::Cms(format!("Malformed IV: {e}")))?;
    let ciphertext = encrypted_content
        .encrypted_content
        .as_ref()
        .ok_or_else(|| AwalaError::Cms("EnvelopedData has no encrypted content".to_string()))?;

    let plaintext = match cek.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(cek, iv.as_bytes())
            .map_err(|e| AwalaError::Cms(format!("Invalid AES key or IV: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext.as_bytes()),
        24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(cek, iv.as_bytes())
            .map_err(|e| AwalaError::Cms(format!("Invalid AES key or IV: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext.as_bytes()),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(cek, iv.as_bytes())
            .map_err(|e| AwalaError::Cms(format!("Invalid AES key or IV: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext.as_bytes()),
        length => return Err(AwalaError::Cms(format!("Invalid AES key length: {length}"))),
    };
    plaintext.map_err(|e| AwalaError::Cms(format!("AES-CBC decryption failed: {e}")))
}

fn aes_cbc_oid(key_length: usize) -> Result<ObjectIdentifier> {
    match key_length {
        16 => Ok(oids::ID_AES128_CBC),
        24 => Ok(oids::ID_AES192_CBC),
        32 => Ok(oids::ID_AES256_CBC),
        _ => Err(AwalaError::Cms(format!("Invalid AES key length: {key_length}"))),
    }
}

fn aes_cbc_key_length(oid: &ObjectIdentifier) -> Result<usize> {
    match *oid {
        oids::ID_AES128_CBC => Ok(16),
        oids::ID_AES192_CBC => Ok(24),
        oids::ID_AES256_CBC => Ok(32),
        _ => Err(AwalaError::Cms(format!(
            "Unsupported content encryption algorithm: {oid}"
        ))),
    }
}

fn aes_wrap_oid(key_length: usize) -> Result<ObjectIdentifier> {
    match key_length {
        16 => Ok(oids::ID_AES128_WRAP),
        24 => Ok(oids::ID_AES192_WRAP),
        32 => Ok(oids::ID_AES256_WRAP),
        _ => Err(AwalaError::Cms(format!("Invalid AES key length: {key_length}"))),
    }
}

fn aes_wrap_key_length(oid: &ObjectIdentifier) -> Result<usize> {
    match *oid {
        oids::ID_AES128_WRAP => Ok(16),
        oids::ID_AES192_WRAP => Ok(24),
        oids::ID_AES256_WRAP => Ok(32),
        _ => Err(AwalaError::Cms(format!(
            "Unsupported key wrap algorithm: {oid}"
        ))),
    }
}

fn oaep_algorithm_identifier() -> Result<AlgorithmIdentifierOwned> {
    let sha256 = AlgorithmIdentifierOwned {
        oid: oids::ID_SHA256,
        parameters: None,
    };
    #[derive(Clone, Debug, Eq, PartialEq, Sequence)]
    struct RsaOaepParams {
        #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
        hash: AlgorithmIdentifierOwned,
        #[asn1(context_specific = "1", tag_mode = "EXPLICIT")]
        mask_gen: AlgorithmIdentifierOwned,
    }
    let params = RsaOaepParams {
        hash: sha256.clone(),
        mask_gen: AlgorithmIdentifierOwned {
            oid: oids::ID_MGF1,
            parameters: Some(
                Any::encode_from(&sha256)
                    .map_err(|e| AwalaError::Cms(format!("Failed to encode MGF1: {e}")))?,
            ),
        },
    };
    Ok(AlgorithmIdentifierOwned {
        oid: oids::ID_RSAES_OAEP,
        parameters: Some(
            Any::encode_from(&params)
                .map_err(|e| AwalaError::Cms(format!("Failed to encode OAEP parameters: {e}")))?,
        ),
    })
}

fn random_bytes(length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
