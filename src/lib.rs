//! Awala core – RAMF messaging, channel sessions and PKI
//!
//! This crate implements the Awala (Relaynet) message format and its
//! supporting cryptography: the RAMF envelope, CMS SignedData and
//! EnvelopedData wrappers, X.509 issuance and path validation, the channel
//! session protocol, and the abstract key/certificate store contracts.

pub mod certificate;
pub mod cms;
pub mod error;
pub mod keys;
pub mod keystore;
pub mod messages;
pub mod node_connection;
pub mod oids;
pub mod pki;
pub mod ramf;
pub mod session;

mod der_visible_string;
mod pss;

pub use error::{AwalaError, Result};

pub use keys::{
    derive_private_address, generate_rsa_key_pair, EcdhCurve, EcdhPrivateKey, EcdhPublicKey,
    HashAlgorithm, IdentityKeyOptions, IdentityKeyPair,
};

pub use certificate::{Certificate, IssuanceOptions};

pub use cms::{
    EncryptionOptions, EnvelopedData, SessionEncryptionResult, SessionEnvelopedData,
    SessionlessEnvelopedData, SignatureOptions, SignedData,
};

pub use ramf::{MessageOptions, RamfMessage};

pub use messages::{
    batch_messages_serialized, encrypt_payload, encrypt_payload_sessionless, Cargo,
    CargoMessageSet, CargoMessageSetBatch, CargoMessageWithExpiry, Parcel,
    MAX_SDU_PLAINTEXT_LENGTH,
};

pub use session::{decrypt_session_payload, SessionKey, SessionKeyPair};

pub use keystore::{
    CertificateData, CertificateStore, MockCertificateStore, MockPrivateKeyStore,
    MockPublicKeyStore, PrivateKeyStore, PublicKeyStore, SessionPrivateKeyData,
    SessionPublicKeyData, StoreBackendError,
};

pub use pki::{
    delivery_authorization_needs_renewal, issue_delivery_authorization,
    issue_endpoint_certificate, issue_gateway_certificate, CertificationPath, PkiIssuanceOptions,
};

pub use node_connection::PublicNodeConnectionParams;
