use thiserror::Error;

/// Error types for the awala-core crate
#[derive(Error, Debug)]
pub enum AwalaError {
    /// Structural violation of the RAMF format: framing, bounds, ASN.1 decoding.
    #[error("RAMF syntax error: {0}")]
    RamfSyntax(String),

    /// Semantically invalid message content once the syntax was accepted.
    #[error("RAMF validation error: {0}")]
    RamfValidation(String),

    /// Failure in CMS (de)serialization, encryption or decryption.
    #[error("CMS error: {0}")]
    Cms(String),

    /// X.509 structure, validity-window or path-validation failure.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Persistence failure reported by a key/certificate store backend.
    #[error("Key store error: {0}")]
    KeyStore(String),

    /// Lookup target absent, owned by a different node or bound to a different peer.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// Malformed higher-level message (e.g. PublicNodeConnectionParams).
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Key material that could not be generated, parsed or serialized.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, AwalaError>;
