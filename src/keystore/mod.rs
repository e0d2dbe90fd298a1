//! Abstract key and certificate stores.
//!
//! Each store is a trait with backend primitives (the persistence surface an
//! implementation provides) and provided public operations implementing the
//! lifecycle rules. Backend failures are opaque errors that the provided
//! operations wrap with the affected key id or subject address.

pub mod certificates;
pub mod private_keys;
pub mod public_keys;
pub mod testing;

pub use certificates::{CertificateData, CertificateStore};
pub use private_keys::{PrivateKeyStore, SessionPrivateKeyData};
pub use public_keys::{PublicKeyStore, SessionPublicKeyData};
pub use testing::{MockCertificateStore, MockPrivateKeyStore, MockPublicKeyStore};

/// Opaque failure reported by a persistence backend.
pub type StoreBackendError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type BackendResult<T> = std::result::Result<T, StoreBackendError>;
