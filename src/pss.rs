//! RSA-PSS signing helpers shared by certificate issuance and CMS SignedData.

use der::{Any, Sequence};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::error::{AwalaError, Result};
use crate::keys::HashAlgorithm;
use crate::oids;

/// RSASSA-PSS-params (RFC 4055). The trailer field keeps its default and is
/// never encoded.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct RsaPssParams {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    pub hash: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT")]
    pub mask_gen: AlgorithmIdentifierOwned,
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT")]
    pub salt_length: u8,
}

/// The id-RSASSA-PSS AlgorithmIdentifier for the given digest, with MGF1 over
/// the same digest and salt length equal to the digest length.
pub(crate) fn algorithm_identifier(hash: HashAlgorithm) -> Result<AlgorithmIdentifierOwned> {
    let hash_alg = AlgorithmIdentifierOwned {
        oid: hash.oid(),
        parameters: None,
    };
    let mask_gen = AlgorithmIdentifierOwned {
        oid: oids::ID_MGF1,
        parameters: Some(
            Any::encode_from(&hash_alg)
                .map_err(|e| AwalaError::Cms(format!("Failed to encode MGF1 parameters: {e}")))?,
        ),
    };
    let params = RsaPssParams {
        hash: hash_alg,
        mask_gen,
        salt_length: hash.digest_len() as u8,
    };
    Ok(AlgorithmIdentifierOwned {
        oid: oids::ID_RSASSA_PSS,
        parameters: Some(
            Any::encode_from(&params)
                .map_err(|e| AwalaError::Cms(format!("Failed to encode PSS parameters: {e}")))?,
        ),
    })
}

/// Recover the digest from an id-RSASSA-PSS AlgorithmIdentifier.
pub(crate) fn hash_from_algorithm(algorithm: &AlgorithmIdentifierOwned) -> Result<HashAlgorithm> {
    if algorithm.oid != oids::ID_RSASSA_PSS {
        return Err(AwalaError::Cms(format!(
            "Unsupported signature algorithm: {}",
            algorithm.oid
        )));
    }
    match &algorithm.parameters {
        None => Ok(HashAlgorithm::Sha256),
        Some(parameters) => {
            let params: RsaPssParams = parameters
                .decode_as()
                .map_err(|e| AwalaError::Cms(format!("Malformed PSS parameters: {e}")))?;
            HashAlgorithm::from_oid(&params.hash.oid)
        }
    }
}

pub(crate) fn sign(
    private_key: &RsaPrivateKey,
    hash: HashAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();
    let signature = match hash {
        HashAlgorithm::Sha256 => SigningKey::<Sha256>::new(private_key.clone())
            .sign_with_rng(&mut rng, data)
            .to_vec(),
        HashAlgorithm::Sha384 => SigningKey::<Sha384>::new(private_key.clone())
            .sign_with_rng(&mut rng, data)
            .to_vec(),
        HashAlgorithm::Sha512 => SigningKey::<Sha512>::new(private_key.clone())
            .sign_with_rng(&mut rng, data)
            .to_vec(),
    };
    Ok(signature)
}

pub(crate) fn verify(
    public_key: &RsaPublicKey,
    hash: HashAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let signature = Signature::try_from(signature)
        .map_err(|e| AwalaError::Cms(format!("Malformed PSS signature: {e}")))?;
    let outcome = match hash {
        HashAlgorithm::Sha256 => {
            VerifyingKey::<Sha256>::new(public_key.clone()).verify(data, &signature)
        }
        HashAlgorithm::Sha384 => {
            VerifyingKey::<Sha384>::new(public_key.clone()).verify(data, &signature)
        }
        HashAlgorithm::Sha512 => {
            VerifyingKey::<Sha512>::new(public_key.clone()).verify(data, &signature)
        }
    };
    outcome.map_err(|e| AwalaError::Cms(format!("Signature verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_rsa_key_pair, IdentityKeyOptions};

    #[test]
    fn sign_verify_round_trip() {
        let pair = generate_rsa_key_pair(&IdentityKeyOptions::default()).unwrap();
        let signature = sign(&pair.private_key, HashAlgorithm::Sha256, b"payload").unwrap();
        verify(&pair.public_key, HashAlgorithm::Sha256, b"payload", &signature).unwrap();
        assert!(verify(&pair.public_key, HashAlgorithm::Sha256, b"tampered", &signature).is_err());
    }

    #[test]
    fn algorithm_identifier_round_trips_hash() {
        for hash in [
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let alg = algorithm_identifier(hash).unwrap();
            assert_eq!(hash_from_algorithm(&alg).unwrap(), hash);
        }
    }
}
