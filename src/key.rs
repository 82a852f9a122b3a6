//! Key generation, signing, and signature verification.
//!
//! All key material is held by RustCrypto types. Generation is generic over
//! [`rand_core::CryptoRngCore`] so callers can thread a deterministic RNG
//! through (see [`crate::builder::CertificateBuilder::with_seed`]); the
//! per-algorithm convenience constructors draw from the operating system.

use der::asn1::BitString;
use ecdsa::signature::{Signer, Verifier};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use ed25519_dalek::VerifyingKey as Ed25519VerifyingKey;
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use rand_core::{CryptoRngCore, OsRng};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{CertForgeError, Result};

/// Key algorithms a descriptor may request.
///
/// The default matches what certificate tooling commonly mints when nothing
/// is specified: ECDSA over P-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAlgorithm {
    /// RSA with a 2048-bit modulus.
    Rsa2048,
    /// RSA with a 3072-bit modulus.
    Rsa3072,
    /// RSA with a 4096-bit modulus.
    Rsa4096,
    /// ECDSA over NIST P-256.
    #[default]
    EcdsaP256,
    /// ECDSA over NIST P-384.
    EcdsaP384,
    /// Ed25519.
    Ed25519,
}

/// An asymmetric key pair usable for certificate signing.
#[derive(Debug, Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generates a key pair of the given algorithm, drawing from `rng`.
    ///
    /// This is the entry point the certificate builder uses; passing a
    /// seeded CSPRNG here makes key material reproducible.
    pub fn generate(algorithm: KeyAlgorithm, rng: &mut impl CryptoRngCore) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Rsa2048 => Self::generate_rsa_with(2048, rng),
            KeyAlgorithm::Rsa3072 => Self::generate_rsa_with(3072, rng),
            KeyAlgorithm::Rsa4096 => Self::generate_rsa_with(4096, rng),
            KeyAlgorithm::EcdsaP256 => {
                let signing_key = P256SigningKey::random(rng);
                let verifying_key = *signing_key.verifying_key();
                Ok(KeyPair::EcdsaP256 {
                    signing_key,
                    verifying_key,
                })
            }
            KeyAlgorithm::EcdsaP384 => {
                let signing_key = P384SigningKey::random(rng);
                let verifying_key = *signing_key.verifying_key();
                Ok(KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                })
            }
            KeyAlgorithm::Ed25519 => {
                let signing_key = Ed25519SigningKey::generate(rng);
                Ok(KeyPair::Ed25519 { signing_key })
            }
        }
    }

    fn generate_rsa_with(bits: usize, rng: &mut impl CryptoRngCore) -> Result<Self> {
        let private = RsaPrivateKey::new(rng, bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generates an RSA key pair with the given modulus size using OS entropy.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        Self::generate_rsa_with(bits, &mut OsRng)
    }

    /// Generates an ECDSA P-256 key pair using OS entropy.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generates an ECDSA P-384 key pair using OS entropy.
    pub fn generate_ecdsa_p384() -> Self {
        let signing_key = P384SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generates an Ed25519 key pair using OS entropy.
    pub fn generate_ed25519() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut OsRng);
        KeyPair::Ed25519 { signing_key }
    }

    /// The algorithm this key pair was generated for.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { public, .. } => match rsa::traits::PublicKeyParts::size(public) * 8 {
                3072 => KeyAlgorithm::Rsa3072,
                4096 => KeyAlgorithm::Rsa4096,
                _ => KeyAlgorithm::Rsa2048,
            },
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// Encodes the public half as a SubjectPublicKeyInfo structure.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }

    /// Signs `data` with this key.
    ///
    /// ECDSA signatures are DER-encoded as X.509 requires; RSA uses
    /// PKCS#1 v1.5 with SHA-256; P-256/P-384 hash with SHA-256/SHA-384
    /// respectively.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key =
                    rsa::pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                let signature: rsa::pkcs1v15::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningError(e.to_string()))?;
                Ok(rsa::signature::SignatureEncoding::to_vec(&signature))
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature: ed25519_dalek::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningError(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Exports the private key as PKCS#8 DER.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        use pkcs8::EncodePrivateKey;
        let doc = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der(),
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_der(),
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_der(),
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_der(),
        }
        .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Exports the private key as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        use pkcs8::EncodePrivateKey;
        let pem = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_pem(pkcs8::LineEnding::LF),
            KeyPair::EcdsaP256 { signing_key, .. } => {
                signing_key.to_pkcs8_pem(pkcs8::LineEnding::LF)
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                signing_key.to_pkcs8_pem(pkcs8::LineEnding::LF)
            }
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_pem(pkcs8::LineEnding::LF),
        }
        .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Imports a private key from PKCS#8 DER, detecting the algorithm from
    /// the PrivateKeyInfo header.
    pub fn import_from_pkcs8_der(der_bytes: &[u8]) -> Result<Self> {
        use pkcs8::DecodePrivateKey;
        let info = pkcs8::PrivateKeyInfo::try_from(der_bytes)
            .map_err(|e| CertForgeError::MalformedInputError(e.to_string()))?;
        match info.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => {
                let private = RsaPrivateKey::from_pkcs8_der(der_bytes)
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                let public = RsaPublicKey::from(&private);
                Ok(KeyPair::Rsa {
                    private: Box::new(private),
                    public,
                })
            }
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = info
                    .algorithm
                    .parameters_oid()
                    .map_err(|e| CertForgeError::MalformedInputError(e.to_string()))?;
                match curve {
                    const_oid::db::rfc5912::SECP_256_R_1 => {
                        let signing_key = P256SigningKey::from_pkcs8_der(der_bytes)
                            .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                        let verifying_key = *signing_key.verifying_key();
                        Ok(KeyPair::EcdsaP256 {
                            signing_key,
                            verifying_key,
                        })
                    }
                    const_oid::db::rfc5912::SECP_384_R_1 => {
                        let signing_key = P384SigningKey::from_pkcs8_der(der_bytes)
                            .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                        let verifying_key = *signing_key.verifying_key();
                        Ok(KeyPair::EcdsaP384 {
                            signing_key,
                            verifying_key,
                        })
                    }
                    oid => Err(CertForgeError::InvalidInput(format!(
                        "unsupported elliptic curve {oid}"
                    ))),
                }
            }
            const_oid::db::rfc8410::ID_ED_25519 => {
                let signing_key = Ed25519SigningKey::from_pkcs8_der(der_bytes)
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                Ok(KeyPair::Ed25519 { signing_key })
            }
            oid => Err(CertForgeError::InvalidInput(format!(
                "unsupported key algorithm {oid}"
            ))),
        }
    }

    /// Imports a private key from PKCS#8 PEM.
    pub fn import_from_pkcs8_pem(pem_str: &str) -> Result<Self> {
        let parsed = pem::parse(pem_str)?;
        if parsed.tag() != "PRIVATE KEY" {
            return Err(CertForgeError::MalformedInputError(format!(
                "expected PRIVATE KEY armor, found {}",
                parsed.tag()
            )));
        }
        Self::import_from_pkcs8_der(parsed.contents())
    }
}

/// The public half of a [`KeyPair`], also obtainable from a parsed
/// certificate's SubjectPublicKeyInfo.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    /// Extracts the public key from a key pair.
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Encodes this key as a SubjectPublicKeyInfo structure.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone()),
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::Ed25519(verifying_key) => {
                // Ed25519 SPKI carries the raw 32-byte point, no parameters.
                let pk_bytes = verifying_key.to_bytes();
                return Ok(SubjectPublicKeyInfoOwned {
                    algorithm: x509_cert::spki::AlgorithmIdentifierOwned {
                        oid: const_oid::db::rfc8410::ID_ED_25519,
                        parameters: None,
                    },
                    subject_public_key: BitString::from_bytes(&pk_bytes)
                        .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
                });
            }
        };
        spki.map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Decodes a SubjectPublicKeyInfo structure into a public key.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let raw = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| {
                CertForgeError::DecodingError("public key has unused bits".to_string())
            })?;
        match spki.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => {
                use rsa::pkcs1::DecodeRsaPublicKey;
                let public = RsaPublicKey::from_pkcs1_der(raw)
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                Ok(PublicKey::Rsa(public))
            }
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .ok_or_else(|| {
                        CertForgeError::DecodingError("missing EC curve parameters".to_string())
                    })?
                    .decode_as::<const_oid::ObjectIdentifier>()
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                match curve {
                    const_oid::db::rfc5912::SECP_256_R_1 => {
                        P256VerifyingKey::from_sec1_bytes(raw)
                            .map(PublicKey::EcdsaP256)
                            .map_err(|e| CertForgeError::DecodingError(e.to_string()))
                    }
                    const_oid::db::rfc5912::SECP_384_R_1 => {
                        P384VerifyingKey::from_sec1_bytes(raw)
                            .map(PublicKey::EcdsaP384)
                            .map_err(|e| CertForgeError::DecodingError(e.to_string()))
                    }
                    oid => Err(CertForgeError::InvalidInput(format!(
                        "unsupported elliptic curve {oid}"
                    ))),
                }
            }
            const_oid::db::rfc8410::ID_ED_25519 => {
                let bytes: [u8; 32] = raw.try_into().map_err(|_| {
                    CertForgeError::DecodingError("Ed25519 key must be 32 bytes".to_string())
                })?;
                let verifying_key = Ed25519VerifyingKey::from_bytes(&bytes)
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                Ok(PublicKey::Ed25519(verifying_key))
            }
            oid => Err(CertForgeError::InvalidInput(format!(
                "unsupported key algorithm {oid}"
            ))),
        }
    }

    /// Checks `signature` over `message` under this key.
    ///
    /// Returns `false` for any malformed or non-verifying signature; the
    /// distinction is not interesting to chain validation.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Rsa(public) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                match rsa::pkcs1v15::Signature::try_from(signature) {
                    Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
                    Err(_) => false,
                }
            }
            PublicKey::EcdsaP256(verifying_key) => {
                match p256::ecdsa::Signature::from_der(signature) {
                    Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
                    Err(_) => false,
                }
            }
            PublicKey::EcdsaP384(verifying_key) => {
                match p384::ecdsa::Signature::from_der(signature) {
                    Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
                    Err(_) => false,
                }
            }
            PublicKey::Ed25519(verifying_key) => {
                match ed25519_dalek::Signature::try_from(signature) {
                    Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
                    Err(_) => false,
                }
            }
        }
    }
}
