//! Certificate representation, encoding/decoding, and parsed-field access.

pub mod extensions;
pub mod params;

use der::{Decode, DecodePem, Encode, EncodePem};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{CertForgeError, Result};
use crate::key::{KeyPair, PublicKey};
use extensions::{
    BasicConstraints, NameConstraints, SanEntry, SubjectAltName, ToAndFromX509Extension,
};

/// Signature algorithms certforge can emit, with their OID mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA (P-256).
    Sha256WithECDSA,
    /// SHA-384 with ECDSA (P-384).
    Sha384WithECDSA,
    /// Ed25519 (pure EdDSA).
    Ed25519,
}

impl SignatureAlgorithm {
    /// The algorithm a certificate signed by `key_pair` will carry.
    pub fn for_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    fn from(value: SignatureAlgorithm) -> Self {
        let oid = match value {
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        };
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid,
            parameters: None,
        }
    }
}

/// A signed X.509 certificate.
///
/// Equality is structural over the full DER content, so a decoded
/// certificate compares equal to the one it was encoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Decodes a certificate from DER bytes.
    pub fn from_der(der_bytes: &[u8]) -> Result<Self> {
        CertificateInner::from_der(der_bytes)
            .map(|inner| Certificate { inner })
            .map_err(|e| CertForgeError::MalformedInputError(e.to_string()))
    }

    /// Decodes a certificate from a PEM block.
    ///
    /// Bad armor markers, truncated base64, or a non-DER body all report
    /// [`CertForgeError::MalformedInputError`].
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        CertificateInner::from_pem(pem_str)
            .map(|inner| Certificate { inner })
            .map_err(|e| CertForgeError::MalformedInputError(e.to_string()))
    }

    /// The subject distinguished name.
    pub fn subject(&self) -> params::DistinguishedName {
        params::DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    /// The issuer distinguished name.
    pub fn issuer(&self) -> params::DistinguishedName {
        params::DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// The certificate serial number bytes.
    pub fn serial_number(&self) -> Vec<u8> {
        self.inner
            .tbs_certificate
            .serial_number
            .as_bytes()
            .to_vec()
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> OffsetDateTime {
        x509_time_to_offset(&self.inner.tbs_certificate.validity.not_before)
    }

    /// End of the validity window.
    pub fn not_after(&self) -> OffsetDateTime {
        x509_time_to_offset(&self.inner.tbs_certificate.validity.not_after)
    }

    /// The subject alternative names, in certificate order. Empty when the
    /// extension is absent.
    pub fn subject_alt_names(&self) -> Result<Vec<SanEntry>> {
        match self.extension_value(SubjectAltName::OID) {
            Some(value) => {
                SubjectAltName::from_x509_extension_value(&value).map(|san| san.entries)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Whether the certificate carries BasicConstraints with `CA:TRUE`.
    pub fn is_ca(&self) -> bool {
        self.extension_value(BasicConstraints::OID)
            .and_then(|value| BasicConstraints::from_x509_extension_value(&value).ok())
            .map(|bc| bc.is_ca)
            .unwrap_or(false)
    }

    /// The name constraints this certificate imposes on certificates below
    /// it, if any.
    pub fn name_constraints(&self) -> Option<NameConstraints> {
        self.extension_value(NameConstraints::OID)
            .and_then(|value| NameConstraints::from_x509_extension_value(&value).ok())
    }

    /// The subject public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// DER bytes of the TBS structure, the exact content the signature
    /// covers.
    pub fn tbs_der(&self) -> Result<Vec<u8>> {
        self.inner
            .tbs_certificate
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// The raw signature bytes.
    pub fn signature_bytes(&self) -> Result<&[u8]> {
        self.inner.signature.as_bytes().ok_or_else(|| {
            CertForgeError::DecodingError("signature has unused bits".to_string())
        })
    }

    fn extension_value(&self, oid: const_oid::ObjectIdentifier) -> Option<Vec<u8>> {
        self.inner
            .tbs_certificate
            .extensions
            .as_ref()?
            .iter()
            .find(|ext| ext.extn_id == oid)
            .map(|ext| ext.extn_value.as_bytes().to_vec())
    }
}

fn x509_time_to_offset(t: &x509_cert::time::Time) -> OffsetDateTime {
    match t {
        x509_cert::time::Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        x509_cert::time::Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
