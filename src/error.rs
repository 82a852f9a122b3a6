use thiserror::Error;

/// Result type used throughout certforge for construction-side operations.
pub type Result<T> = std::result::Result<T, CertForgeError>;

/// Represents errors that can occur while resolving, building, or
/// serializing certificates.
///
/// Verification outcomes are deliberately not part of this enum; a failed
/// chain verification is a routine result the caller branches on, and is
/// reported as [`crate::verify::VerificationError`] instead.
#[derive(Debug, Error, Clone)]
pub enum CertForgeError {
    /// The descriptor graph contains an issuer cycle.
    #[error("issuer cycle detected at '{0}'")]
    CycleError(String),

    /// An issuer reference points at a descriptor the arena does not hold.
    #[error("dangling issuer reference: {0}")]
    DanglingIssuerError(String),

    /// Key generation failed (entropy exhaustion, prime generation, ...).
    #[error("key generation failed: {0}")]
    KeyGenerationError(String),

    /// Signing failed, typically because issuer key material is unusable.
    #[error("signing failed: {0}")]
    SigningError(String),

    /// Structurally invalid PEM or DER input.
    #[error("malformed input: {0}")]
    MalformedInputError(String),

    /// Error during data encoding.
    #[error("failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<der::Error> for CertForgeError {
    fn from(err: der::Error) -> Self {
        CertForgeError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertForgeError {
    fn from(err: rsa::Error) -> Self {
        CertForgeError::KeyGenerationError(err.to_string())
    }
}

impl From<pem::PemError> for CertForgeError {
    fn from(err: pem::PemError) -> Self {
        CertForgeError::MalformedInputError(err.to_string())
    }
}
