//! RFC 5280-style chain verification against a caller-supplied trust store.
//!
//! Path building is depth-first from the leaf toward any trusted root, with
//! intermediates filling the gaps. Success is existential over candidate
//! paths; when none validates, the first failure of the first attempted path
//! is reported.

use time::OffsetDateTime;

use crate::cert::Certificate;
use crate::cert::extensions::SanEntry;
use crate::error::{CertForgeError, Result};

/// Why a certificate chain failed to verify.
///
/// Variants carry the subject of the offending certificate so callers can
/// report which link broke.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// No path from the leaf reaches a trusted root, or the root set is
    /// empty.
    #[error("no path to a trusted root")]
    NoTrustAnchor,

    /// A certificate on the path expired before the verification time.
    #[error("certificate '{0}' has expired")]
    Expired(String),

    /// A certificate on the path is not yet valid at the verification time.
    #[error("certificate '{0}' is not yet valid")]
    NotYetValid(String),

    /// A signature on the path does not verify under the issuer's key.
    #[error("signature on certificate '{0}' does not verify")]
    SignatureInvalid(String),

    /// An issuer on the path lacks BasicConstraints CA:TRUE.
    #[error("certificate '{0}' is not a certificate authority")]
    NotACertificateAuthority(String),

    /// A DNS name violates a name constraint imposed by an ancestor.
    #[error("name constraint violation: {0}")]
    NameConstraintViolation(String),
}

/// The set of certificates a verification call trusts.
///
/// Roots are trust anchors; intermediates are untrusted helpers available
/// for path building. The store is supplied per call and never mutated by
/// verification.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    roots: Vec<Certificate>,
    intermediates: Vec<Certificate>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trust anchor.
    pub fn add_root(&mut self, certificate: Certificate) {
        self.roots.push(certificate);
    }

    /// Adds an untrusted intermediate available for path building.
    pub fn add_intermediate(&mut self, certificate: Certificate) {
        self.intermediates.push(certificate);
    }

    /// Adds every certificate in a PEM bundle as a trust anchor.
    pub fn add_roots_pem(&mut self, bundle: &str) -> Result<()> {
        for certificate in parse_pem_bundle(bundle)? {
            self.roots.push(certificate);
        }
        Ok(())
    }

    /// Adds every certificate in a PEM bundle as an intermediate.
    pub fn add_intermediates_pem(&mut self, bundle: &str) -> Result<()> {
        for certificate in parse_pem_bundle(bundle)? {
            self.intermediates.push(certificate);
        }
        Ok(())
    }

    pub fn roots(&self) -> &[Certificate] {
        &self.roots
    }

    pub fn intermediates(&self) -> &[Certificate] {
        &self.intermediates
    }
}

fn parse_pem_bundle(bundle: &str) -> Result<Vec<Certificate>> {
    let blocks = pem::parse_many(bundle)?;
    blocks
        .iter()
        .map(|block| {
            if block.tag() != "CERTIFICATE" {
                return Err(CertForgeError::MalformedInputError(format!(
                    "expected CERTIFICATE armor, found {}",
                    block.tag()
                )));
            }
            Certificate::from_der(block.contents())
        })
        .collect()
}

/// Verifies `leaf` against `store` at the instant `at`.
///
/// Every certificate on the accepted path must be within its validity
/// window at `at`, carry a signature that verifies under its issuer's key
/// (roots verify their own), descend only from CA certificates, and satisfy
/// the DNS name constraints of every ancestor.
pub fn verify(
    leaf: &Certificate,
    store: &TrustStore,
    at: OffsetDateTime,
) -> std::result::Result<(), VerificationError> {
    if store.roots.is_empty() {
        return Err(VerificationError::NoTrustAnchor);
    }

    let paths = build_paths(leaf, store);
    let mut first_failure = None;
    for path in &paths {
        match validate_path(path, at) {
            Ok(()) => return Ok(()),
            Err(failure) => {
                first_failure.get_or_insert(failure);
            }
        }
    }
    Err(first_failure.unwrap_or(VerificationError::NoTrustAnchor))
}

fn issued_by(child: &Certificate, issuer: &Certificate) -> bool {
    child.inner.tbs_certificate.issuer == issuer.inner.tbs_certificate.subject
}

/// All candidate paths from `leaf` to a trust anchor, leaf first, anchor
/// last. Each certificate appears at most once per path, so issuer loops
/// among intermediates terminate.
fn build_paths<'a>(leaf: &'a Certificate, store: &'a TrustStore) -> Vec<Vec<&'a Certificate>> {
    let mut paths = Vec::new();
    let mut current = vec![leaf];
    extend_path(&mut current, store, &mut paths);
    paths
}

fn extend_path<'a>(
    current: &mut Vec<&'a Certificate>,
    store: &'a TrustStore,
    paths: &mut Vec<Vec<&'a Certificate>>,
) {
    let last = current[current.len() - 1];

    // The tail is itself a trust anchor (self-signed leaf or root cert
    // presented directly).
    if store.roots.iter().any(|root| root == last) {
        paths.push(current.clone());
    }

    for root in &store.roots {
        if root != last && issued_by(last, root) && !current.iter().any(|c| *c == root) {
            current.push(root);
            paths.push(current.clone());
            current.pop();
        }
    }

    for intermediate in &store.intermediates {
        if intermediate != last
            && issued_by(last, intermediate)
            && !current.iter().any(|c| *c == intermediate)
        {
            current.push(intermediate);
            extend_path(current, store, paths);
            current.pop();
        }
    }
}

fn validate_path(
    path: &[&Certificate],
    at: OffsetDateTime,
) -> std::result::Result<(), VerificationError> {
    for (i, cert) in path.iter().enumerate() {
        let subject = cert.subject().to_string();

        if at < cert.not_before() {
            return Err(VerificationError::NotYetValid(subject));
        }
        if at > cert.not_after() {
            return Err(VerificationError::Expired(subject));
        }

        // Roots verify their own signature.
        let issuer = path.get(i + 1).copied().unwrap_or(cert);
        let issuer_key = issuer
            .public_key()
            .map_err(|_| VerificationError::SignatureInvalid(subject.clone()))?;
        let tbs = cert
            .tbs_der()
            .map_err(|_| VerificationError::SignatureInvalid(subject.clone()))?;
        let signature = cert
            .signature_bytes()
            .map_err(|_| VerificationError::SignatureInvalid(subject.clone()))?;
        if !issuer_key.verify(&tbs, signature) {
            return Err(VerificationError::SignatureInvalid(subject));
        }

        if let Some(issuer) = path.get(i + 1) {
            if !issuer.is_ca() {
                return Err(VerificationError::NotACertificateAuthority(
                    issuer.subject().to_string(),
                ));
            }
        }
    }

    for (i, cert) in path.iter().enumerate() {
        let sans = cert.subject_alt_names().map_err(|_| {
            VerificationError::NameConstraintViolation(format!(
                "unreadable subject alternative names on '{}'",
                cert.subject()
            ))
        })?;
        let dns_names: Vec<&str> = sans
            .iter()
            .filter_map(|entry| match entry {
                SanEntry::Dns(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        if dns_names.is_empty() {
            continue;
        }
        for ancestor in &path[i + 1..] {
            if let Some(constraints) = ancestor.name_constraints() {
                for name in &dns_names {
                    if !constraints.permits_dns(name) {
                        return Err(VerificationError::NameConstraintViolation(format!(
                            "'{}' on certificate '{}' is not permitted by '{}'",
                            name,
                            cert.subject(),
                            ancestor.subject()
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}
