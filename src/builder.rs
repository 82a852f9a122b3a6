//! Resolves descriptor graphs into signed certificates.
//!
//! The builder walks the issuer chain root first, mints every ancestor that
//! is not already cached, and signs each certificate with its parent's key
//! (or its own key for roots). Artifacts are cached per descriptor and keyed
//! by the revisions of the full issuing chain: editing any descriptor
//! invalidates its artifact and those of all descendants on the next build.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore, SeedableRng};
use sha1::{Digest, Sha1};
use time::{Duration, OffsetDateTime};

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
    NameConstraints, SanEntry, SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::{DistinguishedName, ExtensionParam};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::descriptor::{CertificateDescriptor, DescriptorArena, DescriptorId};
use crate::error::{CertForgeError, Result};
use crate::key::{KeyAlgorithm, KeyPair};
use crate::tbs_certificate::TbsCertificate;

/// A minted certificate together with its key material and parsed fields.
///
/// Immutable once built; the builder hands out shared references via `Arc`.
#[derive(Debug, Clone)]
pub struct GeneratedCertificate {
    descriptor: DescriptorId,
    fingerprint: Vec<(DescriptorId, u64)>,
    key: KeyPair,
    certificate: Certificate,
    der: Vec<u8>,
    serial_number: Vec<u8>,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    subject_alt_names: Vec<SanEntry>,
}

impl GeneratedCertificate {
    /// The descriptor this artifact was built from.
    pub fn descriptor_id(&self) -> DescriptorId {
        self.descriptor
    }

    /// The signed certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The generated key pair.
    pub fn key_pair(&self) -> &KeyPair {
        &self.key
    }

    /// The signed certificate bytes (DER).
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The certificate serial number.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    /// Subject distinguished name.
    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    /// Issuer distinguished name (the parent's subject, or the subject
    /// itself for roots).
    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// Subject alternative names, in descriptor order.
    pub fn subject_alt_names(&self) -> &[SanEntry] {
        &self.subject_alt_names
    }

    /// PEM encoding of the certificate.
    pub fn to_pem(&self) -> Result<String> {
        self.certificate.to_pem()
    }

    /// PEM encoding of the private key (PKCS#8).
    pub fn key_to_pem(&self) -> Result<String> {
        self.key.to_pkcs8_pem()
    }
}

enum EntropySource {
    Os,
    Seeded(ChaCha20Rng),
}

impl EntropySource {
    fn generate_key(&mut self, algorithm: KeyAlgorithm) -> Result<KeyPair> {
        match self {
            EntropySource::Os => KeyPair::generate(algorithm, &mut OsRng),
            EntropySource::Seeded(rng) => KeyPair::generate(algorithm, rng),
        }
    }

    fn serial_number(&mut self) -> Vec<u8> {
        let mut bytes = [0u8; 16];
        match self {
            EntropySource::Os => OsRng.fill_bytes(&mut bytes),
            EntropySource::Seeded(rng) => rng.fill_bytes(&mut bytes),
        }
        // Positive with a nonzero leading octet, so the DER integer keeps
        // all 16 bytes and the encoded serial matches this one exactly.
        bytes[0] = (bytes[0] & 0x7f) | 0x40;
        bytes.to_vec()
    }
}

struct BuilderState {
    artifacts: HashMap<DescriptorId, Arc<GeneratedCertificate>>,
    entropy: EntropySource,
}

/// Mints certificates from descriptor graphs, caching results so each
/// descriptor is signed at most once per revision.
///
/// The cache is instance state, never module-level: two builders over the
/// same arena produce independent key material. The internal lock is held
/// across a build, so concurrent `build` calls for the same descriptor
/// observe exactly one signing.
pub struct CertificateBuilder {
    state: Mutex<BuilderState>,
}

impl CertificateBuilder {
    /// A builder drawing keys and serials from OS entropy.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BuilderState {
                artifacts: HashMap::new(),
                entropy: EntropySource::Os,
            }),
        }
    }

    /// A builder drawing keys and serials from a ChaCha20 stream seeded
    /// with `seed`.
    ///
    /// This is the explicit determinism option: two builders with the same
    /// seed, fed the same descriptor graph in the same build order, produce
    /// identical key material and serial numbers. Validity defaults still
    /// come from the clock, so byte-identical certificates additionally
    /// require explicit `not_before`/`not_after` on every descriptor.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Mutex::new(BuilderState {
                artifacts: HashMap::new(),
                entropy: EntropySource::Seeded(ChaCha20Rng::seed_from_u64(seed)),
            }),
        }
    }

    /// Builds (or retrieves from cache) the certificate for `id`,
    /// transitively building any unbuilt ancestors first.
    pub fn build(
        &self,
        arena: &DescriptorArena,
        id: DescriptorId,
    ) -> Result<Arc<GeneratedCertificate>> {
        let chain = arena.resolve_chain(id)?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| CertForgeError::SigningError("builder lock poisoned".to_string()))?;

        let mut fingerprint: Vec<(DescriptorId, u64)> = Vec::with_capacity(chain.len());
        let mut parent: Option<Arc<GeneratedCertificate>> = None;
        for link in chain {
            let descriptor = arena.get(link)?;
            fingerprint.push((link, arena.revision(link)?));

            let cached = state
                .artifacts
                .get(&link)
                .filter(|artifact| artifact.fingerprint == fingerprint)
                .cloned();
            let artifact = match cached {
                Some(artifact) => artifact,
                None => {
                    let artifact = Arc::new(issue(
                        &mut state.entropy,
                        link,
                        descriptor,
                        fingerprint.clone(),
                        parent.as_deref(),
                    )?);
                    state.artifacts.insert(link, artifact.clone());
                    artifact
                }
            };
            parent = Some(artifact);
        }

        parent.ok_or_else(|| CertForgeError::InvalidInput("empty descriptor chain".to_string()))
    }

    /// The full certificate chain for `id`, leaf first, root last.
    pub fn chain(
        &self,
        arena: &DescriptorArena,
        id: DescriptorId,
    ) -> Result<Vec<Arc<GeneratedCertificate>>> {
        self.build(arena, id)?;
        let ids = arena.resolve_chain(id)?;
        let state = self
            .state
            .lock()
            .map_err(|_| CertForgeError::SigningError("builder lock poisoned".to_string()))?;
        let mut chain = ids
            .into_iter()
            .map(|link| {
                state.artifacts.get(&link).cloned().ok_or_else(|| {
                    CertForgeError::SigningError("chain artifact missing from cache".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        chain.reverse();
        Ok(chain)
    }

    /// The full certificate chain for `id` as a concatenated PEM bundle,
    /// leaf first.
    pub fn chain_pem(&self, arena: &DescriptorArena, id: DescriptorId) -> Result<String> {
        let chain = self.chain(arena, id)?;
        let mut bundle = String::new();
        for artifact in chain {
            bundle.push_str(&artifact.to_pem()?);
        }
        Ok(bundle)
    }
}

impl Default for CertificateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn spki_key_identifier(key: &KeyPair) -> Result<Vec<u8>> {
    let spki = key.as_spki()?;
    let raw = spki.subject_public_key.raw_bytes();
    Ok(Sha1::digest(raw).to_vec())
}

fn issue(
    entropy: &mut EntropySource,
    id: DescriptorId,
    descriptor: &CertificateDescriptor,
    fingerprint: Vec<(DescriptorId, u64)>,
    parent: Option<&GeneratedCertificate>,
) -> Result<GeneratedCertificate> {
    let key = entropy.generate_key(descriptor.key_algorithm)?;
    let serial_number = entropy.serial_number();

    let not_before = descriptor
        .not_before
        .unwrap_or_else(OffsetDateTime::now_utc);
    let not_after = descriptor
        .not_after
        .unwrap_or_else(|| not_before + Duration::days(365));
    if not_after < not_before {
        return Err(CertForgeError::InvalidInput(format!(
            "descriptor '{}' expires before it becomes valid",
            descriptor.subject
        )));
    }

    let (signing_key, issuer_dn, issuer_serial) = match parent {
        Some(parent) => (
            parent.key_pair(),
            parent.subject().clone(),
            parent.serial_number().to_vec(),
        ),
        None => (&key, descriptor.subject.clone(), serial_number.clone()),
    };

    let signature_algorithm = SignatureAlgorithm::for_key_pair(signing_key);

    let mut extensions = vec![
        ExtensionParam::from_extension(
            &BasicConstraints {
                is_ca: descriptor.is_ca,
                max_path_length: None,
            },
            true,
        )?,
        ExtensionParam::from_extension(
            &SubjectKeyIdentifier {
                key_identifier: spki_key_identifier(&key)?,
            },
            false,
        )?,
        ExtensionParam::from_extension(
            &AuthorityKeyIdentifier {
                key_identifier: spki_key_identifier(signing_key)?,
                authority_cert_serial_number: issuer_serial,
            },
            false,
        )?,
    ];

    let key_usage = if descriptor.is_ca {
        KeyUsages::KeyCertSign | KeyUsages::CRLSign
    } else {
        KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
    };
    extensions.push(ExtensionParam::from_extension(&KeyUsage(key_usage), true)?);

    if !descriptor.usages.is_empty() {
        extensions.push(ExtensionParam::from_extension(
            &ExtendedKeyUsage {
                usage: descriptor.usages.clone(),
            },
            false,
        )?);
    }

    if !descriptor.subject_alt_names.is_empty() {
        extensions.push(ExtensionParam::from_extension(
            &SubjectAltName {
                entries: descriptor.subject_alt_names.clone(),
            },
            false,
        )?);
    }

    if let Some(permitted) = &descriptor.permitted_dns_names {
        extensions.push(ExtensionParam::from_extension(
            &NameConstraints {
                permitted_dns: permitted.clone(),
                excluded_dns: Vec::new(),
            },
            true,
        )?);
    }

    let tbs = TbsCertificate {
        serial_number: serial_number.clone(),
        signature_algorithm: signature_algorithm.clone(),
        issuer: issuer_dn.clone(),
        not_before,
        not_after,
        subject: descriptor.subject.clone(),
        subject_public_key: key.public_key(),
        extensions,
    };

    let tbs_inner = tbs.to_tbs_certificate_inner()?;
    let tbs_der = tbs
        .to_der()
        .map_err(|e| CertForgeError::SigningError(e.to_string()))?;
    let signature = signing_key.sign_data(&tbs_der)?;

    let certificate = Certificate {
        inner: x509_cert::certificate::CertificateInner {
            tbs_certificate: tbs_inner,
            signature_algorithm: signature_algorithm.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
        },
    };
    let der = certificate.to_der()?;

    Ok(GeneratedCertificate {
        descriptor: id,
        fingerprint,
        key,
        certificate,
        der,
        serial_number,
        not_before,
        not_after,
        subject: descriptor.subject.clone(),
        issuer: issuer_dn,
        subject_alt_names: descriptor.subject_alt_names.clone(),
    })
}
