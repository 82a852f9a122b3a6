//! Declarative certificate descriptors and the arena that holds them.
//!
//! Descriptors reference their issuer by [`DescriptorId`] rather than by
//! shared pointer, so the graph cannot encode ownership cycles; an explicit
//! cycle check still runs at resolve time because ids make accidental loops
//! expressible.

use bon::Builder;
use time::OffsetDateTime;

use crate::cert::extensions::{ExtendedKeyUsageOption, SanEntry};
use crate::cert::params::DistinguishedName;
use crate::error::{CertForgeError, Result};
use crate::key::KeyAlgorithm;

/// Handle to a descriptor stored in a [`DescriptorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId(usize);

/// Declarative specification of a certificate to be minted.
///
/// A descriptor with no `issuer` is self-signed and acts as a root.
/// Validity defaults are applied at build time: `not_before` falls back to
/// the build instant and `not_after` to one year after `not_before`.
#[derive(Debug, Clone, Builder)]
pub struct CertificateDescriptor {
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Issuer descriptor, if any.
    pub issuer: Option<DescriptorId>,
    /// Whether the minted certificate may sign other certificates.
    #[builder(default)]
    pub is_ca: bool,
    /// Subject alternative names, in display order.
    #[builder(default)]
    pub subject_alt_names: Vec<SanEntry>,
    /// Start of the validity window.
    pub not_before: Option<OffsetDateTime>,
    /// End of the validity window.
    pub not_after: Option<OffsetDateTime>,
    /// Key algorithm for the generated key pair.
    #[builder(default)]
    pub key_algorithm: KeyAlgorithm,
    /// Extended key usages to stamp on the certificate.
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    /// DNS name constraints this certificate imposes on everything it
    /// signs, when set.
    pub permitted_dns_names: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
struct Entry {
    descriptor: CertificateDescriptor,
    revision: u64,
}

/// Owns certificate descriptors and resolves issuer chains over them.
#[derive(Debug, Clone, Default)]
pub struct DescriptorArena {
    entries: Vec<Entry>,
}

impl DescriptorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor and returns its handle.
    pub fn insert(&mut self, descriptor: CertificateDescriptor) -> DescriptorId {
        let id = DescriptorId(self.entries.len());
        self.entries.push(Entry {
            descriptor,
            revision: 0,
        });
        id
    }

    /// Looks up a descriptor, failing with
    /// [`CertForgeError::DanglingIssuerError`] for a handle this arena does
    /// not hold.
    pub fn get(&self, id: DescriptorId) -> Result<&CertificateDescriptor> {
        self.entries
            .get(id.0)
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| {
                CertForgeError::DanglingIssuerError(format!("no descriptor with id {}", id.0))
            })
    }

    /// The revision counter for a descriptor; bumped on every update.
    pub fn revision(&self, id: DescriptorId) -> Result<u64> {
        self.entries.get(id.0).map(|entry| entry.revision).ok_or_else(|| {
            CertForgeError::DanglingIssuerError(format!("no descriptor with id {}", id.0))
        })
    }

    /// Mutates a descriptor in place and bumps its revision, invalidating
    /// cached artifacts for it and everything it transitively signs.
    pub fn update<F>(&mut self, id: DescriptorId, f: F) -> Result<()>
    where
        F: FnOnce(&mut CertificateDescriptor),
    {
        let entry = self.entries.get_mut(id.0).ok_or_else(|| {
            CertForgeError::DanglingIssuerError(format!("no descriptor with id {}", id.0))
        })?;
        f(&mut entry.descriptor);
        entry.revision += 1;
        Ok(())
    }

    /// Resolves the issuer chain of `id`, ordered root first, leaf last.
    ///
    /// Fails with [`CertForgeError::CycleError`] when issuer references
    /// loop, and [`CertForgeError::DanglingIssuerError`] when a reference
    /// points outside the arena.
    pub fn resolve_chain(&self, id: DescriptorId) -> Result<Vec<DescriptorId>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(link) = current {
            if chain.contains(&link) {
                let subject = self.get(link)?.subject.clone();
                return Err(CertForgeError::CycleError(subject.to_string()));
            }
            chain.push(link);
            current = self.get(link)?.issuer;
        }
        chain.reverse();
        Ok(chain)
    }
}
