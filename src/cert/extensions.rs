//! Typed wrappers for the X.509 extensions certforge emits and reads.

use std::net::IpAddr;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::{CertForgeError, Result};

pub use der::flagset::FlagSet;
pub use x509_cert::ext::pkix::KeyUsages;

fn encode_der<T: Encode>(value: &T) -> Result<Vec<u8>> {
    value
        .to_der()
        .map_err(|e| CertForgeError::EncodingError(e.to_string()))
}

/// Conversion between a typed extension and its DER-encoded extension value.
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// One entry of a Subject Alternative Name extension.
///
/// Insertion order is preserved for display purposes; verification does not
/// depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanEntry {
    /// A DNS name, e.g. `localhost` or `www.example.com`.
    Dns(String),
    /// An IPv4 or IPv6 address.
    Ip(IpAddr),
    /// A uniform resource identifier.
    Uri(String),
}

impl std::fmt::Display for SanEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SanEntry::Dns(name) => write!(f, "DNS:{name}"),
            SanEntry::Ip(addr) => write!(f, "IP:{addr}"),
            SanEntry::Uri(uri) => write!(f, "URI:{uri}"),
        }
    }
}

/// The Subject Alternative Name (SAN) extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub entries: Vec<SanEntry>,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let names = self
            .entries
            .iter()
            .map(|entry| match entry {
                SanEntry::Dns(name) => Ia5String::try_from(name.clone())
                    .map(GeneralName::DnsName)
                    .map_err(|e| CertForgeError::InvalidInput(e.to_string())),
                SanEntry::Ip(addr) => {
                    let octets = match addr {
                        IpAddr::V4(v4) => v4.octets().to_vec(),
                        IpAddr::V6(v6) => v6.octets().to_vec(),
                    };
                    OctetString::new(octets)
                        .map(GeneralName::IpAddress)
                        .map_err(|e| CertForgeError::EncodingError(e.to_string()))
                }
                SanEntry::Uri(uri) => Ia5String::try_from(uri.clone())
                    .map(GeneralName::UniformResourceIdentifier)
                    .map_err(|e| CertForgeError::InvalidInput(e.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;
        let san = x509_cert::ext::pkix::SubjectAltName(names);
        encode_der(&san)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let entries = san
            .0
            .iter()
            .map(|name| match name {
                GeneralName::DnsName(dns) => Ok(SanEntry::Dns(dns.to_string())),
                GeneralName::UniformResourceIdentifier(uri) => Ok(SanEntry::Uri(uri.to_string())),
                GeneralName::IpAddress(os) => match os.as_bytes().len() {
                    4 => {
                        let mut b = [0u8; 4];
                        b.copy_from_slice(os.as_bytes());
                        Ok(SanEntry::Ip(IpAddr::from(b)))
                    }
                    16 => {
                        let mut b = [0u8; 16];
                        b.copy_from_slice(os.as_bytes());
                        Ok(SanEntry::Ip(IpAddr::from(b)))
                    }
                    n => Err(CertForgeError::DecodingError(format!(
                        "IP address entry of {n} bytes"
                    ))),
                },
                _ => Err(CertForgeError::InvalidInput(
                    "unsupported general name type".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }
}

/// The Basic Constraints extension: CA flag and optional path length limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u32>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length.map(|v| v as u8),
        };
        encode_der(&bc)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint.map(|v| v as u32),
        })
    }
}

/// The Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <x509_cert::ext::pkix::KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ku = x509_cert::ext::pkix::KeyUsage::from(self.0);
        encode_der(&ku)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = x509_cert::ext::pkix::KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// The Extended Key Usage extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        encode_der(&eku)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku
            .0
            .iter()
            .map(|v| match *v {
                const_oid::db::rfc5912::ID_KP_SERVER_AUTH => Ok(ExtendedKeyUsageOption::ServerAuth),
                const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => Ok(ExtendedKeyUsageOption::ClientAuth),
                const_oid::db::rfc5912::ID_KP_CODE_SIGNING => {
                    Ok(ExtendedKeyUsageOption::CodeSigning)
                }
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                    Ok(ExtendedKeyUsageOption::EmailProtection)
                }
                const_oid::db::rfc5912::ID_KP_TIME_STAMPING => {
                    Ok(ExtendedKeyUsageOption::TimeStamping)
                }
                const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => {
                    Ok(ExtendedKeyUsageOption::OcspSigning)
                }
                _ => Err(CertForgeError::InvalidInput(
                    "unsupported extended key usage option".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { usage })
    }
}

/// An option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
        }
    }
}

/// The Subject Key Identifier extension: a digest identifying the
/// certificate's own public key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(
            OctetString::new(self.key_identifier.as_slice())
                .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
        );
        encode_der(&ski)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self {
            key_identifier: ski.0.as_bytes().to_vec(),
        })
    }
}

/// The Authority Key Identifier (AKI) extension, identifying the key that
/// signed this certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
    pub authority_cert_serial_number: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(
                OctetString::new(self.key_identifier.as_slice())
                    .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
            ),
            authority_cert_issuer: None,
            authority_cert_serial_number: Some(
                x509_cert::serial_number::SerialNumber::new(
                    self.authority_cert_serial_number.as_slice(),
                )
                .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
            ),
        };
        encode_der(&aki)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;
        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
            authority_cert_serial_number: aki
                .authority_cert_serial_number
                .map(|sn| sn.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// The Name Constraints extension, restricted to DNS subtrees.
///
/// A DNS name satisfies a subtree when it equals the base or is a
/// subdomain of it; matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameConstraints {
    pub permitted_dns: Vec<String>,
    pub excluded_dns: Vec<String>,
}

impl NameConstraints {
    /// Whether `name` is acceptable under these constraints.
    pub fn permits_dns(&self, name: &str) -> bool {
        if self.excluded_dns.iter().any(|base| dns_in_subtree(name, base)) {
            return false;
        }
        self.permitted_dns.is_empty()
            || self.permitted_dns.iter().any(|base| dns_in_subtree(name, base))
    }
}

fn dns_in_subtree(name: &str, base: &str) -> bool {
    let name = name.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    name == base || name.ends_with(&format!(".{base}"))
}

fn dns_subtrees(names: &[String]) -> Result<Option<Vec<x509_cert::ext::pkix::constraints::name::GeneralSubtree>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let subtrees = names
        .iter()
        .map(|name| {
            Ia5String::try_from(name.clone())
                .map(|s| x509_cert::ext::pkix::constraints::name::GeneralSubtree {
                    base: GeneralName::DnsName(s),
                    minimum: 0,
                    maximum: None,
                })
                .map_err(|e| CertForgeError::InvalidInput(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(subtrees))
}

impl ToAndFromX509Extension for NameConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::NameConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let nc = x509_cert::ext::pkix::NameConstraints {
            permitted_subtrees: dns_subtrees(&self.permitted_dns)?,
            excluded_subtrees: dns_subtrees(&self.excluded_dns)?,
        };
        encode_der(&nc)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let nc = x509_cert::ext::pkix::NameConstraints::from_der(extension)?;
        let collect = |subtrees: Option<Vec<x509_cert::ext::pkix::constraints::name::GeneralSubtree>>| {
            subtrees
                .unwrap_or_default()
                .into_iter()
                .filter_map(|subtree| match subtree.base {
                    GeneralName::DnsName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        Ok(Self {
            permitted_dns: collect(nc.permitted_subtrees),
            excluded_dns: collect(nc.excluded_subtrees),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_constraints_round_trip() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(3),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn subject_alt_name_preserves_typed_entries() {
        let original = SubjectAltName {
            entries: vec![
                SanEntry::Dns("localhost".to_string()),
                SanEntry::Ip("127.0.0.1".parse().unwrap()),
                SanEntry::Uri("https://example.com".to_string()),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn key_usage_round_trip() {
        let original = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn malformed_extension_value_is_a_decoding_error() {
        let err = BasicConstraints::from_x509_extension_value(&[0xff, 0x00]).unwrap_err();
        assert!(matches!(err, CertForgeError::DecodingError(_)));
    }

    #[test]
    fn non_ascii_san_entry_is_invalid_input() {
        let san = SubjectAltName {
            entries: vec![SanEntry::Dns("exämple.com".to_string())],
        };
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(CertForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn key_identifier_extensions_round_trip() {
        let ski = SubjectKeyIdentifier {
            key_identifier: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let encoded = ski.to_x509_extension_value().unwrap();
        assert_eq!(
            SubjectKeyIdentifier::from_x509_extension_value(&encoded).unwrap(),
            ski
        );

        let aki = AuthorityKeyIdentifier {
            key_identifier: vec![0xca, 0xfe],
            authority_cert_serial_number: vec![0x01, 0x02, 0x03],
        };
        let encoded = aki.to_x509_extension_value().unwrap();
        assert_eq!(
            AuthorityKeyIdentifier::from_x509_extension_value(&encoded).unwrap(),
            aki
        );
    }

    #[test]
    fn extended_key_usage_round_trip() {
        let original = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = ExtendedKeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn name_constraints_matching() {
        let nc = NameConstraints {
            permitted_dns: vec!["example.com".to_string()],
            excluded_dns: vec!["internal.example.com".to_string()],
        };
        assert!(nc.permits_dns("example.com"));
        assert!(nc.permits_dns("www.example.com"));
        assert!(!nc.permits_dns("example.org"));
        assert!(!nc.permits_dns("db.internal.example.com"));
    }

    #[test]
    fn name_constraints_round_trip() {
        let original = NameConstraints {
            permitted_dns: vec!["example.com".to_string(), "example.org".to_string()],
            excluded_dns: vec![],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = NameConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }
}
