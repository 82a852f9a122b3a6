use bon::Builder;
use const_oid::ObjectIdentifier;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::name::RdnSequence;

use super::extensions::ToAndFromX509Extension;
use crate::error::{CertForgeError, Result};

/// Distinguished name used as certificate subject or issuer.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name into an X.509 RDN sequence.
    ///
    /// Only attributes that are actually set are emitted, so the RFC 4514
    /// representation round-trips through [`Self::from_x509_name`].
    pub fn as_x509_name(&self) -> Result<x509_cert::name::Name> {
        use core::str::FromStr;
        let mut parts = vec![format!("CN={}", self.common_name)];
        if let Some(ou) = &self.organization_unit {
            parts.push(format!("OU={ou}"));
        }
        if let Some(o) = &self.organization {
            parts.push(format!("O={o}"));
        }
        if let Some(l) = &self.locality {
            parts.push(format!("L={l}"));
        }
        if let Some(st) = &self.state {
            parts.push(format!("ST={st}"));
        }
        if let Some(c) = &self.country {
            parts.push(format!("C={c}"));
        }
        RdnSequence::from_str(&parts.join(","))
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Recovers a `DistinguishedName` from an X.509 RDN sequence.
    ///
    /// Attributes with value types that cannot be read as strings are
    /// skipped rather than failing the whole name.
    pub fn from_x509_name(x509dn: &x509_cert::name::Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = attr
                    .value
                    .decode_as::<String>()
                    .ok()
                    .or_else(|| {
                        attr.value
                            .decode_as::<der::asn1::PrintableString>()
                            .ok()
                            .map(|s| s.to_string())
                    });
                let Some(value) = value else { continue };
                match attr.oid.to_string().as_str() {
                    "2.5.4.3" => dn.common_name = value,
                    "2.5.4.6" => dn.country = Some(value),
                    "2.5.4.8" => dn.state = Some(value),
                    "2.5.4.7" => dn.locality = Some(value),
                    "2.5.4.10" => dn.organization = Some(value),
                    "2.5.4.11" => dn.organization_unit = Some(value),
                    _ => {}
                }
            }
        }
        dn
    }
}

impl std::fmt::Display for DistinguishedName {
    /// Renders every set attribute, in the same order `as_x509_name` emits
    /// them.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CN={}", self.common_name)?;
        if let Some(ou) = &self.organization_unit {
            write!(f, ",OU={ou}")?;
        }
        if let Some(o) = &self.organization {
            write!(f, ",O={o}")?;
        }
        if let Some(l) = &self.locality {
            write!(f, ",L={l}")?;
        }
        if let Some(st) = &self.state {
            write!(f, ",ST={st}")?;
        }
        if let Some(c) = &self.country {
            write!(f, ",C={c}")?;
        }
        Ok(())
    }
}

/// Certificate validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

/// A raw X.509 extension: OID, criticality, and DER-encoded value.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Encodes a typed extension into its raw form.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes the raw value into a typed extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinguished_name_round_trip() {
        let dn = DistinguishedName::builder()
            .common_name("server.example.com".to_string())
            .organization("Example Corp".to_string())
            .country("US".to_string())
            .build();
        let name = dn.as_x509_name().unwrap();
        let restored = DistinguishedName::from_x509_name(&name);
        assert_eq!(dn, restored);
    }

    #[test]
    fn minimal_name_round_trip() {
        let dn = DistinguishedName::builder()
            .common_name("ca".to_string())
            .build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }

    #[test]
    fn display_renders_every_set_attribute() {
        let dn = DistinguishedName::builder()
            .common_name("server".to_string())
            .organization_unit("Platform".to_string())
            .organization("Example Corp".to_string())
            .locality("Springfield".to_string())
            .state("IL".to_string())
            .country("US".to_string())
            .build();
        assert_eq!(
            dn.to_string(),
            "CN=server,OU=Platform,O=Example Corp,L=Springfield,ST=IL,C=US"
        );

        let minimal = DistinguishedName::builder()
            .common_name("ca".to_string())
            .build();
        assert_eq!(minimal.to_string(), "CN=ca");
    }

    #[test]
    fn validity_for_days_spans_requested_window() {
        let validity = Validity::for_days(90);
        assert_eq!(validity.not_after - validity.not_before, Duration::days(90));
    }

    #[test]
    fn extension_param_recovers_typed_extension() {
        use super::super::extensions::BasicConstraints;

        let bc = BasicConstraints {
            is_ca: true,
            max_path_length: None,
        };
        let param = ExtensionParam::from_extension(&bc, true).unwrap();
        assert!(param.critical);
        assert_eq!(param.to_extension::<BasicConstraints>().unwrap(), bc);
    }
}
