//! The "To Be Signed" portion of an X.509 certificate, prior to signing.

use der::Encode;
use der::asn1::OctetString;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, ExtensionParam};
use crate::error::{CertForgeError, Result};
use crate::key::PublicKey;

/// All fields required to assemble a v3 certificate body before signing.
pub struct TbsCertificate {
    /// Certificate serial number, big-endian, positive.
    pub serial_number: Vec<u8>,
    /// Algorithm the issuer will sign with.
    pub signature_algorithm: SignatureAlgorithm,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Start of the validity window.
    pub not_before: time::OffsetDateTime,
    /// End of the validity window.
    pub not_after: time::OffsetDateTime,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Subject's public key.
    pub subject_public_key: PublicKey,
    /// Certificate extensions.
    pub extensions: Vec<ExtensionParam>,
}

/// Encodes a timestamp as UTCTime before 2050 and GeneralizedTime after,
/// per RFC 5280.
fn to_x509_time(ts: time::OffsetDateTime) -> Result<x509_cert::time::Time> {
    let system_time: std::time::SystemTime = ts.into();
    if ts.year() < 2050 {
        der::asn1::UtcTime::from_system_time(system_time)
            .map(x509_cert::time::Time::UtcTime)
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    } else {
        der::DateTime::from_system_time(system_time)
            .map(|dt| x509_cert::time::Time::GeneralTime(der::asn1::GeneralizedTime::from_date_time(dt)))
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }
}

impl TbsCertificate {
    /// Converts into `x509_cert`'s representation for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let algorithm_id: x509_cert::spki::AlgorithmIdentifierOwned =
            self.signature_algorithm.clone().into();

        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                OctetString::new(ext.value.clone())
                    .map(|extn_value| x509_cert::ext::Extension {
                        extn_id: ext.oid,
                        critical: ext.critical,
                        extn_value,
                    })
                    .map_err(|e| CertForgeError::EncodingError(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: algorithm_id,
            issuer: self.issuer.as_x509_name()?,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }

    /// Encodes the TBS structure into DER, the exact bytes a signature
    /// covers.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }
}
