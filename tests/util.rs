use certforge::cert::extensions::{ExtendedKeyUsageOption, SanEntry};
use certforge::cert::params::DistinguishedName;
use certforge::descriptor::{CertificateDescriptor, DescriptorArena, DescriptorId};

pub fn dn(common_name: &str) -> DistinguishedName {
    DistinguishedName::builder()
        .common_name(common_name.to_string())
        .build()
}

/// A two-level certificate lab: one root, a sub-CA per side, and a server
/// and client leaf.
pub struct Lab {
    pub ca: DescriptorId,
    pub server_sub_ca: DescriptorId,
    pub client_sub_ca: DescriptorId,
    pub server: DescriptorId,
    pub client: DescriptorId,
}

pub fn certificate_lab() -> (DescriptorArena, Lab) {
    let mut arena = DescriptorArena::new();

    let ca = arena.insert(
        CertificateDescriptor::builder()
            .subject(dn("ca"))
            .is_ca(true)
            .build(),
    );
    let server_sub_ca = arena.insert(
        CertificateDescriptor::builder()
            .subject(dn("server-sub-ca"))
            .issuer(ca)
            .is_ca(true)
            .build(),
    );
    let client_sub_ca = arena.insert(
        CertificateDescriptor::builder()
            .subject(dn("client-sub-ca"))
            .issuer(ca)
            .is_ca(true)
            .build(),
    );
    let server = arena.insert(
        CertificateDescriptor::builder()
            .subject(dn("test-server"))
            .issuer(server_sub_ca)
            .subject_alt_names(vec![SanEntry::Dns("localhost".to_string())])
            .usages(vec![ExtendedKeyUsageOption::ServerAuth])
            .build(),
    );
    let client = arena.insert(
        CertificateDescriptor::builder()
            .subject(dn("test-client"))
            .issuer(client_sub_ca)
            .usages(vec![ExtendedKeyUsageOption::ClientAuth])
            .build(),
    );

    (
        arena,
        Lab {
            ca,
            server_sub_ca,
            client_sub_ca,
            server,
            client,
        },
    )
}
