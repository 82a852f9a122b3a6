mod util;

use certforge::builder::CertificateBuilder;
use certforge::cert::Certificate;
use certforge::error::CertForgeError;
use certforge::key::{KeyAlgorithm, KeyPair};
use certforge::verify::TrustStore;

/// A certificate survives DER and PEM round trips byte-for-byte.
#[test]
fn certificate_round_trips_through_der_and_pem() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let artifact = builder.build(&arena, lab.server).unwrap();
    let cert = artifact.certificate();

    let restored_der = Certificate::from_der(&cert.to_der().unwrap()).unwrap();
    assert_eq!(&restored_der, cert);

    let restored_pem = Certificate::from_pem(&cert.to_pem().unwrap()).unwrap();
    assert_eq!(&restored_pem, cert);
    assert_eq!(restored_pem.subject(), util::dn("test-server"));
}

/// A decoded certificate exposes the same parsed fields the artifact
/// reported at build time.
#[test]
fn parsed_fields_survive_decoding() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let artifact = builder.build(&arena, lab.server).unwrap();

    let decoded = Certificate::from_der(artifact.der()).unwrap();
    assert_eq!(decoded.serial_number(), artifact.serial_number());
    assert_eq!(
        decoded.subject_alt_names().unwrap(),
        artifact.subject_alt_names()
    );
    assert!(!decoded.is_ca());

    let sub_ca = builder.build(&arena, lab.server_sub_ca).unwrap();
    assert!(Certificate::from_der(sub_ca.der()).unwrap().is_ca());
}

/// Structurally invalid input reports `MalformedInputError` for every
/// flavor of breakage.
#[test]
fn malformed_input_is_rejected() {
    assert!(matches!(
        Certificate::from_pem("not pem at all"),
        Err(CertForgeError::MalformedInputError(_))
    ));
    assert!(matches!(
        Certificate::from_pem("-----BEGIN CERTIFICATE-----\nAAA!\n-----END CERTIFICATE-----\n"),
        Err(CertForgeError::MalformedInputError(_))
    ));
    assert!(matches!(
        Certificate::from_der(&[0x30, 0x82, 0xff]),
        Err(CertForgeError::MalformedInputError(_))
    ));

    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let artifact = builder.build(&arena, lab.server).unwrap();
    let truncated = &artifact.der()[..artifact.der().len() / 2];
    assert!(matches!(
        Certificate::from_der(truncated),
        Err(CertForgeError::MalformedInputError(_))
    ));
}

/// Private keys exported alongside a certificate re-import and still match
/// the certificate's public key.
#[test]
fn exported_key_matches_certificate() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let artifact = builder.build(&arena, lab.server).unwrap();

    let pem = artifact.key_to_pem().unwrap();
    let restored = KeyPair::import_from_pkcs8_pem(&pem).unwrap();
    assert_eq!(restored.algorithm(), KeyAlgorithm::EcdsaP256);

    let signature = restored.sign_data(b"probe").unwrap();
    let cert_key = artifact.certificate().public_key().unwrap();
    assert!(cert_key.verify(b"probe", &signature));

    let der = artifact.key_pair().to_pkcs8_der().unwrap();
    let from_der = KeyPair::import_from_pkcs8_der(&der).unwrap();
    let signature = from_der.sign_data(b"probe").unwrap();
    assert!(cert_key.verify(b"probe", &signature));
}

/// The chain bundle is valid concatenated PEM, leaf first, and feeds the
/// trust store loaders.
#[test]
fn chain_pem_bundle_parses() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let bundle = builder.chain_pem(&arena, lab.client).unwrap();

    let mut store = TrustStore::new();
    store.add_roots_pem(&bundle).unwrap();
    assert_eq!(store.roots().len(), 3);
    assert_eq!(store.roots()[0].subject(), util::dn("test-client"));
    assert_eq!(store.roots()[2].subject(), util::dn("ca"));

    store.add_intermediates_pem(&bundle).unwrap();
    assert_eq!(store.intermediates().len(), 3);
}
