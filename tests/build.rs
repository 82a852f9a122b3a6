mod util;

use std::sync::Arc;

use certforge::builder::CertificateBuilder;
use certforge::descriptor::{CertificateDescriptor, DescriptorArena};
use certforge::error::CertForgeError;
use time::{Date, Duration, Month};

/// Building a leaf transitively mints its whole issuing chain, root first,
/// and every certificate's issuer name equals its parent's subject.
#[test]
fn chain_issuer_names_match_parent_subjects() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();

    let chain = builder.chain(&arena, lab.server).unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[0].subject(), &util::dn("test-server"));
    assert_eq!(chain[1].subject(), &util::dn("server-sub-ca"));
    assert_eq!(chain[2].subject(), &util::dn("ca"));

    assert_eq!(chain[0].issuer(), chain[1].subject());
    assert_eq!(chain[1].issuer(), chain[2].subject());
    // The root is self-issued.
    assert_eq!(chain[2].issuer(), chain[2].subject());

    // The signed certificates agree with the artifact metadata.
    for artifact in &chain {
        assert_eq!(&artifact.certificate().subject(), artifact.subject());
        assert_eq!(&artifact.certificate().issuer(), artifact.issuer());
    }
}

/// Repeated builds return the cached artifact instead of re-signing.
#[test]
fn artifacts_are_cached_across_builds() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();

    let first = builder.build(&arena, lab.server).unwrap();
    let second = builder.build(&arena, lab.server).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.descriptor_id(), lab.server);

    // Building the sibling leaf reuses the root.
    let client = builder.build(&arena, lab.client).unwrap();
    let chain = builder.chain(&arena, lab.client).unwrap();
    assert_eq!(client.serial_number(), chain[0].serial_number());
    assert_eq!(
        builder.chain(&arena, lab.server).unwrap()[2].serial_number(),
        chain[2].serial_number()
    );
}

/// Editing a descriptor re-mints it and everything below it, while
/// untouched branches keep their certificates.
#[test]
fn update_invalidates_descendants_only() {
    let (mut arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();

    let ca_before = builder.build(&arena, lab.ca).unwrap();
    let server_before = builder.build(&arena, lab.server).unwrap();
    let client_before = builder.build(&arena, lab.client).unwrap();

    arena
        .update(lab.server_sub_ca, |d| {
            d.subject = util::dn("server-sub-ca-renamed");
        })
        .unwrap();

    let server_after = builder.build(&arena, lab.server).unwrap();
    let client_after = builder.build(&arena, lab.client).unwrap();
    let ca_after = builder.build(&arena, lab.ca).unwrap();

    assert_ne!(server_before.serial_number(), server_after.serial_number());
    assert_eq!(server_after.issuer(), &util::dn("server-sub-ca-renamed"));
    assert!(Arc::ptr_eq(&ca_before, &ca_after));
    assert!(Arc::ptr_eq(&client_before, &client_after));
}

/// Issuer loops are reported as errors rather than looping the builder.
#[test]
fn issuer_cycle_is_an_error() {
    let (mut arena, lab) = util::certificate_lab();
    arena
        .update(lab.ca, |d| d.issuer = Some(lab.server_sub_ca))
        .unwrap();

    let builder = CertificateBuilder::new();
    let err = builder.build(&arena, lab.server).unwrap_err();
    assert!(matches!(err, CertForgeError::CycleError(_)));
}

/// Two builders with the same seed and pinned validity produce bytewise
/// identical chains.
#[test]
fn seeded_builders_are_deterministic() {
    let not_before = Date::from_calendar_date(2024, Month::January, 1)
        .unwrap()
        .midnight()
        .assume_utc();
    let not_after = not_before + Duration::days(365);

    let mut arena = DescriptorArena::new();
    let root = arena.insert(
        CertificateDescriptor::builder()
            .subject(util::dn("seeded-root"))
            .is_ca(true)
            .not_before(not_before)
            .not_after(not_after)
            .build(),
    );
    let leaf = arena.insert(
        CertificateDescriptor::builder()
            .subject(util::dn("seeded-leaf"))
            .issuer(root)
            .not_before(not_before)
            .not_after(not_after)
            .build(),
    );

    let a = CertificateBuilder::with_seed(42);
    let b = CertificateBuilder::with_seed(42);
    assert_eq!(
        a.build(&arena, leaf).unwrap().der(),
        b.build(&arena, leaf).unwrap().der()
    );

    let c = CertificateBuilder::with_seed(43);
    assert_ne!(
        a.build(&arena, leaf).unwrap().der(),
        c.build(&arena, leaf).unwrap().der()
    );
}

/// When a descriptor pins no validity, the window defaults to one year from
/// the build instant.
#[test]
fn validity_defaults_to_one_year() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let artifact = builder.build(&arena, lab.server).unwrap();
    assert_eq!(
        artifact.not_after() - artifact.not_before(),
        Duration::days(365)
    );
}

/// Serial numbers are positive, non-zero, and unique across the chain.
#[test]
fn serial_numbers_are_positive_and_distinct() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();
    let chain = builder.chain(&arena, lab.server).unwrap();

    let mut serials: Vec<Vec<u8>> = chain
        .iter()
        .map(|c| c.serial_number().to_vec())
        .collect();
    for serial in &serials {
        assert_eq!(serial.len(), 16);
        assert_eq!(serial[0] & 0x80, 0);
        assert!(serial.iter().any(|b| *b != 0));
    }
    serials.sort();
    serials.dedup();
    assert_eq!(serials.len(), 3);
}

/// The artifact's serial always matches the serial encoded in the
/// certificate, including entropy streams that open with zero bytes.
#[test]
fn serial_matches_encoded_certificate() {
    let (arena, lab) = util::certificate_lab();
    for seed in 0..16 {
        let builder = CertificateBuilder::with_seed(seed);
        let artifact = builder.build(&arena, lab.server).unwrap();
        let decoded = certforge::cert::Certificate::from_der(artifact.der()).unwrap();
        assert_eq!(decoded.serial_number(), artifact.serial_number());
        assert_eq!(artifact.serial_number().len(), 16);
    }
}

/// Concurrent builds of the same descriptor observe exactly one signing.
#[test]
fn concurrent_builds_share_one_artifact() {
    let (arena, lab) = util::certificate_lab();
    let builder = CertificateBuilder::new();

    let artifacts: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| builder.build(&arena, lab.server).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for pair in artifacts.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}

/// A window that closes before it opens is rejected up front.
#[test]
fn inverted_validity_is_rejected() {
    let not_before = Date::from_calendar_date(2024, Month::June, 1)
        .unwrap()
        .midnight()
        .assume_utc();

    let mut arena = DescriptorArena::new();
    let root = arena.insert(
        CertificateDescriptor::builder()
            .subject(util::dn("backwards"))
            .is_ca(true)
            .not_before(not_before)
            .not_after(not_before - Duration::days(1))
            .build(),
    );

    let builder = CertificateBuilder::new();
    assert!(matches!(
        builder.build(&arena, root),
        Err(CertForgeError::InvalidInput(_))
    ));
}
