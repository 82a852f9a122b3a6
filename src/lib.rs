//! # CertForge - Programmatic Certificate Chain Authoring
//!
//! CertForge is a pure-Rust library for declaring X.509 certificate hierarchies
//! as data and minting them on demand, built entirely with rustcrypto libraries
//! and without dependencies on ring or openssl. Describe a root CA, its
//! intermediates, and leaf certificates as descriptors; the builder resolves
//! the issuer graph, generates keys, signs each certificate with its parent,
//! and caches the results so editing one descriptor re-mints only the affected
//! subtree. A companion verifier checks leaf certificates against a trust
//! store per RFC 5280.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048, 3072, and 4096-bit keys
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Supported Certificate Formats
//!
//! - **DER**: Distinguished Encoding Rules (binary format)
//! - **PEM**: Privacy-Enhanced Mail (base64-encoded text format)
//!
//! ## Key Features
//!
//! - **Declarative hierarchies**: certificates reference their issuer by
//!   handle; roots are simply descriptors without one
//! - **At-most-once signing**: artifacts are cached per descriptor revision,
//!   so repeated builds reuse keys and signatures
//! - **Chain verification**: path building over a caller-supplied trust
//!   store, with time, signature, CA, and DNS name-constraint checks
//! - **Deterministic builds**: an optional seeded RNG makes key material
//!   reproducible for tests
//! - **Format flexibility**: import/export in both PEM and DER formats
//!
//! ## Quick Start
//!
//! ### Minting a Certificate Chain
//!
//! ```rust,no_run
//! use certforge::{
//!     builder::CertificateBuilder,
//!     cert::extensions::SanEntry,
//!     cert::params::DistinguishedName,
//!     descriptor::{CertificateDescriptor, DescriptorArena},
//! };
//!
//! # fn main() -> Result<(), certforge::error::CertForgeError> {
//! let mut arena = DescriptorArena::new();
//!
//! let root = arena.insert(
//!     CertificateDescriptor::builder()
//!         .subject(
//!             DistinguishedName::builder()
//!                 .common_name("example root ca".to_string())
//!                 .organization("Example Corp".to_string())
//!                 .build(),
//!         )
//!         .is_ca(true)
//!         .build(),
//! );
//!
//! let server = arena.insert(
//!     CertificateDescriptor::builder()
//!         .subject(
//!             DistinguishedName::builder()
//!                 .common_name("server.example.com".to_string())
//!                 .build(),
//!         )
//!         .issuer(root)
//!         .subject_alt_names(vec![SanEntry::Dns("localhost".to_string())])
//!         .build(),
//! );
//!
//! let builder = CertificateBuilder::new();
//! let bundle = builder.chain_pem(&arena, server)?;
//! println!("{bundle}");
//! # Ok(())
//! # }
//! ```
//!
//! ### Verifying a Chain
//!
//! ```rust,no_run
//! use certforge::{
//!     builder::CertificateBuilder,
//!     cert::params::DistinguishedName,
//!     descriptor::{CertificateDescriptor, DescriptorArena},
//!     verify::{TrustStore, verify},
//! };
//! use time::OffsetDateTime;
//!
//! # fn main() -> Result<(), certforge::error::CertForgeError> {
//! let mut arena = DescriptorArena::new();
//! let root = arena.insert(
//!     CertificateDescriptor::builder()
//!         .subject(
//!             DistinguishedName::builder()
//!                 .common_name("example root ca".to_string())
//!                 .build(),
//!         )
//!         .is_ca(true)
//!         .build(),
//! );
//! let client = arena.insert(
//!     CertificateDescriptor::builder()
//!         .subject(
//!             DistinguishedName::builder()
//!                 .common_name("client".to_string())
//!                 .build(),
//!         )
//!         .issuer(root)
//!         .build(),
//! );
//!
//! let builder = CertificateBuilder::new();
//! let root_cert = builder.build(&arena, root)?;
//! let client_cert = builder.build(&arena, client)?;
//!
//! let mut store = TrustStore::new();
//! store.add_root(root_cert.certificate().clone());
//! assert!(verify(client_cert.certificate(), &store, OffsetDateTime::now_utc()).is_ok());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Construction errors surface as [`error::CertForgeError`]; verification
//! failures as [`verify::VerificationError`] values, never panics:
//!
//! ```rust
//! use certforge::{error::CertForgeError, key::KeyPair};
//!
//! match KeyPair::import_from_pkcs8_pem("invalid pem data") {
//!     Ok(_key_pair) => println!("Key imported successfully"),
//!     Err(CertForgeError::MalformedInputError(msg)) => println!("Bad armor: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`descriptor`]: Declarative certificate descriptors and the arena that
//!   resolves issuer chains over them
//! - [`builder`]: Turning descriptor graphs into signed certificates, with
//!   caching and optional deterministic entropy
//! - [`verify`]: Chain verification against a trust store
//! - [`key`]: Key generation, import/export, and cryptographic operations
//! - [`cert`]: Certificate encoding/decoding and parsed-field access
//! - [`tbs_certificate`]: Low-level certificate structure assembly
//! - [`error`]: Error types
//! - [`pem_utils`]: PEM armor helpers

pub mod builder;
pub mod cert;
pub mod descriptor;
pub mod error;
pub mod key;
pub mod pem_utils;
pub mod tbs_certificate;
pub mod verify;
