//! TLS policy module
//!
//! Turns [`TlsOptions`](crate::config::TlsOptions) into a
//! [`ResolvedPolicy`] in three steps: identity loading, trust pool
//! construction and version selection.

mod acceptor;
pub mod identity;
pub mod policy;
pub mod pool;
pub mod version;

pub use identity::{load_identity, load_key_pair, LoadedIdentity};
pub use policy::{client, server, PolicyAssembler, ResolvedPolicy, Role};
pub use pool::{
    build_trust_pool, parse_certificate_bundle, FixedTrustStore, OsTrustStore, SystemTrustStore,
    TrustPool,
};
pub use version::{
    select_version_policy, ProtocolVersion, VersionPolicy, CLIENT_CIPHER_SUITES, CLIENT_FLOOR,
    KNOWN_PROTOCOL_VERSIONS, SERVER_CIPHER_SUITES, SERVER_FLOOR,
};
