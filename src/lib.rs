//! TLS Policy: validated server and client TLS configurations
//!
//! This library assembles ready-to-use TLS policies from a handful of
//! declarative options: certificate and key paths, a CA bundle, a minimum
//! protocol version, a client authentication policy and an "exclusive root
//! pools" switch. The handshake itself is left to OpenSSL.
//!
//! # Main Features
//!
//! - Certificate/key pairs, including passphrase-protected keys
//! - CA bundles merged into, or replacing, the system roots
//! - Role-specific protocol floors and cipher suites
//! - Five client authentication strengths for servers
//! - Hand-off to OpenSSL acceptors and connectors
//!
//! # Example
//!
//! ```no_run
//! use tls_policy::config::{ClientAuthPolicy, TlsOptions};
//! use tls_policy::Result;
//!
//! fn main() -> Result<()> {
//!     let options = TlsOptions {
//!         cert_file: Some("certs/server.crt".into()),
//!         key_file: Some("certs/server.key".into()),
//!         ca_file: Some("certs/ca.crt".into()),
//!         client_auth: ClientAuthPolicy::RequireAndVerifyClientCert,
//!         ..Default::default()
//!     };
//!
//!     let policy = tls_policy::server(&options)?;
//!     let acceptor = policy.acceptor_builder()?.build();
//!     # let _ = acceptor;
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod tls;

// Re-export commonly used structures and functions for convenience
pub use common::{LoadError, Result, TlsConfigError};
pub use config::{ClientAuthPolicy, TlsOptions};
pub use tls::{client, server, PolicyAssembler, ResolvedPolicy, Role};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
