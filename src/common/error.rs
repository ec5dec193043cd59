//! Error handling module
//!
//! This module defines the error types and result type aliases used when
//! assembling TLS policies.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::tls::{ProtocolVersion, Role};

/// Underlying cause of a failed load.
///
/// Wrapped by the assembly errors so the underlying I/O or engine failure is
/// reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum LoadError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// Content was read but is not usable
    #[error("{0}")]
    Format(String),
}

/// TLS policy assembly error type
///
/// Every variant is terminal for the assembly call that produced it.
#[derive(Error, Debug)]
pub enum TlsConfigError {
    /// Certificate and key were not supplied together
    #[error("invalid {role} configuration: {reason}")]
    InvalidConfiguration { role: Role, reason: String },

    /// Certificate or private key could not be read or parsed
    #[error("could not load {role} X509 key pair (cert: {cert:?}, key: {key:?}): {source}")]
    IdentityLoad {
        role: Role,
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: LoadError,
    },

    /// CA bundle could not be read or parsed
    #[error("could not load {role} CA bundle {path:?}: {source}")]
    TrustBundleLoad {
        role: Role,
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    /// Platform trust store could not be read
    #[error("failed to read system certificates for {role}: {source}")]
    SystemTrustStore {
        role: Role,
        #[source]
        source: LoadError,
    },

    /// Minimum version is not a known protocol identifier
    #[error("invalid minimum TLS version {version:#06x} for {role}")]
    InvalidVersion { role: Role, version: u16 },

    /// Minimum version is known but below the role floor
    #[error("minimum {role} TLS version {requested} is below the {floor} floor")]
    VersionTooLow {
        role: Role,
        requested: ProtocolVersion,
        floor: ProtocolVersion,
    },

    /// Options could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// OpenSSL builder error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `TlsConfigError`.
pub type Result<T> = std::result::Result<T, TlsConfigError>;
