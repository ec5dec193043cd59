//! Configuration module
//!
//! This module holds the declarative options a TLS policy is assembled
//! from, and loads them from files and environment variables.

mod defaults;
mod loader;

pub use self::defaults::{DEFAULT_CONFIG_FILE, ENV_PREFIX};

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::{Result, TlsConfigError};
use crate::tls::ProtocolVersion;

/// Server-side client certificate policy, weakest first
///
/// The derived ordering is the strength ordering, so "weaker than X" is a
/// plain comparison.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClientAuthPolicy {
    /// Don't ask for a client certificate
    #[serde(rename = "none")]
    None,
    /// Ask for a certificate but accept any, or none
    #[serde(rename = "request")]
    RequestClientCert,
    /// Require a certificate but don't verify it
    #[serde(rename = "require-any")]
    RequireAnyClientCert,
    /// Verify the certificate if one is given
    #[serde(rename = "verify-if-given")]
    VerifyClientCertIfGiven,
    /// Require a certificate and verify it
    #[serde(rename = "require-and-verify")]
    RequireAndVerifyClientCert,
}

impl ClientAuthPolicy {
    /// Whether this level verifies client certificates against a pool
    #[inline]
    pub fn verifies(self) -> bool {
        self >= Self::VerifyClientCertIfGiven
    }
}

// Custom deserialization implementation to make it case-insensitive
impl<'de> Deserialize<'de> for ClientAuthPolicy {
    #[inline]
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ClientAuthPolicy::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Default for ClientAuthPolicy {
    #[inline]
    fn default() -> Self {
        defaults::client_auth()
    }
}

impl fmt::Display for ClientAuthPolicy {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::RequestClientCert => write!(f, "request"),
            Self::RequireAnyClientCert => write!(f, "require-any"),
            Self::VerifyClientCertIfGiven => write!(f, "verify-if-given"),
            Self::RequireAndVerifyClientCert => write!(f, "require-and-verify"),
        }
    }
}

impl FromStr for ClientAuthPolicy {
    type Err = TlsConfigError;

    #[inline]
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Self::None),
            "request" => Ok(Self::RequestClientCert),
            "require-any" => Ok(Self::RequireAnyClientCert),
            "verify-if-given" | "optional" => Ok(Self::VerifyClientCertIfGiven),
            "require-and-verify" | "required" => Ok(Self::RequireAndVerifyClientCert),
            _ => Err(TlsConfigError::Config(format!(
                "Invalid client auth policy: {}. Valid values are: none, request, require-any, verify-if-given, require-and-verify",
                s
            ))),
        }
    }
}

/// Parse a minimum version written as a name (`TLS1.2`) or an identifier
/// (`771`, `0x0303`)
///
/// Numeric identifiers are not checked against the known versions here;
/// the assembler rejects unknown ones with a role-specific error.
pub fn parse_version_id(s: &str) -> Result<u16> {
    let s = s.trim();
    if let Ok(version) = ProtocolVersion::from_str(s) {
        return Ok(version.wire());
    }

    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|_| {
        TlsConfigError::Config(format!(
            "Invalid TLS version: {}. Use a name such as TLS1.2 or a protocol identifier such as 0x0303",
            s
        ))
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionRepr {
    Id(u16),
    Name(String),
}

fn deserialize_min_version<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<VersionRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(VersionRepr::Id(id)) => Ok(Some(id)),
        Some(VersionRepr::Name(name)) => parse_version_id(&name)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Declarative options for one TLS policy
///
/// Paths that are unset or empty are treated as absent.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct TlsOptions {
    /// PEM bundle of CA certificates to trust
    pub ca_file: Option<PathBuf>,

    /// PEM certificate chain presented to peers
    pub cert_file: Option<PathBuf>,

    /// PEM private key matching `cert_file`
    pub key_file: Option<PathBuf>,

    /// Client certificate policy (server role only)
    pub client_auth: ClientAuthPolicy,

    /// Skip server certificate verification (client role only)
    pub insecure_skip_verify: bool,

    /// Trust only `ca_file` instead of adding it to the system roots
    pub exclusive_root_pools: bool,

    /// Minimum protocol identifier; unset means the role floor
    #[serde(deserialize_with = "deserialize_min_version")]
    pub min_version: Option<u16>,

    /// Passphrase for an encrypted `key_file`
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

impl TlsOptions {
    pub fn ca_path(&self) -> Option<&Path> {
        non_empty(&self.ca_file)
    }

    pub fn cert_path(&self) -> Option<&Path> {
        non_empty(&self.cert_file)
    }

    pub fn key_path(&self) -> Option<&Path> {
        non_empty(&self.key_file)
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsOptions")
            .field("ca_file", &self.ca_file)
            .field("cert_file", &self.cert_file)
            .field("key_file", &self.key_file)
            .field("client_auth", &self.client_auth)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("exclusive_root_pools", &self.exclusive_root_pools)
            .field("min_version", &self.min_version)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
