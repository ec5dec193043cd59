//! Protocol version floors and cipher suite selection

use log::debug;
use openssl::ssl::SslVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Role;
use crate::common::{Result, TlsConfigError};

/// Protocol versions known to the TLS engine, oldest first.
///
/// The discriminants are the on-the-wire version identifiers, so the derived
/// ordering is the protocol ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ProtocolVersion {
    Ssl3 = 0x0300,
    Tls10 = 0x0301,
    Tls11 = 0x0302,
    Tls12 = 0x0303,
    Tls13 = 0x0304,
}

/// Every version the engine recognises, in ascending order
pub const KNOWN_PROTOCOL_VERSIONS: [ProtocolVersion; 5] = [
    ProtocolVersion::Ssl3,
    ProtocolVersion::Tls10,
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls13,
];

/// Lowest version a server may be configured to accept
pub const SERVER_FLOOR: ProtocolVersion = ProtocolVersion::Tls10;

/// Lowest version a client may be configured to offer
pub const CLIENT_FLOOR: ProtocolVersion = ProtocolVersion::Tls12;

/// Cipher suites offered by clients, in preference order (AEAD only)
pub const CLIENT_CIPHER_SUITES: &[&str] = &[
    "ECDHE-RSA-AES256-GCM-SHA384",
    "ECDHE-RSA-AES128-GCM-SHA256",
    "ECDHE-ECDSA-AES256-GCM-SHA384",
    "ECDHE-ECDSA-AES128-GCM-SHA256",
];

/// Cipher suites accepted by servers: the client list followed by the CBC
/// suites older clients still need
pub const SERVER_CIPHER_SUITES: &[&str] = &[
    "ECDHE-RSA-AES256-GCM-SHA384",
    "ECDHE-RSA-AES128-GCM-SHA256",
    "ECDHE-ECDSA-AES256-GCM-SHA384",
    "ECDHE-ECDSA-AES128-GCM-SHA256",
    "ECDHE-RSA-AES256-SHA",
    "ECDHE-RSA-AES128-SHA",
    "AES256-SHA",
    "AES128-SHA",
];

impl ProtocolVersion {
    /// Look up a wire identifier in [`KNOWN_PROTOCOL_VERSIONS`]
    pub fn from_wire(id: u16) -> Option<Self> {
        KNOWN_PROTOCOL_VERSIONS
            .iter()
            .copied()
            .find(|v| v.wire() == id)
    }

    /// The on-the-wire identifier
    pub fn wire(self) -> u16 {
        self as u16
    }

    /// The equivalent OpenSSL protocol version
    pub fn to_ssl_version(self) -> SslVersion {
        match self {
            Self::Ssl3 => SslVersion::SSL3,
            Self::Tls10 => SslVersion::TLS1,
            Self::Tls11 => SslVersion::TLS1_1,
            Self::Tls12 => SslVersion::TLS1_2,
            Self::Tls13 => SslVersion::TLS1_3,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssl3 => write!(f, "SSLv3"),
            Self::Tls10 => write!(f, "TLSv1"),
            Self::Tls11 => write!(f, "TLSv1.1"),
            Self::Tls12 => write!(f, "TLSv1.2"),
            Self::Tls13 => write!(f, "TLSv1.3"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = TlsConfigError;

    /// Accepts `TLS1.2`, `tlsv1.2`, `TLS12`, `SSL3` and similar spellings.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '.' | '_' | '-' | ' ' | 'v'))
            .collect();
        match normalized.as_str() {
            "ssl3" | "ssl30" => Ok(Self::Ssl3),
            "tls1" | "tls10" => Ok(Self::Tls10),
            "tls11" => Ok(Self::Tls11),
            "tls12" => Ok(Self::Tls12),
            "tls13" => Ok(Self::Tls13),
            _ => Err(TlsConfigError::Config(format!(
                "Invalid TLS version: {}. Valid values are: SSL3, TLS1.0, TLS1.1, TLS1.2, TLS1.3",
                s
            ))),
        }
    }
}

/// Minimum version and cipher preferences selected for a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    pub min_version: ProtocolVersion,
    pub cipher_suites: Vec<&'static str>,
    pub prefer_server_ciphers: bool,
}

impl Role {
    /// Lowest protocol version this role may negotiate
    pub fn floor(self) -> ProtocolVersion {
        match self {
            Role::Server => SERVER_FLOOR,
            Role::Client => CLIENT_FLOOR,
        }
    }

    /// Fixed cipher preference list for this role
    pub fn cipher_suites(self) -> &'static [&'static str] {
        match self {
            Role::Server => SERVER_CIPHER_SUITES,
            Role::Client => CLIENT_CIPHER_SUITES,
        }
    }
}

/// Validate a requested minimum version against the role floor
///
/// An absent request resolves to the floor. Unknown identifiers are
/// rejected before the floor is consulted; known versions below the floor
/// are rejected rather than clamped.
///
/// # Errors
///
/// [`TlsConfigError::InvalidVersion`] or [`TlsConfigError::VersionTooLow`].
pub fn select_version_policy(role: Role, requested: Option<u16>) -> Result<VersionPolicy> {
    let floor = role.floor();

    let min_version = match requested {
        None => floor,
        Some(id) => {
            let version = ProtocolVersion::from_wire(id)
                .ok_or(TlsConfigError::InvalidVersion { role, version: id })?;
            if version < floor {
                return Err(TlsConfigError::VersionTooLow {
                    role,
                    requested: version,
                    floor,
                });
            }
            version
        }
    };

    debug!("Resolved {} minimum TLS version: {}", role, min_version);

    Ok(VersionPolicy {
        min_version,
        cipher_suites: role.cipher_suites().to_vec(),
        prefer_server_ciphers: role == Role::Server,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ordered() {
        assert!(KNOWN_PROTOCOL_VERSIONS.windows(2).all(|w| w[0] < w[1]));
        assert!(SERVER_FLOOR < CLIENT_FLOOR);
    }

    #[test]
    fn test_from_wire() {
        assert_eq!(ProtocolVersion::from_wire(0x0303), Some(ProtocolVersion::Tls12));
        assert_eq!(ProtocolVersion::from_wire(1), None);
        assert_eq!(ProtocolVersion::from_wire(0x0305), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("TLS1.2".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Tls12);
        assert_eq!("tlsv1.3".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Tls13);
        assert_eq!("TLSv1".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Tls10);
        assert_eq!("ssl3".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Ssl3);
        assert!("TLS2.0".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn test_absent_request_uses_floor() {
        let server = select_version_policy(Role::Server, None).unwrap();
        assert_eq!(server.min_version, SERVER_FLOOR);
        assert!(server.prefer_server_ciphers);
        assert_eq!(server.cipher_suites, SERVER_CIPHER_SUITES);

        let client = select_version_policy(Role::Client, None).unwrap();
        assert_eq!(client.min_version, CLIENT_FLOOR);
        assert!(!client.prefer_server_ciphers);
        assert_eq!(client.cipher_suites, CLIENT_CIPHER_SUITES);
    }

    #[test]
    fn test_floor_is_echoed() {
        for role in [Role::Server, Role::Client] {
            let policy = select_version_policy(role, Some(role.floor().wire())).unwrap();
            assert_eq!(policy.min_version, role.floor());
        }
        let policy = select_version_policy(Role::Server, Some(0x0302)).unwrap();
        assert_eq!(policy.min_version, ProtocolVersion::Tls11);
    }

    #[test]
    fn test_below_floor_is_rejected() {
        match select_version_policy(Role::Server, Some(ProtocolVersion::Ssl3.wire())) {
            Err(TlsConfigError::VersionTooLow { floor, requested, .. }) => {
                assert_eq!(floor, SERVER_FLOOR);
                assert_eq!(requested, ProtocolVersion::Ssl3);
            }
            other => panic!("expected VersionTooLow, got {:?}", other),
        }

        for v in [ProtocolVersion::Tls10, ProtocolVersion::Tls11] {
            assert!(matches!(
                select_version_policy(Role::Client, Some(v.wire())),
                Err(TlsConfigError::VersionTooLow { floor: CLIENT_FLOOR, .. })
            ));
        }
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        for role in [Role::Server, Role::Client] {
            assert!(matches!(
                select_version_policy(role, Some(1)),
                Err(TlsConfigError::InvalidVersion { version: 1, .. })
            ));
        }
    }

    #[test]
    fn test_cipher_lists_exclude_weak_suites() {
        for suite in SERVER_CIPHER_SUITES.iter().chain(CLIENT_CIPHER_SUITES) {
            assert!(!suite.contains("RC4"));
            assert!(!suite.contains("DES"));
            assert!(!suite.contains("EXP"));
        }
        assert!(SERVER_CIPHER_SUITES.starts_with(CLIENT_CIPHER_SUITES));
    }
}
