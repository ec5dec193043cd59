//! Server and client policy assembly

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::identity::{load_identity, LoadedIdentity};
use super::pool::{build_trust_pool, OsTrustStore, SystemTrustStore, TrustPool};
use super::version::{select_version_policy, ProtocolVersion};
use crate::common::Result;
use crate::config::{ClientAuthPolicy, TlsOptions};

/// Which end of the connection a policy configures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Client,
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

/// A validated TLS policy, ready to hand to the engine
///
/// For a server, `trust_pool` verifies client certificates; for a client it
/// verifies the server. `None` means the engine's default roots.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub role: Role,
    pub identity: Option<LoadedIdentity>,
    pub trust_pool: Option<TrustPool>,
    pub min_version: ProtocolVersion,
    pub cipher_suites: Vec<&'static str>,
    pub prefer_server_ciphers: bool,
    /// Always [`ClientAuthPolicy::None`] for clients
    pub client_auth: ClientAuthPolicy,
    /// Always `false` for servers
    pub insecure_skip_verify: bool,
}

impl ResolvedPolicy {
    fn base(role: Role) -> Self {
        Self {
            role,
            identity: None,
            trust_pool: None,
            min_version: role.floor(),
            cipher_suites: role.cipher_suites().to_vec(),
            prefer_server_ciphers: role == Role::Server,
            client_auth: ClientAuthPolicy::None,
            insecure_skip_verify: false,
        }
    }

    /// Server policy with the floor version, server ciphers and server
    /// cipher preference, and nothing else
    pub fn server_default() -> Self {
        Self::base(Role::Server)
    }

    /// [`server_default`](Self::server_default) with caller adjustments
    /// applied in order
    pub fn server_default_with<I>(adjust: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn FnOnce(&mut ResolvedPolicy)>>,
    {
        let mut policy = Self::server_default();
        for f in adjust {
            f(&mut policy);
        }
        policy
    }

    /// Client policy with the client floor version and client ciphers
    pub fn client_default() -> Self {
        Self::base(Role::Client)
    }

    /// [`client_default`](Self::client_default) with caller adjustments
    /// applied in order
    pub fn client_default_with<I>(adjust: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn FnOnce(&mut ResolvedPolicy)>>,
    {
        let mut policy = Self::client_default();
        for f in adjust {
            f(&mut policy);
        }
        policy
    }
}

/// Assembles policies against an injected system trust store
#[derive(Debug, Clone, Default)]
pub struct PolicyAssembler<S = OsTrustStore> {
    system: S,
}

impl PolicyAssembler<OsTrustStore> {
    /// Assembler backed by the operating system's roots
    pub fn new() -> Self {
        Self { system: OsTrustStore }
    }
}

impl<S: SystemTrustStore> PolicyAssembler<S> {
    pub fn with_trust_store(system: S) -> Self {
        Self { system }
    }

    /// Assemble a server policy
    ///
    /// Steps run in order (identity, trust pool, version) and the first
    /// failure is returned. The CA bundle is always parsed, but only wired
    /// into client verification when `client_auth` verifies certificates.
    ///
    /// # Errors
    ///
    /// Any [`TlsConfigError`](crate::common::TlsConfigError) from the
    /// individual steps.
    pub fn server(&self, options: &TlsOptions) -> Result<ResolvedPolicy> {
        let role = Role::Server;

        let identity = load_identity(role, options.cert_path(), options.key_path(), options.passphrase())?;
        let pool = build_trust_pool(role, options.ca_path(), options.exclusive_root_pools, &self.system)?;
        let versions = select_version_policy(role, options.min_version)?;

        let trust_pool = if options.client_auth.verifies() {
            pool
        } else {
            if pool.is_some() {
                debug!(
                    "Client auth policy {} does not verify certificates; CA pool not used",
                    options.client_auth
                );
            }
            None
        };

        info!(
            "Assembled server TLS policy (client auth: {}, min version: {})",
            options.client_auth, versions.min_version
        );

        Ok(ResolvedPolicy {
            role,
            identity,
            trust_pool,
            min_version: versions.min_version,
            cipher_suites: versions.cipher_suites,
            prefer_server_ciphers: versions.prefer_server_ciphers,
            client_auth: options.client_auth,
            insecure_skip_verify: false,
        })
    }

    /// Assemble a client policy
    ///
    /// With `insecure_skip_verify` the CA bundle is still parsed, but no pool
    /// is attached.
    ///
    /// # Errors
    ///
    /// Any [`TlsConfigError`](crate::common::TlsConfigError) from the
    /// individual steps.
    pub fn client(&self, options: &TlsOptions) -> Result<ResolvedPolicy> {
        let role = Role::Client;

        let identity = load_identity(role, options.cert_path(), options.key_path(), options.passphrase())?;
        let pool = build_trust_pool(role, options.ca_path(), options.exclusive_root_pools, &self.system)?;
        let versions = select_version_policy(role, options.min_version)?;

        let trust_pool = if options.insecure_skip_verify {
            warn!("Server certificate verification is disabled");
            None
        } else {
            pool
        };

        info!("Assembled client TLS policy (min version: {})", versions.min_version);

        Ok(ResolvedPolicy {
            role,
            identity,
            trust_pool,
            min_version: versions.min_version,
            cipher_suites: versions.cipher_suites,
            prefer_server_ciphers: versions.prefer_server_ciphers,
            client_auth: ClientAuthPolicy::None,
            insecure_skip_verify: options.insecure_skip_verify,
        })
    }
}

/// Assemble a server policy against the operating system's roots
pub fn server(options: &TlsOptions) -> Result<ResolvedPolicy> {
    PolicyAssembler::new().server(options)
}

/// Assemble a client policy against the operating system's roots
pub fn client(options: &TlsOptions) -> Result<ResolvedPolicy> {
    PolicyAssembler::new().client(options)
}
