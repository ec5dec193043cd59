//! Trust pools and the system trust store
//!
//! A [`TrustPool`] is the set of root certificates a policy verifies peers
//! against. It is either the platform roots, the platform roots merged with
//! a CA bundle, or (for exclusive pools) the bundle alone.

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use openssl::error::ErrorStack;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509StoreContext, X509};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::Role;
use crate::common::fs::read_pem_file;
use crate::common::{LoadError, Result, TlsConfigError};

/// An unordered set of trusted root certificates
///
/// Certificates are deduplicated by their DER encoding, so merging
/// overlapping sources is harmless.
#[derive(Clone, Default)]
pub struct TrustPool {
    certs: Vec<X509>,
    seen: HashSet<Vec<u8>>,
}

impl TrustPool {
    /// An empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from parsed certificates
    pub fn from_certs<I>(certs: I) -> std::result::Result<Self, LoadError>
    where
        I: IntoIterator<Item = X509>,
    {
        let mut pool = Self::new();
        pool.extend(certs)?;
        Ok(pool)
    }

    /// Add a certificate; returns `false` if it was already present
    pub fn add(&mut self, cert: X509) -> std::result::Result<bool, LoadError> {
        let der = cert.to_der()?;
        if !self.seen.insert(der) {
            return Ok(false);
        }
        self.certs.push(cert);
        Ok(true)
    }

    pub fn extend<I>(&mut self, certs: I) -> std::result::Result<(), LoadError>
    where
        I: IntoIterator<Item = X509>,
    {
        for cert in certs {
            self.add(cert)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Whether this exact certificate is a member
    pub fn contains(&self, cert: &X509) -> bool {
        cert.to_der()
            .map(|der| self.seen.contains(&der))
            .unwrap_or(false)
    }

    /// DER-encoded subject names of every member
    pub fn subjects(&self) -> std::result::Result<Vec<Vec<u8>>, LoadError> {
        self.certs
            .iter()
            .map(|c| c.subject_name().to_der().map_err(LoadError::from))
            .collect()
    }

    /// An OpenSSL verification store holding every member
    pub fn to_store(&self) -> std::result::Result<X509Store, ErrorStack> {
        let mut builder = X509StoreBuilder::new()?;
        for cert in &self.certs {
            builder.add_cert(cert.clone())?;
        }
        Ok(builder.build())
    }

    /// Verify `cert` against this pool, using `intermediates` as untrusted
    /// chain material
    pub fn verify(&self, cert: &X509, intermediates: &[X509]) -> std::result::Result<bool, LoadError> {
        let store = self.to_store()?;
        let mut chain = Stack::new()?;
        for c in intermediates {
            chain.push(c.clone())?;
        }

        let mut ctx = X509StoreContext::new()?;
        let verified = ctx.init(&store, cert, &chain, |c| {
            let ok = c.verify_cert()?;
            if !ok {
                debug!("Certificate verification failed: {}", c.error());
            }
            Ok(ok)
        })?;
        Ok(verified)
    }
}

impl fmt::Debug for TrustPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustPool")
            .field("len", &self.certs.len())
            .finish()
    }
}

/// Source of the platform's trusted roots
#[cfg_attr(test, mockall::automock)]
pub trait SystemTrustStore: Send + Sync {
    /// The platform trust pool
    fn system_pool(&self) -> std::result::Result<TrustPool, LoadError>;
}

/// The operating system's trust store
///
/// Roots are read once per process and shared read-only afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsTrustStore;

static OS_ROOTS: OnceCell<TrustPool> = OnceCell::new();

impl SystemTrustStore for OsTrustStore {
    fn system_pool(&self) -> std::result::Result<TrustPool, LoadError> {
        OS_ROOTS.get_or_try_init(load_native_roots).cloned()
    }
}

fn load_native_roots() -> std::result::Result<TrustPool, LoadError> {
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        warn!("Failed to load system certificate: {}", err);
    }
    if result.certs.is_empty() && !result.errors.is_empty() {
        return Err(LoadError::Format(format!(
            "no system certificates could be loaded ({} error(s))",
            result.errors.len()
        )));
    }

    let mut pool = TrustPool::new();
    for der in result.certs {
        match X509::from_der(der.as_ref()) {
            Ok(cert) => {
                pool.add(cert)?;
            }
            Err(e) => warn!("Skipping unparsable system certificate: {}", e),
        }
    }

    info!("Loaded {} system root certificates", pool.len());
    Ok(pool)
}

/// A trust store that always returns the same pool
#[derive(Debug, Clone, Default)]
pub struct FixedTrustStore {
    pool: TrustPool,
}

impl FixedTrustStore {
    pub fn new(pool: TrustPool) -> Self {
        Self { pool }
    }
}

impl SystemTrustStore for FixedTrustStore {
    fn system_pool(&self) -> std::result::Result<TrustPool, LoadError> {
        Ok(self.pool.clone())
    }
}

/// Parse zero or more PEM certificates
///
/// Input without any certificate block yields an empty list; a malformed
/// block is an error.
pub fn parse_certificate_bundle(pem: &[u8]) -> std::result::Result<Vec<X509>, LoadError> {
    Ok(X509::stack_from_pem(pem)?)
}

/// Resolve the trust pool for a request
///
/// With no bundle the result is `None` (the engine's implicit default)
/// unless `exclusive` is set, in which case the system pool is returned
/// explicitly. With a bundle, the bundle is merged into the system pool or,
/// when `exclusive`, used on its own.
pub fn build_trust_pool(
    role: Role,
    ca_bundle_path: Option<&Path>,
    exclusive: bool,
    system: &dyn SystemTrustStore,
) -> Result<Option<TrustPool>> {
    let system_pool = || {
        system
            .system_pool()
            .map_err(|source| TlsConfigError::SystemTrustStore { role, source })
    };

    let path = match ca_bundle_path {
        Some(path) => path,
        None if exclusive => {
            debug!("Exclusive {} root pool requested without a CA bundle; using system roots", role);
            return system_pool().map(Some);
        }
        None => return Ok(None),
    };

    let bundle_error = |source| TlsConfigError::TrustBundleLoad {
        role,
        path: path.to_path_buf(),
        source,
    };
    let pem = read_pem_file(path).map_err(bundle_error)?;
    let certs = parse_certificate_bundle(&pem).map_err(bundle_error)?;
    if certs.is_empty() {
        warn!("No root certificates loaded from file {}", path.display());
    }

    let pool = if exclusive {
        TrustPool::from_certs(certs).map_err(bundle_error)?
    } else {
        let mut pool = system_pool()?;
        pool.extend(certs).map_err(bundle_error)?;
        pool
    };

    info!(
        "Built {} {} root pool from {} ({} certificates)",
        if exclusive { "exclusive" } else { "merged" },
        role,
        path.display(),
        pool.len()
    );
    Ok(Some(pool))
}
