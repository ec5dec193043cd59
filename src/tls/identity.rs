//! Certificate and private key loading

use log::{debug, info};
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::fmt;
use std::path::Path;

use super::Role;
use crate::common::fs::read_pem_file;
use crate::common::{LoadError, Result, TlsConfigError};

/// A parsed certificate chain and its matching private key
#[derive(Clone)]
pub struct LoadedIdentity {
    chain: Vec<X509>,
    key: PKey<Private>,
}

impl LoadedIdentity {
    /// Pair an already parsed chain with its key
    ///
    /// The first certificate is the leaf and must match `key`.
    pub fn new(chain: Vec<X509>, key: PKey<Private>) -> std::result::Result<Self, LoadError> {
        let leaf = chain
            .first()
            .ok_or_else(|| LoadError::Format("no certificates found".to_string()))?;
        if !leaf.public_key()?.public_eq(&key) {
            return Err(LoadError::Format(
                "private key does not match certificate".to_string(),
            ));
        }
        Ok(Self { chain, key })
    }

    /// Leaf certificate
    pub fn leaf(&self) -> &X509 {
        &self.chain[0]
    }

    /// Certificates following the leaf
    pub fn intermediates(&self) -> &[X509] {
        &self.chain[1..]
    }

    /// Full chain, leaf first
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.key
    }

    /// DER encoding of each certificate in chain order
    pub fn chain_der(&self) -> std::result::Result<Vec<Vec<u8>>, LoadError> {
        self.chain
            .iter()
            .map(|c| c.to_der().map_err(LoadError::from))
            .collect()
    }
}

impl fmt::Debug for LoadedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedIdentity")
            .field("chain_len", &self.chain.len())
            .field("key_bits", &self.key.bits())
            .finish_non_exhaustive()
    }
}

/// Read a PEM certificate chain and private key and pair them
///
/// A key in an encrypted PEM envelope needs `passphrase`; without one the
/// load fails with a message saying so instead of a generic parse error.
pub fn load_key_pair(
    cert_path: &Path,
    key_path: &Path,
    passphrase: Option<&str>,
) -> std::result::Result<LoadedIdentity, LoadError> {
    let cert_pem = read_pem_file(cert_path)?;
    let chain = X509::stack_from_pem(&cert_pem)?;

    let key_pem = read_pem_file(key_path)?;
    let key = match passphrase {
        Some(pass) => PKey::private_key_from_pem_passphrase(&key_pem, pass.as_bytes())?,
        None if is_encrypted_pem(&key_pem) => {
            return Err(LoadError::Format(
                "private key is encrypted, but no passphrase was supplied".to_string(),
            ));
        }
        None => PKey::private_key_from_pem(&key_pem)?,
    };

    LoadedIdentity::new(chain, key)
}

fn is_encrypted_pem(pem: &[u8]) -> bool {
    let text = String::from_utf8_lossy(pem);
    text.contains("BEGIN ENCRYPTED PRIVATE KEY") || text.contains("Proc-Type: 4,ENCRYPTED")
}

/// Resolve the optional certificate/key pair of a request
///
/// Both absent yields `None`. Exactly one present is a configuration error.
pub fn load_identity(
    role: Role,
    cert_path: Option<&Path>,
    key_path: Option<&Path>,
    passphrase: Option<&str>,
) -> Result<Option<LoadedIdentity>> {
    let (cert, key) = match (cert_path, key_path) {
        (None, None) => {
            debug!("No {} certificate configured", role);
            return Ok(None);
        }
        (Some(cert), Some(key)) => (cert, key),
        _ => {
            return Err(TlsConfigError::InvalidConfiguration {
                role,
                reason: "certificate and key must both be supplied or both omitted".to_string(),
            });
        }
    };

    let identity = load_key_pair(cert, key, passphrase).map_err(|source| {
        TlsConfigError::IdentityLoad {
            role,
            cert: cert.to_path_buf(),
            key: key.to_path_buf(),
            source,
        }
    })?;

    info!(
        "Loaded {} certificate {} ({} certificate(s) in chain)",
        role,
        cert.display(),
        identity.chain().len()
    );
    Ok(Some(identity))
}
