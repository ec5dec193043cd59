//! Hand-off of resolved policies to OpenSSL

use log::{debug, info, warn};
use openssl::ssl::{
    SslAcceptor, SslAcceptorBuilder, SslConnector, SslConnectorBuilder, SslContextBuilder,
    SslMethod, SslOptions, SslVerifyMode,
};

use super::identity::LoadedIdentity;
use super::policy::{ResolvedPolicy, Role};
use crate::common::{Result, TlsConfigError};
use crate::config::ClientAuthPolicy;

fn require_role(policy: &ResolvedPolicy, role: Role, what: &str) -> Result<()> {
    if policy.role != role {
        return Err(TlsConfigError::InvalidConfiguration {
            role: policy.role,
            reason: format!("{} requires a {} policy", what, role),
        });
    }
    Ok(())
}

fn apply_identity(builder: &mut SslContextBuilder, identity: &LoadedIdentity) -> Result<()> {
    builder.set_certificate(identity.leaf())?;
    for cert in identity.intermediates() {
        builder.add_extra_chain_cert(cert.clone())?;
    }
    builder.set_private_key(identity.private_key())?;
    builder.check_private_key()?;
    Ok(())
}

fn apply_common(builder: &mut SslContextBuilder, policy: &ResolvedPolicy) -> Result<()> {
    builder.set_min_proto_version(Some(policy.min_version.to_ssl_version()))?;
    builder.set_cipher_list(&policy.cipher_suites.join(":"))?;
    if let Some(identity) = &policy.identity {
        apply_identity(builder, identity)?;
    }
    Ok(())
}

impl ResolvedPolicy {
    /// Build an OpenSSL acceptor configured from a server policy
    ///
    /// # Errors
    ///
    /// Fails for client policies, and when OpenSSL rejects any setting.
    pub fn acceptor_builder(&self) -> Result<SslAcceptorBuilder> {
        require_role(self, Role::Server, "an acceptor")?;

        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
        // The preset disables TLS 1.0/1.1; the policy's minimum decides instead.
        acceptor.clear_options(SslOptions::NO_TLSV1 | SslOptions::NO_TLSV1_1);
        apply_common(&mut acceptor, self)?;

        if self.prefer_server_ciphers {
            acceptor.set_options(SslOptions::CIPHER_SERVER_PREFERENCE);
        }

        match self.client_auth {
            ClientAuthPolicy::None => {
                info!("Client certificates not requested");
                acceptor.set_verify(SslVerifyMode::NONE);
            }
            ClientAuthPolicy::RequestClientCert => {
                info!("Client certificates requested (not verified)");
                acceptor.set_verify_callback(SslVerifyMode::PEER, |_, _| true);
            }
            ClientAuthPolicy::RequireAnyClientCert => {
                info!("Client certificates required (not verified)");
                acceptor.set_verify_callback(
                    SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
                    |_, _| true,
                );
            }
            ClientAuthPolicy::VerifyClientCertIfGiven => {
                info!("Client certificates optional (will be verified if provided)");
                acceptor.set_verify(SslVerifyMode::PEER);
            }
            ClientAuthPolicy::RequireAndVerifyClientCert => {
                info!("Client certificates required (will be verified)");
                acceptor.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
            }
        }

        if self.client_auth.verifies() {
            match &self.trust_pool {
                Some(pool) => {
                    debug!("Verifying client certificates against {} roots", pool.len());
                    acceptor.set_verify_cert_store(pool.to_store()?)?;
                }
                None => acceptor.set_default_verify_paths()?,
            }
        }

        Ok(acceptor)
    }

    /// Build an OpenSSL connector configured from a client policy
    ///
    /// # Errors
    ///
    /// Fails for server policies, and when OpenSSL rejects any setting.
    pub fn connector_builder(&self) -> Result<SslConnectorBuilder> {
        require_role(self, Role::Client, "a connector")?;

        let mut connector = SslConnector::builder(SslMethod::tls())?;
        apply_common(&mut connector, self)?;

        if self.insecure_skip_verify {
            warn!("Connector will not verify server certificates");
            connector.set_verify(SslVerifyMode::NONE);
        } else if let Some(pool) = &self.trust_pool {
            debug!("Verifying server certificates against {} roots", pool.len());
            connector.set_verify_cert_store(pool.to_store()?)?;
        }

        Ok(connector)
    }
}
