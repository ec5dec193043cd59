//! Default configuration values
//!
//! Single source of truth for option defaults.

use super::ClientAuthPolicy;

/// Environment variable prefix for all options (`TLS_POLICY_CA_FILE`, ...)
pub const ENV_PREFIX: &str = "TLS_POLICY";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "tls-policy.json";

/// Default client certificate policy
pub fn client_auth() -> ClientAuthPolicy {
    ClientAuthPolicy::None
}
