//! Option loading from files and the environment
//!
//! Sources are layered with the `config` crate:
//! 1. Default values (lowest priority)
//! 2. Configuration file (JSON)
//! 3. `TLS_POLICY_*` environment variables

use config::{Config, Environment, File, FileFormat, Map};
use log::{debug, warn};
use std::env;
use std::path::Path;

use super::defaults::{DEFAULT_CONFIG_FILE, ENV_PREFIX};
use super::TlsOptions;
use crate::common::{Result, TlsConfigError};

/// Option names the environment layer may set
const ENV_FIELDS: &[&str] = &[
    "ca_file",
    "cert_file",
    "key_file",
    "client_auth",
    "insecure_skip_verify",
    "exclusive_root_pools",
    "min_version",
    "passphrase",
];

/// `TLS_POLICY_*` variables that name a known option
///
/// Other variables under the prefix belong to the embedding program and are
/// skipped, so they never reach `deny_unknown_fields`.
fn option_vars<I>(vars: I) -> Map<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = format!("{}_", ENV_PREFIX);
    let mut selected = Map::new();
    for (name, value) in vars {
        let Some(field) = name.strip_prefix(&prefix) else {
            continue;
        };
        if ENV_FIELDS.contains(&field.to_lowercase().as_str()) {
            selected.insert(name, value);
        } else {
            debug!("Ignoring unrelated environment variable {}", name);
        }
    }
    selected
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .source(Some(option_vars(env::vars_os().filter_map(|(name, value)| {
            Some((name.into_string().ok()?, value.into_string().ok()?))
        }))))
}

fn build(builder: config::ConfigBuilder<config::builder::DefaultState>, origin: &str) -> Result<TlsOptions> {
    builder
        .build()
        .and_then(|cfg| cfg.try_deserialize::<TlsOptions>())
        .map_err(|e| TlsConfigError::Config(format!("Failed to load TLS options from {}: {}", origin, e)))
}

impl TlsOptions {
    /// Load options from a JSON file, with environment variables on top
    ///
    /// # Errors
    ///
    /// Returns [`TlsConfigError::Config`] if the file is missing or does not
    /// describe valid options.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading TLS options from {}", path.display());

        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(true))
            .add_source(environment());
        build(builder, &path.display().to_string())
    }

    /// Load options from environment variables only
    pub fn from_env() -> Result<Self> {
        debug!("Loading TLS options from {}_* environment variables", ENV_PREFIX);
        build(Config::builder().add_source(environment()), "environment")
    }

    /// Load options from `path`, falling back to [`DEFAULT_CONFIG_FILE`] in
    /// the working directory and then to the environment alone
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            Self::from_file(default)
        } else {
            if default.exists() {
                warn!("{} is not a regular file; ignoring it", default.display());
            }
            Self::from_env()
        }
    }
}
