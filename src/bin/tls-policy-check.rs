//! Tool to assemble a TLS policy from options and report the result

use clap::{ArgAction, Args, Parser, Subcommand};
use log::{info, warn};
use openssl::hash::MessageDigest;
use openssl::x509::X509Ref;
use std::path::PathBuf;
use std::process::exit;

use tls_policy::common::init_logger;
use tls_policy::config::{parse_version_id, ClientAuthPolicy, TlsOptions};
use tls_policy::{ResolvedPolicy, Result, Role, APP_NAME, VERSION};

/// Assemble and check a server or client TLS policy
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Cli {
    /// Log level
    #[clap(long, default_value = "info", global = true)]
    log_level: String,

    #[clap(subcommand)]
    role: RoleCommand,
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    /// Assemble a server policy
    Server(OptionArgs),
    /// Assemble a client policy
    Client(OptionArgs),
}

#[derive(Args, Debug)]
struct OptionArgs {
    /// Load options from a JSON file (default: ./tls-policy.json if present);
    /// flags below override it
    #[clap(long)]
    config_file: Option<PathBuf>,

    /// CA bundle path
    #[clap(long)]
    ca_file: Option<PathBuf>,

    /// Certificate chain path
    #[clap(long)]
    cert_file: Option<PathBuf>,

    /// Private key path
    #[clap(long)]
    key_file: Option<PathBuf>,

    /// Passphrase for an encrypted private key
    #[clap(long, env = "TLS_POLICY_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Client certificate policy (none, request, require-any, verify-if-given, require-and-verify)
    #[clap(long)]
    client_auth: Option<ClientAuthPolicy>,

    /// Minimum protocol version (e.g. TLS1.2 or 0x0303)
    #[clap(long, value_parser = parse_version_id)]
    min_version: Option<u16>,

    /// Do not verify the server certificate [true|false]
    #[clap(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    insecure_skip_verify: Option<bool>,

    /// Trust only the CA bundle, not the system roots [true|false]
    #[clap(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    exclusive_root_pools: Option<bool>,

    /// Also build the OpenSSL acceptor/connector from the policy
    #[clap(long)]
    build: bool,
}

impl OptionArgs {
    fn to_options(&self) -> Result<TlsOptions> {
        let mut options = TlsOptions::load(self.config_file.as_deref())?;

        if self.ca_file.is_some() {
            options.ca_file = self.ca_file.clone();
        }
        if self.cert_file.is_some() {
            options.cert_file = self.cert_file.clone();
        }
        if self.key_file.is_some() {
            options.key_file = self.key_file.clone();
        }
        if self.passphrase.is_some() {
            options.passphrase = self.passphrase.clone();
        }
        if let Some(client_auth) = self.client_auth {
            options.client_auth = client_auth;
        }
        if self.min_version.is_some() {
            options.min_version = self.min_version;
        }
        if let Some(skip) = self.insecure_skip_verify {
            options.insecure_skip_verify = skip;
        }
        if let Some(exclusive) = self.exclusive_root_pools {
            options.exclusive_root_pools = exclusive;
        }

        Ok(options)
    }
}

/// Comma-separated subject entries of `cert`
fn subject_line(cert: &X509Ref) -> String {
    cert.subject_name()
        .entries()
        .map(|e| String::from_utf8_lossy(e.data().as_slice()).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_policy(policy: &ResolvedPolicy) {
    println!("Role:             {}", policy.role);
    println!("Minimum version:  {}", policy.min_version);
    println!("Cipher suites:    {}", policy.cipher_suites.join(":"));
    println!("Prefer server:    {}", policy.prefer_server_ciphers);

    match &policy.identity {
        Some(identity) => {
            let leaf = identity.leaf();
            let subject = subject_line(leaf);
            println!("Identity:         {} ({} certificate(s))", subject, identity.chain().len());
            match leaf.digest(MessageDigest::sha256()) {
                Ok(digest) => {
                    let hex: Vec<String> = digest.iter().map(|b| format!("{:02X}", b)).collect();
                    println!("Fingerprint:      {}", hex.join(":"));
                }
                Err(e) => warn!("Unable to get certificate fingerprint: {}", e),
            }
        }
        None => println!("Identity:         none"),
    }

    match &policy.trust_pool {
        Some(pool) => println!("Trust pool:       {} root(s)", pool.len()),
        None => println!("Trust pool:       engine default"),
    }

    match policy.role {
        Role::Server => println!("Client auth:      {}", policy.client_auth),
        Role::Client => println!("Skip verify:      {}", policy.insecure_skip_verify),
    }
}

fn run(cli: Cli) -> Result<()> {
    let (role, args) = match &cli.role {
        RoleCommand::Server(args) => (Role::Server, args),
        RoleCommand::Client(args) => (Role::Client, args),
    };
    let options = args.to_options()?;

    let policy = match role {
        Role::Server => tls_policy::server(&options)?,
        Role::Client => tls_policy::client(&options)?,
    };
    print_policy(&policy);

    if args.build {
        match role {
            Role::Server => {
                policy.acceptor_builder()?.build();
            }
            Role::Client => {
                policy.connector_builder()?.build();
            }
        }
        info!("OpenSSL accepted the {} policy", role);
        println!("Engine:           OK");
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logger(&cli.log_level);
    info!("{} v{}", APP_NAME, VERSION);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::nid::Nid;
    use openssl::x509::{X509Name, X509};
    use std::io::Write;

    fn args(argv: &[&str]) -> OptionArgs {
        match Cli::try_parse_from(argv).unwrap().role {
            RoleCommand::Server(args) | RoleCommand::Client(args) => args,
        }
    }

    #[test]
    fn test_flags_override_file_both_ways() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"insecure_skip_verify": true, "exclusive_root_pools": false, "ca_file": "file.pem"}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let options = args(&[
            "tls-policy-check",
            "client",
            "--config-file",
            path,
            "--insecure-skip-verify=false",
            "--exclusive-root-pools",
        ])
        .to_options()
        .unwrap();
        assert!(!options.insecure_skip_verify);
        assert!(options.exclusive_root_pools);
        assert_eq!(options.ca_path(), Some(std::path::Path::new("file.pem")));

        // Without the flags the file's values stand
        let options = args(&["tls-policy-check", "client", "--config-file", path])
            .to_options()
            .unwrap();
        assert!(options.insecure_skip_verify);
        assert!(!options.exclusive_root_pools);
    }

    #[test]
    fn test_parse_server_flags() {
        let args = args(&[
            "tls-policy-check",
            "server",
            "--client-auth",
            "verify-if-given",
            "--min-version",
            "TLS1.2",
        ]);
        assert_eq!(args.client_auth, Some(ClientAuthPolicy::VerifyClientCertIfGiven));
        assert_eq!(args.min_version, Some(0x0303));
        assert_eq!(args.insecure_skip_verify, None);
    }

    #[test]
    fn test_subject_line() {
        let mut name = X509Name::builder().unwrap();
        name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "Example").unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "server.example").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_subject_name(&name).unwrap();
        let cert = builder.build();

        assert_eq!(subject_line(&cert), "Example, server.example");
    }
}
