//! Shared helpers for integration tests
//!
//! Generates throwaway CA, leaf and key material into a temporary directory.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::symm::Cipher;
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509NameBuilder, X509};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use tls_policy::tls::{FixedTrustStore, TrustPool};
use tls_policy::PolicyAssembler;

/// A certificate with its private key
pub struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn build(cn: &str, key: &PKey<Private>, issuer: Option<&Issued>, is_ca: bool) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();

    if is_ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().pathlen(1).build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .digital_signature()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    } else {
        builder
            .append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .key_encipherment()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let san = SubjectAlternativeName::new()
            .dns("localhost")
            .build(&builder.x509v3_context(issuer.map(|i| &*i.cert), None))
            .unwrap();
        builder.append_extension(san).unwrap();
    }

    let signer = issuer.map(|i| &i.key).unwrap_or(key);
    builder.sign(signer, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Self-signed CA with an EC key
pub fn ca(cn: &str) -> Issued {
    let key = ec_key();
    let cert = build(cn, &key, None, true);
    Issued { cert, key }
}

/// Self-signed CA with an RSA key
pub fn rsa_ca(cn: &str) -> Issued {
    let key = rsa_key();
    let cert = build(cn, &key, None, true);
    Issued { cert, key }
}

/// Intermediate CA with an EC key, signed by `issuer`
pub fn intermediate(cn: &str, issuer: &Issued) -> Issued {
    let key = ec_key();
    let cert = build(cn, &key, Some(issuer), true);
    Issued { cert, key }
}

/// Leaf for `localhost` signed by `issuer`, with an RSA key
pub fn leaf(cn: &str, issuer: &Issued) -> Issued {
    let key = rsa_key();
    let cert = build(cn, &key, Some(issuer), false);
    Issued { cert, key }
}

/// Temporary directory holding generated files
pub struct Pki {
    pub dir: TempDir,
}

impl Pki {
    pub fn new() -> Self {
        Self {
            dir: tempfile::Builder::new().prefix("tls-policy-test").tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write PEM certificates to `name`
    pub fn write_certs(&self, name: &str, certs: &[&X509]) -> PathBuf {
        let mut pem = Vec::new();
        for cert in certs {
            pem.extend_from_slice(&cert.to_pem().unwrap());
        }
        let path = self.path(name);
        fs::write(&path, pem).unwrap();
        path
    }

    /// Write a traditional (PKCS#1 for RSA) PEM private key to `name`
    pub fn write_key(&self, name: &str, key: &PKey<Private>) -> PathBuf {
        let pem = match key.rsa() {
            Ok(rsa) => rsa.private_key_to_pem().unwrap(),
            Err(_) => key.private_key_to_pem_pkcs8().unwrap(),
        };
        let path = self.path(name);
        fs::write(&path, pem).unwrap();
        path
    }

    /// Write an encrypted PKCS#8 PEM private key to `name`
    pub fn write_encrypted_key(&self, name: &str, key: &PKey<Private>, passphrase: &str) -> PathBuf {
        let pem = key
            .private_key_to_pem_pkcs8_passphrase(Cipher::aes_256_cbc(), passphrase.as_bytes())
            .unwrap();
        let path = self.path(name);
        fs::write(&path, pem).unwrap();
        path
    }

    pub fn write_raw(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Identity signed by `issuer`: returns (cert chain path, key path, leaf)
    pub fn identity(&self, issuer: &Issued) -> (PathBuf, PathBuf, Issued) {
        let leaf = leaf("test", issuer);
        let cert = self.write_certs("cert.pem", &[&leaf.cert, &issuer.cert]);
        let key = self.write_key("key.pem", &leaf.key);
        (cert, key, leaf)
    }

    /// Two CA certificates (RSA and EC) in one bundle
    pub fn multi_ca(&self) -> (PathBuf, Issued, Issued) {
        let rsa = rsa_ca("multi-rsa");
        let ec = ca("multi-ec");
        let path = self.write_certs("multi.pem", &[&rsa.cert, &ec.cert]);
        (path, rsa, ec)
    }

    /// An existing empty file
    pub fn empty_file(&self) -> PathBuf {
        self.write_raw("empty", b"")
    }
}

/// Stand-in for the platform roots
pub struct FakeSystem {
    pub root: Issued,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self { root: ca("fake system root") }
    }

    pub fn pool(&self) -> TrustPool {
        TrustPool::from_certs([self.root.cert.clone()]).unwrap()
    }

    pub fn assembler(&self) -> PolicyAssembler<FixedTrustStore> {
        PolicyAssembler::with_trust_store(FixedTrustStore::new(self.pool()))
    }
}
