//! Console output, human-readable or JSON.

use medchain::{HashedInput, RegistrationReceipt, RegistrationRecord, Verification};
use serde_json::{json, Value};

use crate::config::Config;

/// Prints command results in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit(&self, value: Value, human: impl FnOnce() -> String) {
        if self.json {
            println!("{}", value);
        } else {
            println!("{}", human());
        }
    }

    pub fn key(&self, registrant: &str, out: Option<&str>, seed_hex: Option<&str>) {
        self.emit(
            json!({ "registrant": registrant, "key_file": out, "seed": seed_hex }),
            || match (out, seed_hex) {
                (Some(path), _) => format!("Key written to {}\nRegistrant: {}", path, registrant),
                (None, Some(seed)) => format!("{}\n# registrant: {}", seed, registrant),
                (None, None) => format!("Registrant: {}", registrant),
            },
        );
    }

    pub fn hashed(&self, hashed: &HashedInput) {
        self.emit(
            json!({
                "digest": hashed.digest,
                "size": hashed.size,
                "content_type": hashed.content_type,
            }),
            || hashed.digest.to_string(),
        );
    }

    pub fn receipt(&self, receipt: &RegistrationReceipt) {
        self.emit(json!(receipt), || {
            format!(
                "Registered {}\n  entry:      #{}\n  registrant: {}\n  time:       {} ms\n  attempts:   {}",
                receipt.digest(),
                receipt.position(),
                receipt.registrant().to_hex(),
                receipt.registered_at(),
                receipt.attempts,
            )
        });
    }

    pub fn verification(&self, verification: &Verification) {
        self.emit(
            json!({
                "digest": verification.digest,
                "registered": verification.is_registered(),
                "record": verification.record,
            }),
            || match &verification.record {
                Some(record) => format!("Verified: {}", describe_record(record)),
                None => format!("Not found: {} is not registered", verification.digest),
            },
        );
    }

    pub fn lookup(&self, digest: &medchain::Digest, record: Option<&RegistrationRecord>) {
        self.emit(
            json!({ "digest": digest, "registered": record.is_some(), "record": record }),
            || match record {
                Some(record) => describe_record(record),
                None => format!("Not found: {} is not registered", digest),
            },
        );
    }

    pub fn status(&self, config: &Config, count: u64) {
        let allowed: Vec<String> = config
            .policy
            .allowed
            .iter()
            .map(|t| t.mime().to_string())
            .collect();
        self.emit(
            json!({
                "database": config.storage.path,
                "registered": count,
                "max_bytes": config.policy.max_bytes,
                "allowed": allowed,
            }),
            || {
                let allowed = if allowed.is_empty() {
                    "any".to_string()
                } else {
                    allowed.join(", ")
                };
                format!(
                    "Database:   {}\nRegistered: {}\nMax size:   {} bytes\nAllowed:    {}",
                    config.storage.path.display(),
                    count,
                    config.policy.max_bytes,
                    allowed
                )
            },
        );
    }
}

fn describe_record(record: &RegistrationRecord) -> String {
    format!(
        "{} registered as entry #{} by {} at {} ms",
        record.digest,
        record.position,
        record.registrant.to_hex(),
        record.registered_at
    )
}
