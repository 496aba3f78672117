use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TICKET_TTL_SECS: i64 = 900;

/// Phase-one artifact of the confirmation workflow. The signature binds the
/// correlation id to the digest of the exact payload that was validated and
/// priced, so a `confirmed=true` call carrying a different payload is
/// rejected rather than executed. Nothing is stored server-side; the ticket
/// is self-authenticating and expires after the configured TTL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationTicket {
    pub correlation_id: String,
    pub issued_at: DateTime<Utc>,
    pub token: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("confirmation ticket is malformed")]
    Malformed,
    #[error("confirmation ticket does not match the validated request")]
    Mismatch,
    #[error("confirmation ticket expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
}

#[derive(Clone)]
pub struct TicketIssuer {
    signing_key: SecretString,
    ttl: Duration,
}

impl TicketIssuer {
    pub fn new(signing_key: SecretString, ttl_secs: i64) -> Self {
        Self { signing_key, ttl: Duration::seconds(ttl_secs) }
    }

    pub fn issue(&self, correlation_id: &str, payload: &Value) -> ConfirmationTicket {
        let issued_at = Utc::now();
        self.issue_at(correlation_id, payload, issued_at)
    }

    fn issue_at(
        &self,
        correlation_id: &str,
        payload: &Value,
        issued_at: DateTime<Utc>,
    ) -> ConfirmationTicket {
        let signature = self.sign(correlation_id, issued_at.timestamp(), &payload_digest(payload));
        let token = format!("{correlation_id}.{}.{signature}", issued_at.timestamp());
        ConfirmationTicket { correlation_id: correlation_id.to_owned(), issued_at, token }
    }

    /// Checks the token against the payload the caller is now asking to
    /// execute. Returns the original correlation id on success.
    pub fn verify(
        &self,
        token: &str,
        payload: &Value,
        now: DateTime<Utc>,
    ) -> Result<String, TicketError> {
        let mut parts = token.splitn(3, '.');
        let (Some(correlation_id), Some(raw_issued_at), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TicketError::Malformed);
        };
        let issued_at_secs: i64 = raw_issued_at.parse().map_err(|_| TicketError::Malformed)?;

        let expected = self.sign(correlation_id, issued_at_secs, &payload_digest(payload));
        if expected != signature {
            return Err(TicketError::Mismatch);
        }

        let issued_at =
            DateTime::<Utc>::from_timestamp(issued_at_secs, 0).ok_or(TicketError::Malformed)?;
        let expired_at = issued_at + self.ttl;
        if now > expired_at {
            return Err(TicketError::Expired { expired_at });
        }

        Ok(correlation_id.to_owned())
    }

    fn sign(&self, correlation_id: &str, issued_at_secs: i64, digest: &str) -> String {
        let material = format!("{correlation_id}|{issued_at_secs}|{digest}");
        hmac_hex(self.signing_key.expose_secret().as_bytes(), material.as_bytes())
    }
}

/// SHA-256 over a canonical rendering of the payload: object keys are
/// serialized in sorted order so semantically identical payloads always
/// digest identically.
pub fn payload_digest(payload: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(payload, &mut canonical);
    sha256_hex(canonical.as_bytes())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            for (index, (key, value)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:", Value::String((*key).clone()));
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

fn hmac_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return sha256_hex(payload),
    };
    mac.update(payload);
    encode_hex(mac.finalize().into_bytes().as_slice())
}

fn sha256_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    encode_hex(digest.as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
