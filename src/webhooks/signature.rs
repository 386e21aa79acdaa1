//! Svix webhook signature verification.
//!
//! The signed content is `{svix-id}.{svix-timestamp}.{body}`, MACed with
//! HMAC-SHA256 under the base64-decoded secret (minus its `whsec_` prefix).
//! `svix-signature` carries one or more space-separated `v1,<base64>` entries.

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";
/// Allowed clock skew between the sender and us, in seconds.
const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

#[derive(Debug, Clone, Copy)]
pub struct SvixHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> SvixHeaders<'a> {
    pub fn from_headers(headers: &'a HeaderMap) -> AppResult<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .ok_or(AppError::MissingHeaders)
        };
        Ok(Self {
            id: get(HEADER_ID)?,
            timestamp: get(HEADER_TIMESTAMP)?,
            signature: get(HEADER_SIGNATURE)?,
        })
    }
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> AppResult<Self> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = BASE64.decode(encoded).map_err(|e| {
            AppError::Configuration(format!("WEBHOOK_SECRET is not valid base64: {e}"))
        })?;
        if key.is_empty() {
            return Err(AppError::Configuration("WEBHOOK_SECRET is empty".into()));
        }
        Ok(Self { key })
    }

    /// Signature header value for a message, e.g. `v1,K5oZfz...`.
    pub fn sign(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> String {
        format!("{SIGNATURE_VERSION},{}", self.digest(msg_id, timestamp, body))
    }

    fn digest(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    pub fn verify(
        &self,
        headers: &SvixHeaders<'_>,
        body: &[u8],
        now: OffsetDateTime,
    ) -> AppResult<()> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| AppError::Verification("invalid signature headers".into()))?;
        let now = now.unix_timestamp();
        if now.abs_diff(timestamp) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            let message = if timestamp < now {
                "message timestamp too old"
            } else {
                "message timestamp too new"
            };
            return Err(AppError::Verification(message.into()));
        }

        let expected = self.digest(headers.id, headers.timestamp, body);
        let matched = headers
            .signature
            .split(' ')
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .any(|(_, signature)| bool::from(signature.as_bytes().ct_eq(expected.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(AppError::Verification("no matching signature found".into()))
        }
    }
}
