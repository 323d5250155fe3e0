// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tencent Cloud API 3.0 request signing (TC3-HMAC-SHA256)

use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host";

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Signs POST requests with a JSON body for one service
#[derive(Debug, Clone)]
pub struct Tc3Signer {
    secret_id: String,
    secret_key: String,
    service: String,
}

impl Tc3Signer {
    pub fn new(secret_id: &str, secret_key: &str, service: &str) -> Self {
        Self {
            secret_id: secret_id.to_string(),
            secret_key: secret_key.to_string(),
            service: service.to_string(),
        }
    }

    /// `Authorization` header value for `payload` sent to `host` at `timestamp`
    pub fn authorization(&self, host: &str, payload: &str, timestamp: i64) -> String {
        let date = Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%d")
            .to_string();

        let canonical_request = format!(
            "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
            CONTENT_TYPE,
            host,
            SIGNED_HEADERS,
            sha256_hex(payload.as_bytes())
        );

        let credential_scope = format!("{}/{}/tc3_request", date, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            credential_scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let secret_date = hmac_sha256(format!("TC3{}", self.secret_key).as_bytes(), date.as_bytes());
        let secret_service = hmac_sha256(&secret_date, self.service.as_bytes());
        let secret_signing = hmac_sha256(&secret_service, b"tc3_request");
        let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes()));

        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.secret_id, credential_scope, SIGNED_HEADERS, signature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_rfc4231() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_authorization_format() {
        let signer = Tc3Signer::new("AKIDEXAMPLE", "secret", "tiia");
        // 2024-01-02T00:00:00Z
        let auth = signer.authorization("tiia.tencentcloudapi.com", "{}", 1_704_153_600);

        assert!(auth.starts_with(
            "TC3-HMAC-SHA256 Credential=AKIDEXAMPLE/2024-01-02/tiia/tc3_request, SignedHeaders=content-type;host, Signature="
        ));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_depends_on_payload_and_key() {
        let signer = Tc3Signer::new("AKID", "secret", "tiia");
        let a = signer.authorization("tiia.tencentcloudapi.com", r#"{"a":1}"#, 1_704_153_600);
        let b = signer.authorization("tiia.tencentcloudapi.com", r#"{"a":2}"#, 1_704_153_600);
        assert_ne!(a, b);

        let other = Tc3Signer::new("AKID", "other", "tiia");
        let c = other.authorization("tiia.tencentcloudapi.com", r#"{"a":1}"#, 1_704_153_600);
        assert_ne!(a, c);
        assert_eq!(
            a,
            signer.authorization("tiia.tencentcloudapi.com", r#"{"a":1}"#, 1_704_153_600)
        );
    }
}
