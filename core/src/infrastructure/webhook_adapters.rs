// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Webhook adapters (C10) — verification strategies looked up by name
//! through `application::webhook_dispatcher::AdapterRegistry`, mirroring
//! `original_source/api/src/services/webhooks/registry.py`'s
//! `register`/`get` pattern. `GenericHmacAdapter` is the default: an
//! `X-Bifrost-Signature: sha256=<hex>` header over the raw body.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::event::{WebhookAdapter, WebhookVerificationError};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-bifrost-signature";

pub struct GenericHmacAdapter;

impl WebhookAdapter for GenericHmacAdapter {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn verify(
        &self,
        secret: &str,
        headers: &std::collections::HashMap<String, String>,
        body: &[u8],
    ) -> Result<serde_json::Value, WebhookVerificationError> {
        let header = headers
            .get(SIGNATURE_HEADER)
            .ok_or(WebhookVerificationError::MissingSignature)?;
        let provided_hex = header.strip_prefix("sha256=").unwrap_or(header);
        let provided = hex::decode(provided_hex).map_err(|_| WebhookVerificationError::SignatureMismatch)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(&provided).unwrap_u8() != 1 {
            return Err(WebhookVerificationError::SignatureMismatch);
        }

        serde_json::from_slice(body).map_err(|_| WebhookVerificationError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"ok": true}"#;
        let signature = sign("topsecret", body);
        let mut headers = std::collections::HashMap::new();
        headers.insert(SIGNATURE_HEADER.to_string(), signature);

        let adapter = GenericHmacAdapter;
        let payload = adapter.verify("topsecret", &headers, body).unwrap();
        assert_eq!(payload["ok"], true);
    }

    #[test]
    fn missing_header_is_rejected() {
        let adapter = GenericHmacAdapter;
        let err = adapter.verify("topsecret", &std::collections::HashMap::new(), b"{}").unwrap_err();
        assert!(matches!(err, WebhookVerificationError::MissingSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"ok": true}"#;
        let signature = sign("wrong-secret", body);
        let mut headers = std::collections::HashMap::new();
        headers.insert(SIGNATURE_HEADER.to_string(), signature);

        let adapter = GenericHmacAdapter;
        let err = adapter.verify("topsecret", &headers, body).unwrap_err();
        assert!(matches!(err, WebhookVerificationError::SignatureMismatch));
    }
}
