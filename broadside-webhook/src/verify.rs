//! Elliptic-curve signature verification for inbound webhook batches.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use p256::pkcs8::DecodePublicKey;

use crate::WebhookError;

/// Verifies the provider's ECDSA-P256/SHA-256 signature over
/// `timestamp || raw_body`.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    key: VerifyingKey,
}

impl WebhookVerifier {
    /// Load the public key from PEM (`-----BEGIN PUBLIC KEY-----`) or
    /// base64-encoded DER.
    pub fn from_key_material(material: &str) -> Result<Self, WebhookError> {
        let material = material.trim();
        let key = if material.starts_with("-----BEGIN") {
            VerifyingKey::from_public_key_pem(material)
                .map_err(|_| WebhookError::InvalidPublicKey)?
        } else {
            let der = STANDARD
                .decode(material)
                .map_err(|_| WebhookError::InvalidPublicKey)?;
            VerifyingKey::from_public_key_der(&der).map_err(|_| WebhookError::InvalidPublicKey)?
        };
        Ok(Self { key })
    }

    /// Verify a batch signature. The signed string is the timestamp header
    /// concatenated with the raw request body.
    pub fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_b64: &str,
    ) -> Result<(), WebhookError> {
        let der = STANDARD
            .decode(signature_b64.trim())
            .map_err(|_| WebhookError::InvalidSignature)?;
        let signature =
            Signature::from_der(&der).map_err(|_| WebhookError::InvalidSignature)?;

        let mut signed = Vec::with_capacity(timestamp.len() + body.len());
        signed.extend_from_slice(timestamp.as_bytes());
        signed.extend_from_slice(body);

        self.key
            .verify(&signed, &signature)
            .map_err(|_| WebhookError::InvalidSignature)
    }
}
