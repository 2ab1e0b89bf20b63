//! HMAC signatures for click links and the coarse open fingerprint.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Sign `click_id|dest_b64` with the server secret, hex-encoded.
#[must_use]
pub fn sign_click(secret: &str, click_id: &str, dest_b64: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(click_id.as_bytes());
    mac.update(b"|");
    mac.update(dest_b64.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a click signature.
#[must_use]
pub fn verify_click(secret: &str, click_id: &str, dest_b64: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(click_id.as_bytes());
    mac.update(b"|");
    mac.update(dest_b64.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Coarse client fingerprint for open events: a digest of the forwarded
/// address hint and user agent. Deliberately lossy; used only to group
/// repeated fetches, never to identify a client.
#[must_use]
pub fn client_fingerprint(addr_hint: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(addr_hint.as_bytes());
    hasher.update(b"-");
    hasher.update(user_agent.as_bytes());
    hex::encode(hasher.finalize())
}
