use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Calculates the base64-encoded HMAC-SHA256 signature the storefront attaches to webhook bodies.
pub fn calculate_hmac(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    base64::encode(mac.finalize().into_bytes())
}
