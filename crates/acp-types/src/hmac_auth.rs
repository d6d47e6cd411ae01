//! Constant-effort HMAC-SHA-256 hashing of presented keys, shared by the
//! governance hub and the key-vault executor. The pepper is a deployment
//! secret; raw keys are never stored.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn hash_api_key(pepper: &str, presented_key: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(pepper.as_bytes()).expect("HMAC accepts any key length");
    mac.update(presented_key.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_and_pepper_hash_identically() {
        let a = hash_api_key("pepper", "kernel-key-123");
        let b = hash_api_key("pepper", "kernel-key-123");
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_hash_differently() {
        let a = hash_api_key("pepper", "kernel-key-123");
        let b = hash_api_key("pepper", "kernel-key-456");
        assert_ne!(a, b);
    }

    #[test]
    fn different_peppers_hash_differently() {
        let a = hash_api_key("pepper-a", "same-key");
        let b = hash_api_key("pepper-b", "same-key");
        assert_ne!(a, b);
    }
}
