//! Digest helpers shared by the gateway clients.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

pub fn sha256_hex(message: &str) -> String {
    to_hex(&Sha256::digest(message.as_bytes()))
}

pub fn sha512_hex(message: &str) -> String {
    to_hex(&Sha512::digest(message.as_bytes()))
}

/// Hex-encoded HMAC-SHA256, as used by webhook signature headers.
pub fn hmac_sha256_hex(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    to_hex(&mac.finalize().into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_encoding() {
        assert_eq!(to_hex(&[0x00, 0xff, 0x0a]), "00ff0a");
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(sha256_hex(""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn hmac_is_deterministic() {
        let a = hmac_sha256_hex("secret", b"payload");
        let b = hmac_sha256_hex("secret", b"payload");
        assert_eq!(a, b);
        assert_ne!(a, hmac_sha256_hex("other", b"payload"));
    }
}
