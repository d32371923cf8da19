use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

/// Lower-case hex SHA-512 of the input.
pub fn hex_digest(input: &str) -> String {
    let hash = Sha512::digest(input.as_bytes());
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Base64-encoded HMAC-SHA256 of `data` with `key`.
pub fn hmac_sha256_base64(key: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = match Hmac::<Sha256>::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}
