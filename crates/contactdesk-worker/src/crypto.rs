use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::util::{hex_decode, hex_encode, random_bytes, sha256_hex};

const OUTPUT_LEN: usize = 32;
const SALT_LEN: usize = 16;
const API_KEY_PREFIX: &str = "cdk_";

/// Hex-encoded password hash together with its salt and round count.
#[derive(Debug, Clone)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
    pub iterations: u32,
}

fn derive(secret: &[u8], salt: &[u8], iterations: u32) -> [u8; OUTPUT_LEN] {
    let mut out = [0u8; OUTPUT_LEN];
    pbkdf2_hmac::<Sha256>(secret, salt, iterations.max(1), &mut out);
    out
}

/// PBKDF2-SHA256 with a random per-user salt.
pub fn hash_password(password: &str, iterations: u32) -> Result<PasswordHash, getrandom::Error> {
    let salt = random_bytes(SALT_LEN)?;
    let iterations = iterations.max(1);
    let out = derive(password.as_bytes(), &salt, iterations);
    Ok(PasswordHash {
        hash: hex_encode(&out),
        salt: hex_encode(&salt),
        iterations,
    })
}

/// Checks against the rounds recorded in `stored`, not the current setting.
pub fn verify_password(password: &str, stored: &PasswordHash) -> bool {
    let (Some(salt), Some(expected)) = (hex_decode(&stored.salt), hex_decode(&stored.hash)) else {
        return false;
    };
    if expected.len() != OUTPUT_LEN {
        return false;
    }

    // Derive and constant-time compare.
    let out = derive(password.as_bytes(), &salt, stored.iterations);
    subtle::ConstantTimeEq::ct_eq(out.as_slice(), expected.as_slice()).into()
}

/// New plaintext API key. Shown to the caller exactly once.
pub fn generate_api_key() -> Result<String, getrandom::Error> {
    let bytes = random_bytes(32)?;
    Ok(format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
}

pub fn hash_api_key(key: &str) -> String {
    sha256_hex(key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verifies_only_with_same_secret() {
        let stored = hash_password("correct horse", 10).unwrap();
        assert_eq!(stored.iterations, 10);
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("battery staple", &stored));

        let other_rounds = PasswordHash {
            iterations: 11,
            ..stored
        };
        assert!(!verify_password("correct horse", &other_rounds));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let stored = PasswordHash {
            hash: "xyz".to_string(),
            salt: "00".to_string(),
            iterations: 10,
        };
        assert!(!verify_password("anything", &stored));
    }

    #[test]
    fn api_keys_are_prefixed_and_hash_deterministically() {
        let key = generate_api_key().unwrap();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(hash_api_key(&key), hash_api_key(&key));
        assert_ne!(hash_api_key(&key), hash_api_key("cdk_other"));
    }
}
