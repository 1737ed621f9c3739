use chrono::{DateTime, Utc};
use getrandom::fill;
use sha2::{Digest, Sha256};

pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn ts_to_rfc3339(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .unwrap_or_default()
        .to_rfc3339()
}

/// Truncate a unix timestamp to 00:00:00 UTC of the same day.
pub fn start_of_day(ts: i64) -> i64 {
    ts - ts.rem_euclid(86_400)
}

pub fn random_bytes(len: usize) -> Result<Vec<u8>, getrandom::Error> {
    let mut out = vec![0u8; len];
    fill(&mut out)?;
    Ok(out)
}

pub fn hex_encode(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0f) as usize] as char);
    }
    out
}

pub fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

/// 256-bit opaque token, hex-encoded.
pub fn generate_token() -> Result<String, getrandom::Error> {
    Ok(hex_encode(&random_bytes(32)?))
}

pub fn uuid_v4() -> Result<String, getrandom::Error> {
    // Format: 8-4-4-4-12 hex characters.
    let mut b = random_bytes(16)?;

    // Set version = 4.
    b[6] = (b[6] & 0x0f) | 0x40;
    // Set variant = RFC4122.
    b[8] = (b[8] & 0x3f) | 0x80;

    let hex = hex_encode(&b);
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

pub fn is_uuid_like(s: &str) -> bool {
    // Accepts any UUID variant/version as long as it is 36 chars with dashes.
    let s = s.trim();
    if s.len() != 36 {
        return false;
    }

    s.chars().enumerate().all(|(i, c)| {
        if i == 8 || i == 13 || i == 18 || i == 23 {
            c == '-'
        } else {
            c.is_ascii_hexdigit()
        }
    })
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims and turns blank strings into `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
