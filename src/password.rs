//! Staff password hashing.
//!
//! Salted, iterated HMAC-SHA-256. Stored as `v1$<iterations>$<salt-hex>$<digest-hex>`
//! so the cost can be raised later without invalidating existing hashes.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = derive(password.as_bytes(), &salt, ITERATIONS)?;
    Ok(format!(
        "v1${ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    ))
}

/// Verify a password against a stored hash string.
///
/// Returns `false` for wrong passwords *and* for malformed hashes — a
/// corrupt row must never let someone in.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (version, iterations, salt_hex, digest_hex) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(v), Some(i), Some(s), Some(d), None) => (v, i, s, d),
        _ => return false,
    };
    if version != "v1" {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };
    let Ok(actual) = derive(password.as_bytes(), &salt, iterations) else {
        return false;
    };
    constant_time_eq(&actual, &expected)
}

/// Chained HMAC: each round feeds the previous digest back through
/// HMAC-SHA-256 keyed by the salt.
fn derive(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; 32]> {
    let mut block: Vec<u8> = password.to_vec();
    for _ in 0..iterations {
        let mut mac = HmacSha256::new_from_slice(salt)
            .map_err(|e| anyhow!("hmac key setup failed: {e}"))?;
        mac.update(&block);
        block = mac.finalize().into_bytes().to_vec();
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&block);
    Ok(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("v1$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn salts_are_unique() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "v1$notanumber$00$00"));
        assert!(!verify_password("x", "v2$1000$00$00"));
        assert!(!verify_password("x", "v1$1000$zz$zz"));
    }
}
