// SPDX-License-Identifier: Apache-2.0

//! Salted PBKDF2-HMAC-SHA256 password hashing.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt-hex>$<hash-hex>`. The
//! derived key is a single 32-byte block, so only `T_1` of RFC 8018 is
//! computed.

use crate::token::random_bytes;
use crate::CoreError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const PASSWORD_ITERATIONS: u32 = 100_000;
const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; 32], CoreError> {
    let prf = HmacSha256::new_from_slice(password).map_err(|e| CoreError(e.to_string()))?;
    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1_u32.to_be_bytes());
    let mut u = mac.finalize().into_bytes();
    let mut out = [0_u8; 32];
    out.copy_from_slice(&u);
    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&u);
        u = mac.finalize().into_bytes();
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }
    Ok(out)
}

pub fn hash_password(password: &str) -> Result<String, CoreError> {
    hash_password_with_iterations(password, PASSWORD_ITERATIONS)
}

pub fn hash_password_with_iterations(password: &str, iterations: u32) -> Result<String, CoreError> {
    if iterations == 0 {
        return Err(CoreError("iterations must be > 0".to_string()));
    }
    let salt = random_bytes(SALT_LEN);
    let key = derive(password.as_bytes(), &salt, iterations)?;
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(key)
    ))
}

/// Malformed encodings never verify.
#[must_use]
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.len() != 32 {
        return false;
    }
    match derive(password.as_bytes(), &salt, iterations) {
        Ok(actual) => constant_time_eq(&actual, &expected),
        Err(_) => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
