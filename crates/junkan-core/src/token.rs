// SPDX-License-Identifier: Apache-2.0

use crate::sha256_hex;

/// Bytes from the thread-local CSPRNG. Every bit is uniform.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|_| rand::random::<u8>()).collect()
}

/// Opaque bearer token handed to clients. Only its digest is persisted.
#[must_use]
pub fn mint_token() -> String {
    hex::encode(random_bytes(32))
}

#[must_use]
pub fn token_digest(token: &str) -> String {
    sha256_hex(token.trim().as_bytes())
}
