//! Password and token primitives.
//!
//! Passwords are stored as argon2id PHC strings. API tokens are opaque
//! random values handed to the client once; only their SHA-256 digest is
//! persisted, so a leaked token table cannot be replayed.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{RequestError, RequestResult};

/// Number of random bytes backing a freshly minted token.
const TOKEN_BYTES: usize = 32;

pub fn hash_password(password: &str) -> RequestResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|why| RequestError::Other(why.to_string().into()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Mints a new opaque token. The plain value goes to the client, the
/// digest into the store.
pub fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex(&bytes)
}

pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex(&digest)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
