//! User accounts and credential handling.
//!
//! The booking core treats identity as a collaborator: it only needs an
//! authenticated owner for order operations. This module keeps that
//! collaborator small — salted password hashes and opaque bearer tokens.

use common::UserId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A registered user. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Registration / profile-update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Hashes a password with a fresh random salt, returning `"salt$digest"`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex(&salt);
    let digest = digest_with_salt(&salt_hex, password);
    format!("{salt_hex}${digest}")
}

/// Verifies a password against a stored `"salt$digest"` value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    digest_with_salt(salt, password) == digest
}

/// Generates an opaque bearer token value.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn digest_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
