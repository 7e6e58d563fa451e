//! # yt-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Handles password hashes and HMAC-signed session tokens.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;
use yt_core::traits::AuthProvider;

type HmacSha256 = Hmac<Sha256>;

pub struct SimpleAuthProvider {
    /// Key for signing session tokens (from configuration)
    session_key: Vec<u8>,
    session_ttl: Duration,
}

impl SimpleAuthProvider {
    /// Accepts the signing key (e.g., from an environment variable) and session lifetime.
    pub fn new(session_key: &str, session_ttl: Duration) -> Self {
        Self {
            session_key: session_key.as_bytes().to_vec(),
            session_ttl,
        }
    }

    fn sign(&self, payload: &str) -> anyhow::Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.session_key)
            .map_err(|e| anyhow!("invalid session key: {e}"))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn issue_session_at(&self, user_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<String> {
        let expires = now
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| anyhow!("session lifetime {} is out of range", self.session_ttl))?
            .timestamp();
        let payload = format!("{user_id}.{expires}");
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Token format: `<user uuid>.<expiry unix seconds>.<hex hmac of the first two parts>`
    fn resolve_session_at(&self, token: &str, now: DateTime<Utc>) -> Option<Uuid> {
        let mut parts = token.splitn(3, '.');
        let (user_part, expires_part, signature) = (parts.next()?, parts.next()?, parts.next()?);

        let signature = hex::decode(signature).ok()?;
        let mut mac = HmacSha256::new_from_slice(&self.session_key).ok()?;
        mac.update(format!("{user_part}.{expires_part}").as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature).ok()?;

        let expires: i64 = expires_part.parse().ok()?;
        if now.timestamp() >= expires {
            return None;
        }
        Uuid::parse_str(user_part).ok()
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    /// Hashes with Argon2id default parameters and a fresh 16-byte salt.
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!("no entropy for salt: {e}"))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("bad salt: {e}"))?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn issue_session(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_session_at(user_id, Utc::now())
    }

    fn resolve_session(&self, token: &str) -> Option<Uuid> {
        let resolved = self.resolve_session_at(token, Utc::now());
        if resolved.is_none() {
            log::debug!("rejected session token");
        }
        resolved
    }
}
