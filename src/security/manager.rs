//! Token issuance and verification over the shared slot table.
//!
//! All scan-and-claim and scan-and-expire sequences run under one
//! exclusive lock (the token table mutex owned by the state store), held
//! for the whole read-modify-write. Two concurrent callers can therefore
//! never claim the same slot or observe a half-updated token.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::state::StateStore;
use crate::{truncate_utf8, MAX_CLIENTS, MAX_NAME_LEN, TOKEN_LEN};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token table full")]
    CapacityExceeded,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Token expired")]
    TokenExpired,
}

/// Opaque fixed-length random token.
///
/// Compared byte-for-byte; hex encoding is provided for the front-end
/// boundary, where tokens travel as strings.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken([u8; TOKEN_LEN]);

impl AuthToken {
    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; TOKEN_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Token material stays out of logs.
        f.write_str("AuthToken(..)")
    }
}

/// One entry in the fixed-capacity token table.
#[derive(Default)]
struct TokenSlot {
    token: [u8; TOKEN_LEN],
    username: String,
    authenticated: bool,
    created_at: u64,
}

/// Fixed slot array of capacity [`MAX_CLIENTS`]. Owned by the state
/// store; mutated only under the store's token mutex.
pub struct TokenTable {
    slots: [TokenSlot; MAX_CLIENTS],
}

impl TokenTable {
    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| TokenSlot::default()) }
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Issues and verifies tokens against the shared slot table.
pub struct SecurityManager {
    state: Arc<StateStore>,
    token_ttl: Duration,
}

impl SecurityManager {
    pub fn new(state: Arc<StateStore>, token_ttl: Duration) -> Self {
        Self { state, token_ttl }
    }

    /// Issue a token for `username`, claiming the lowest free slot.
    ///
    /// The password is reduced to a one-way SHA-256 digest and then
    /// discarded: there is no stored credential to compare against, so
    /// **any password authenticates**. This buys transport-level identity,
    /// not secrecy, and callers needing real credential checks must layer
    /// them above the broker.
    ///
    /// Repeated calls for the same username claim independent slots; no
    /// dedupe or refresh happens (multi-session by construction).
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(usize, AuthToken), AuthError> {
        let _digest = digest_password(password);

        let mut table = self.state.tokens.lock();
        for (idx, slot) in table.slots.iter_mut().enumerate() {
            if slot.authenticated {
                continue;
            }
            let mut bytes = [0u8; TOKEN_LEN];
            OsRng.fill_bytes(&mut bytes);
            slot.token = bytes;
            slot.username = truncate_utf8(username, MAX_NAME_LEN).to_string();
            slot.authenticated = true;
            slot.created_at = epoch_secs();
            tracing::debug!(slot = idx, "token issued");
            return Ok((idx, AuthToken(bytes)));
        }

        tracing::warn!("token table full");
        Err(AuthError::CapacityExceeded)
    }

    /// Verify a token, returning its slot index and stored username.
    ///
    /// Expiry is lazy: a token past its TTL is invalidated here, at the
    /// moment it is checked, and the slot is freed for reuse. A later
    /// verify of the same token reports `TokenNotFound`.
    pub fn verify(&self, token: &AuthToken) -> Result<(usize, String), AuthError> {
        self.verify_at(token, epoch_secs())
    }

    /// Verification against an explicit clock, so expiry is testable
    /// without waiting out the TTL.
    pub(crate) fn verify_at(
        &self,
        token: &AuthToken,
        now: u64,
    ) -> Result<(usize, String), AuthError> {
        let ttl = self.token_ttl.as_secs();

        let mut table = self.state.tokens.lock();
        for (idx, slot) in table.slots.iter_mut().enumerate() {
            if !slot.authenticated || !constant_time_eq(&slot.token, token.as_bytes()) {
                continue;
            }
            if now.saturating_sub(slot.created_at) > ttl {
                slot.authenticated = false;
                tracing::debug!(slot = idx, "token expired, slot reclaimed");
                return Err(AuthError::TokenExpired);
            }
            return Ok((idx, slot.username.clone()));
        }

        Err(AuthError::TokenNotFound)
    }
}

/// Hex-encoded SHA-256 of the password.
fn digest_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn epoch_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
