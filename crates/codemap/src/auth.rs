//! API-key based access control.
//!
//! Keys are random 256-bit values, handed out once at registration and never
//! persisted: only their SHA-256 hash is stored, and a fixed-length prefix of
//! that hash becomes the tenant ID that namespaces all storage access.
//!
//! # Failure directions
//!
//! Two deliberate, opposite choices that must stay this way:
//!
//! - Store failures during **validation** fail **closed**: an unverifiable
//!   key is treated as invalid and no tenant ID is revealed.
//! - Store failures during the **rate-limit check** fail **open**: a
//!   registration proceeds rather than being blocked by a broken counter.
//!   Availability over strictness for the one operation that has no tenant
//!   to protect yet.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::DEFAULT_REGISTRATIONS_PER_HOUR;
use crate::error::{Error, Result};
use crate::storage::Store;

/// Recognizable prefix on every issued API key.
pub const API_KEY_PREFIX: &str = "cmk_";

/// Random bytes per key: 256 bits of entropy.
const API_KEY_BYTES: usize = 32;

/// Length of the hash prefix used as the tenant identifier.
pub const TENANT_ID_LEN: usize = 16;

/// Stored record for an issued key, keyed by the key's hash.
///
/// Created once at registration and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// When the key was issued
    pub created_at: DateTime<Utc>,
}

/// Per-source-IP registration counter with its window reset time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Registrations seen in the current window
    pub count: u32,

    /// When the rolling-hour window resets
    pub reset_time: DateTime<Utc>,
}

/// Outcome of validating a presented API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValidation {
    /// Whether the key is known and well-formed
    pub valid: bool,

    /// The tenant namespace, present only for valid keys
    pub tenant_id: Option<String>,
}

impl KeyValidation {
    fn invalid() -> Self {
        Self {
            valid: false,
            tenant_id: None,
        }
    }
}

/// A freshly registered key and its derived tenant ID.
#[derive(Debug, Clone)]
pub struct RegisteredKey {
    /// The plaintext key; shown once, never stored
    pub api_key: String,

    /// Tenant namespace derived from the key hash
    pub tenant_id: String,
}

/// Generate a new API key: `cmk_` plus 256 random bits, base64url encoded.
///
/// Uses the operating system's CSPRNG; collisions are not practically
/// possible at this entropy, so no uniqueness check is performed.
#[must_use]
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Deterministic one-way hash of an API key (SHA-256, lowercase hex).
#[must_use]
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex_encode(&hasher.finalize())
}

/// Derive the tenant ID for a key: the first [`TENANT_ID_LEN`] characters of
/// its hash. Used purely as a storage namespace.
#[must_use]
pub fn derive_tenant_id(key: &str) -> String {
    let mut hash = hash_api_key(key);
    hash.truncate(TENANT_ID_LEN);
    hash
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}

/// Key registration and validation over an injected store.
pub struct AccessControl {
    store: Arc<dyn Store>,
    registrations_per_hour: u32,
}

impl AccessControl {
    /// Create an access controller with the default registration limit.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_limit(store, DEFAULT_REGISTRATIONS_PER_HOUR)
    }

    /// Create an access controller with an explicit per-IP hourly limit.
    #[must_use]
    pub fn with_limit(store: Arc<dyn Store>, registrations_per_hour: u32) -> Self {
        Self {
            store,
            registrations_per_hour,
        }
    }

    /// Issue a new API key for a caller at `source_ip`.
    ///
    /// Checks the per-IP rolling-hour rate limit first. Rate-limit
    /// bookkeeping failures fail open; persisting the key record itself
    /// must succeed, otherwise the key could never validate.
    ///
    /// # Errors
    ///
    /// - `Error::RateLimited` when the window is exhausted
    /// - `Error::Storage` when the key record cannot be persisted
    pub async fn register(&self, source_ip: &str) -> Result<RegisteredKey> {
        let now = Utc::now();

        let existing = match self.store.get_rate_limit(source_ip).await {
            Ok(record) => record,
            Err(e) => {
                warn!(source_ip, error = %e, "rate-limit lookup failed, failing open");
                None
            }
        };

        let updated = match existing {
            Some(record) if record.reset_time > now => {
                if record.count >= self.registrations_per_hour {
                    return Err(Error::RateLimited {
                        reset_time: record.reset_time,
                    });
                }
                RateLimitRecord {
                    count: record.count + 1,
                    reset_time: record.reset_time,
                }
            }
            // No record, or the previous window has ended
            _ => RateLimitRecord {
                count: 1,
                reset_time: now + Duration::hours(1),
            },
        };

        if let Err(e) = self.store.save_rate_limit(source_ip, &updated).await {
            warn!(source_ip, error = %e, "rate-limit update failed, failing open");
        }

        let api_key = generate_api_key();
        let key_hash = hash_api_key(&api_key);
        let tenant_id = derive_tenant_id(&api_key);

        self.store
            .put_api_key(&key_hash, &ApiKeyRecord { created_at: now })
            .await?;

        debug!(tenant_id, "registered new api key");
        Ok(RegisteredKey { api_key, tenant_id })
    }

    /// Validate a presented API key.
    ///
    /// Malformed and unknown keys are invalid; no tenant ID is revealed for
    /// them. Store failures during the lookup fail closed.
    pub async fn validate(&self, key: &str) -> KeyValidation {
        if !key.starts_with(API_KEY_PREFIX) {
            return KeyValidation::invalid();
        }

        let key_hash = hash_api_key(key);
        match self.store.get_api_key(&key_hash).await {
            Ok(Some(_)) => KeyValidation {
                valid: true,
                tenant_id: Some(derive_tenant_id(key)),
            },
            Ok(None) => KeyValidation::invalid(),
            Err(e) => {
                warn!(error = %e, "api-key lookup failed, failing closed");
                KeyValidation::invalid()
            }
        }
    }
}
