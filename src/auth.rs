//! Passwords and bearer-token sessions.
//!
//! Passwords are hashed with PBKDF2-SHA256 and a per-user random salt;
//! verification is constant-time. Bearer tokens are 32 random bytes, stored
//! server-side only as SHA-256 hashes, with a TTL per session.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db::{self, DatabaseError, StoredCredentials};
use crate::models::enums::UserRole;
use crate::models::User;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

/// Default session lifetime: 8 hours.
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 3600;

// ═══════════════════════════════════════════════════════════
// Password hashing
// ═══════════════════════════════════════════════════════════

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive the PBKDF2-SHA256 digest for a password + salt.
fn hash_password(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut hash);
    hash
}

/// Hash a new password with a fresh salt, producing the stored form.
pub fn derive_credentials(password: &str) -> StoredCredentials {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    let b64 = base64::engine::general_purpose::STANDARD;
    StoredCredentials {
        password_hash: b64.encode(hash),
        password_salt: b64.encode(salt),
    }
}

/// Constant-time password check against stored credentials.
pub fn verify_password(password: &str, credentials: &StoredCredentials) -> bool {
    let b64 = base64::engine::general_purpose::STANDARD;
    let Ok(salt) = b64.decode(&credentials.password_salt) else {
        return false;
    };
    let Ok(stored) = b64.decode(&credentials.password_hash) else {
        return false;
    };

    let computed = hash_password(password, &salt);
    computed.as_slice().ct_eq(stored.as_slice()).into()
}

// ═══════════════════════════════════════════════════════════
// Bearer tokens
// ═══════════════════════════════════════════════════════════

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

// ═══════════════════════════════════════════════════════════
// Session store
// ═══════════════════════════════════════════════════════════

/// An authenticated user attached to a live token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    expires_at: Instant,
}

/// In-memory token → session map. Tokens are stored hashed; expired entries
/// are dropped on access and swept when the store grows large.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_SESSION_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Issue a fresh token for a signed-in user.
    pub fn issue(&mut self, user: &User) -> String {
        if self.sessions.len() > 1000 {
            self.sweep();
        }

        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            Session {
                user_id: user.id,
                username: user.username.clone(),
                role: user.role,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Resolve a presented token. Expired sessions are removed and report as
    /// absent.
    pub fn resolve(&mut self, token: &str) -> Option<Session> {
        let key = hash_token(token);
        match self.sessions.get(&key) {
            Some(session) if Instant::now() < session.expires_at => Some(session.clone()),
            Some(_) => {
                self.sessions.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Revoke a token (logout). Returns whether it existed.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn sweep(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, s| now < s.expires_at);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// First-run admin account
// ═══════════════════════════════════════════════════════════

/// Make sure at least one admin account exists. Returns the generated
/// password when an account had to be created (so startup can log it once);
/// `PRAXIA_ADMIN_PASSWORD` overrides the generated one.
pub fn ensure_admin_account(conn: &Connection) -> Result<Option<String>, DatabaseError> {
    if db::count_admins(conn)? > 0 {
        return Ok(None);
    }

    let password = std::env::var("PRAXIA_ADMIN_PASSWORD").unwrap_or_else(|_| generate_token());
    let user = User {
        id: Uuid::new_v4(),
        username: "admin".to_string(),
        display_name: "Administrator".to_string(),
        role: UserRole::Admin,
        created_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_user(conn, &user, &derive_credentials(&password))?;

    tracing::warn!("No admin account found; created user 'admin'");
    Ok(Some(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn sample_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "drkadiri".to_string(),
            display_name: "Dr. Kadiri".to_string(),
            role,
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn password_round_trip_verifies() {
        let credentials = derive_credentials("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &credentials));
        assert!(!verify_password("wrong password", &credentials));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = derive_credentials("password");
        let b = derive_credentials("password");
        assert_ne!(a.password_salt, b.password_salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn garbage_credentials_never_verify() {
        let credentials = StoredCredentials {
            password_hash: "not base64 ***".to_string(),
            password_salt: "also not ***".to_string(),
        };
        assert!(!verify_password("anything", &credentials));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
        assert!(!t1.is_empty());
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("test"), hash_token("test"));
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }

    #[test]
    fn issued_token_resolves_to_session() {
        let mut store = SessionStore::new();
        let user = sample_user(UserRole::Practitioner);
        let token = store.issue(&user);

        let session = store.resolve(&token).unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.username, "drkadiri");
        assert_eq!(session.role, UserRole::Practitioner);
    }

    #[test]
    fn unknown_token_does_not_resolve() {
        let mut store = SessionStore::new();
        assert!(store.resolve("nonexistent").is_none());
    }

    #[test]
    fn revoked_token_stops_resolving() {
        let mut store = SessionStore::new();
        let token = store.issue(&sample_user(UserRole::Admin));

        assert!(store.revoke(&token));
        assert!(store.resolve(&token).is_none());
        // Second revoke is a no-op
        assert!(!store.revoke(&token));
    }

    #[test]
    fn expired_session_is_dropped_on_access() {
        let mut store = SessionStore::with_ttl(Duration::ZERO);
        let token = store.issue(&sample_user(UserRole::Admin));

        assert!(store.resolve(&token).is_none());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn sessions_are_independent_per_token() {
        let mut store = SessionStore::new();
        let t1 = store.issue(&sample_user(UserRole::Admin));
        let t2 = store.issue(&sample_user(UserRole::Assistant));

        assert!(store.revoke(&t1));
        assert!(store.resolve(&t2).is_some());
    }

    #[test]
    fn ensure_admin_creates_account_once() {
        let conn = open_memory_database().unwrap();

        let created = ensure_admin_account(&conn).unwrap();
        assert!(created.is_some());

        let again = ensure_admin_account(&conn).unwrap();
        assert!(again.is_none());

        let (user, credentials) =
            crate::db::get_user_by_username(&conn, "admin").unwrap().unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert!(verify_password(&created.unwrap(), &credentials));
    }
}
