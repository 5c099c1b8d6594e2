pub mod email;
pub mod magic_link;
pub mod redirect;
pub mod session;

use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::errors::{AppError, AppResult};

// ── Token helpers ─────────────────────────────────────────────

/// Generate a 64-char hex token from two UUIDs (256 bits of entropy).
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Hash a raw verification token for storage, salted with the session secret
/// so a leaked table cannot be replayed against another deployment.
pub fn hash_token(raw: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

// ── Email helpers ─────────────────────────────────────────────

/// Trim and lower-case an address, rejecting anything that is not an email.
/// Investor and user rows are keyed by this form.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }
    if !email.validate_email() {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    Ok(email)
}
