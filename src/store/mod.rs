//! Identity store: investors, users and verification tokens.
//!
//! Handlers and the auth flow only talk to [`IdentityStore`]; production runs
//! on [`MySqlStore`], tests on the in-memory store.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{
    errors::AppResult,
    models::{Approval, Investor, ProfileUpdate, User, VerificationToken},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[cfg(test)]
pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    // ── Investors ────────────────────────────────────────────

    async fn find_investor(&self, email: &str) -> AppResult<Option<Investor>>;

    /// Return the investor row for `email`, creating a blank one if absent.
    /// This is the only place an investor is created without profile data.
    async fn ensure_investor(&self, email: &str, now: NaiveDateTime) -> AppResult<Investor>;

    /// Upsert the profile fields and flip `profile_complete`. `user_id` is
    /// linked only if the row has none yet.
    async fn update_profile(
        &self,
        email:   &str,
        user_id: &str,
        profile: &ProfileUpdate,
        now:     NaiveDateTime,
    ) -> AppResult<Investor>;

    /// Set `approved` together with `approved_at`/`approved_by`. Re-approving
    /// keeps the original stamps. `None` when no investor row exists.
    async fn approve_investor(
        &self,
        email:       &str,
        approved_by: &str,
        now:         NaiveDateTime,
    ) -> AppResult<Option<Approval>>;

    async fn mark_magic_link_sent(&self, email: &str, now: NaiveDateTime) -> AppResult<()>;

    /// Newest first.
    async fn list_investors(&self, limit: u32) -> AppResult<Vec<Investor>>;

    // ── Users ────────────────────────────────────────────────

    /// Find the user for `email` or create it, stamping `email_verified` the
    /// first time.
    async fn find_or_create_user(&self, email: &str, now: NaiveDateTime) -> AppResult<User>;

    // ── Verification tokens ──────────────────────────────────

    async fn insert_verification_token(&self, token: &VerificationToken) -> AppResult<()>;

    /// Latest expiry among the identifier's tokens, used for the resend cooldown.
    async fn latest_token_expiry(&self, identifier: &str) -> AppResult<Option<NaiveDateTime>>;

    async fn purge_expired_tokens(&self, identifier: &str, now: NaiveDateTime) -> AppResult<u64>;

    /// Atomically delete the `(identifier, token)` row and return it. Returns
    /// `None` when there was nothing to delete, including when a concurrent
    /// caller deleted it first.
    async fn take_verification_token(
        &self,
        identifier: &str,
        token:      &str,
    ) -> AppResult<Option<VerificationToken>>;
}
