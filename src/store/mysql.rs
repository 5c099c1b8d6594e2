use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    db::Db,
    errors::AppResult,
    models::{Approval, Investor, ProfileUpdate, User, VerificationToken},
};

use super::IdentityStore;

const INVESTOR_COLUMNS: &str =
    "id, email, user_id, name, phone, company, profile_complete, approved, approved_at,
     approved_by, magic_link_sent, magic_link_sent_at, created_at, updated_at";

/// MySQL-backed store. Cloning is cheap: the pool is `Arc`-backed.
#[derive(Clone)]
pub struct MySqlStore {
    pool: Db,
}

impl MySqlStore {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for MySqlStore {
    async fn find_investor(&self, email: &str) -> AppResult<Option<Investor>> {
        let row = sqlx::query_as::<_, Investor>(&format!(
            "SELECT {INVESTOR_COLUMNS} FROM investors WHERE email = ? LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn ensure_investor(&self, email: &str, now: NaiveDateTime) -> AppResult<Investor> {
        // INSERT IGNORE leaves an existing row alone (unique key on email).
        sqlx::query(
            "INSERT IGNORE INTO investors (id, email, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, Investor>(&format!(
            "SELECT {INVESTOR_COLUMNS} FROM investors WHERE email = ? LIMIT 1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_profile(
        &self,
        email:   &str,
        user_id: &str,
        profile: &ProfileUpdate,
        now:     NaiveDateTime,
    ) -> AppResult<Investor> {
        sqlx::query(
            "INSERT INTO investors
                 (id, email, user_id, name, phone, company, profile_complete, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
             ON DUPLICATE KEY UPDATE
                 name             = VALUES(name),
                 phone            = VALUES(phone),
                 company          = VALUES(company),
                 profile_complete = 1,
                 user_id          = COALESCE(user_id, VALUES(user_id)),
                 updated_at       = VALUES(updated_at)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.company)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, Investor>(&format!(
            "SELECT {INVESTOR_COLUMNS} FROM investors WHERE email = ? LIMIT 1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn approve_investor(
        &self,
        email:       &str,
        approved_by: &str,
        now:         NaiveDateTime,
    ) -> AppResult<Option<Approval>> {
        let Some(before) = self.find_investor(email).await? else {
            return Ok(None);
        };

        // One statement sets all three fields; COALESCE keeps the first stamps.
        sqlx::query(
            "UPDATE investors
             SET approved    = 1,
                 approved_at = COALESCE(approved_at, ?),
                 approved_by = COALESCE(approved_by, ?),
                 updated_at  = ?
             WHERE email = ?",
        )
        .bind(now)
        .bind(approved_by)
        .bind(now)
        .bind(email)
        .execute(&self.pool)
        .await?;

        let investor = sqlx::query_as::<_, Investor>(&format!(
            "SELECT {INVESTOR_COLUMNS} FROM investors WHERE email = ? LIMIT 1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(Approval { investor, already_approved: before.approved }))
    }

    async fn mark_magic_link_sent(&self, email: &str, now: NaiveDateTime) -> AppResult<()> {
        sqlx::query(
            "UPDATE investors SET magic_link_sent = 1, magic_link_sent_at = ?, updated_at = ? WHERE email = ?",
        )
        .bind(now)
        .bind(now)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_investors(&self, limit: u32) -> AppResult<Vec<Investor>> {
        let rows = sqlx::query_as::<_, Investor>(&format!(
            "SELECT {INVESTOR_COLUMNS} FROM investors ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_or_create_user(&self, email: &str, now: NaiveDateTime) -> AppResult<User> {
        sqlx::query(
            "INSERT IGNORE INTO users (id, email, email_verified, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE users SET email_verified = ? WHERE email = ? AND email_verified IS NULL")
            .bind(now)
            .bind(email)
            .execute(&self.pool)
            .await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, email_verified, created_at FROM users WHERE email = ? LIMIT 1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_verification_token(&self, token: &VerificationToken) -> AppResult<()> {
        sqlx::query("INSERT INTO verification_tokens (identifier, token, expires) VALUES (?, ?, ?)")
            .bind(&token.identifier)
            .bind(&token.token)
            .bind(token.expires)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_token_expiry(&self, identifier: &str) -> AppResult<Option<NaiveDateTime>> {
        let expires: Option<NaiveDateTime> =
            sqlx::query_scalar("SELECT MAX(expires) FROM verification_tokens WHERE identifier = ?")
                .bind(identifier)
                .fetch_one(&self.pool)
                .await?;
        Ok(expires)
    }

    async fn purge_expired_tokens(&self, identifier: &str, now: NaiveDateTime) -> AppResult<u64> {
        let affected = sqlx::query("DELETE FROM verification_tokens WHERE identifier = ? AND expires <= ?")
            .bind(identifier)
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }

    async fn take_verification_token(
        &self,
        identifier: &str,
        token:      &str,
    ) -> AppResult<Option<VerificationToken>> {
        let row = sqlx::query_as::<_, VerificationToken>(
            "SELECT identifier, token, expires FROM verification_tokens
             WHERE identifier = ? AND token = ? LIMIT 1",
        )
        .bind(identifier)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Whoever deletes the row owns it; a racing caller sees 0 rows affected.
        let deleted = sqlx::query("DELETE FROM verification_tokens WHERE identifier = ? AND token = ?")
            .bind(identifier)
            .bind(token)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected());

        Ok(claim_deleted_token(row, deleted))
    }
}

/// Hand the row to the caller only if its own DELETE removed it. Losing the
/// race or a failing delete both read as "already consumed".
fn claim_deleted_token(
    row:     VerificationToken,
    deleted: Result<u64, sqlx::Error>,
) -> Option<VerificationToken> {
    match deleted {
        Ok(1) => Some(row),
        Ok(_) => {
            tracing::debug!(identifier = %row.identifier, "Verification token already consumed by a concurrent request");
            None
        }
        Err(e) => {
            tracing::warn!(identifier = %row.identifier, error = %e, "Verification token delete failed; treating as consumed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row() -> VerificationToken {
        VerificationToken {
            identifier: "a@x.com".into(),
            token:      "ab".repeat(32),
            expires:    Utc::now().naive_utc(),
        }
    }

    #[test]
    fn only_the_deleting_caller_gets_the_token() {
        let token = row();
        assert_eq!(claim_deleted_token(token.clone(), Ok(1)), Some(token));
    }

    #[test]
    fn lost_race_is_not_a_redemption() {
        assert!(claim_deleted_token(row(), Ok(0)).is_none());
    }

    #[test]
    fn failed_delete_is_not_an_error() {
        assert!(claim_deleted_token(row(), Err(sqlx::Error::PoolTimedOut)).is_none());
    }
}
