//! In-memory [`IdentityStore`] for tests. Mirrors the MySQL semantics
//! (upsert-by-email, first approval stamps kept, delete-if-exists tokens).

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    errors::AppResult,
    models::{Approval, Investor, ProfileUpdate, User, VerificationToken},
};

use super::IdentityStore;

#[derive(Default)]
struct Inner {
    investors: HashMap<String, Investor>,
    users:     HashMap<String, User>,
    tokens:    HashMap<(String, String), VerificationToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_count(&self) -> usize {
        self.inner.lock().expect("memory store poisoned").tokens.len()
    }

    pub fn put_investor(&self, investor: Investor) {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .investors
            .insert(investor.email.clone(), investor);
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_investor(&self, email: &str) -> AppResult<Option<Investor>> {
        Ok(self.inner.lock().expect("memory store poisoned").investors.get(email).cloned())
    }

    async fn ensure_investor(&self, email: &str, now: NaiveDateTime) -> AppResult<Investor> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let investor = inner
            .investors
            .entry(email.to_owned())
            .or_insert_with(|| Investor::new(Uuid::new_v4().to_string(), email.to_owned(), now));
        Ok(investor.clone())
    }

    async fn update_profile(
        &self,
        email:   &str,
        user_id: &str,
        profile: &ProfileUpdate,
        now:     NaiveDateTime,
    ) -> AppResult<Investor> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let investor = inner
            .investors
            .entry(email.to_owned())
            .or_insert_with(|| Investor::new(Uuid::new_v4().to_string(), email.to_owned(), now));
        investor.name = Some(profile.name.clone());
        investor.phone = profile.phone.clone();
        investor.company = profile.company.clone();
        investor.profile_complete = true;
        if investor.user_id.is_none() {
            investor.user_id = Some(user_id.to_owned());
        }
        investor.updated_at = now;
        Ok(investor.clone())
    }

    async fn approve_investor(
        &self,
        email:       &str,
        approved_by: &str,
        now:         NaiveDateTime,
    ) -> AppResult<Option<Approval>> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let Some(investor) = inner.investors.get_mut(email) else {
            return Ok(None);
        };
        let already_approved = investor.approved;
        investor.approved = true;
        investor.approved_at.get_or_insert(now);
        investor.approved_by.get_or_insert_with(|| approved_by.to_owned());
        investor.updated_at = now;
        Ok(Some(Approval { investor: investor.clone(), already_approved }))
    }

    async fn mark_magic_link_sent(&self, email: &str, now: NaiveDateTime) -> AppResult<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        if let Some(investor) = inner.investors.get_mut(email) {
            investor.magic_link_sent = true;
            investor.magic_link_sent_at = Some(now);
            investor.updated_at = now;
        }
        Ok(())
    }

    async fn list_investors(&self, limit: u32) -> AppResult<Vec<Investor>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let mut rows: Vec<Investor> = inner.investors.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn find_or_create_user(&self, email: &str, now: NaiveDateTime) -> AppResult<User> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let user = inner.users.entry(email.to_owned()).or_insert_with(|| User {
            id:             Uuid::new_v4().to_string(),
            email:          email.to_owned(),
            email_verified: None,
            created_at:     now,
        });
        user.email_verified.get_or_insert(now);
        Ok(user.clone())
    }

    async fn insert_verification_token(&self, token: &VerificationToken) -> AppResult<()> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .tokens
            .insert((token.identifier.clone(), token.token.clone()), token.clone());
        Ok(())
    }

    async fn latest_token_expiry(&self, identifier: &str) -> AppResult<Option<NaiveDateTime>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .tokens
            .values()
            .filter(|t| t.identifier == identifier)
            .map(|t| t.expires)
            .max())
    }

    async fn purge_expired_tokens(&self, identifier: &str, now: NaiveDateTime) -> AppResult<u64> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| t.identifier != identifier || t.expires > now);
        Ok((before - inner.tokens.len()) as u64)
    }

    async fn take_verification_token(
        &self,
        identifier: &str,
        token:      &str,
    ) -> AppResult<Option<VerificationToken>> {
        Ok(self
            .inner
            .lock()
            .expect("memory store poisoned")
            .tokens
            .remove(&(identifier.to_owned(), token.to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    #[tokio::test]
    async fn ensure_investor_creates_once() {
        let store = MemoryStore::new();
        let first = store.ensure_investor("a@x.com", now()).await.unwrap();
        let second = store.ensure_investor("a@x.com", now()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!second.profile_complete);
        assert!(!second.approved);
    }

    #[tokio::test]
    async fn approval_stamps_survive_reapproval() {
        let store = MemoryStore::new();
        store.ensure_investor("a@x.com", now()).await.unwrap();

        let t1 = now();
        let first = store.approve_investor("a@x.com", "founder@x.com", t1).await.unwrap().unwrap();
        assert!(!first.already_approved);
        assert_eq!(first.investor.approved_at, Some(t1));

        let t2 = t1 + Duration::minutes(5);
        let second = store.approve_investor("a@x.com", "other@x.com", t2).await.unwrap().unwrap();
        assert!(second.already_approved);
        assert_eq!(second.investor.approved_at, Some(t1));
        assert_eq!(second.investor.approved_by.as_deref(), Some("founder@x.com"));
    }

    #[tokio::test]
    async fn approving_unknown_email_is_none() {
        let store = MemoryStore::new();
        assert!(store.approve_investor("nobody@x.com", "f@x.com", now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_only_touches_expired_rows_of_identifier() {
        let store = MemoryStore::new();
        let t = now();
        for (identifier, token, offset) in [
            ("a@x.com", "old", -1),
            ("a@x.com", "fresh", 5),
            ("b@x.com", "old", -1),
        ] {
            store
                .insert_verification_token(&VerificationToken {
                    identifier: identifier.into(),
                    token:      token.into(),
                    expires:    t + Duration::minutes(offset),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.purge_expired_tokens("a@x.com", t).await.unwrap(), 1);
        assert_eq!(store.token_count(), 2);
    }
}
