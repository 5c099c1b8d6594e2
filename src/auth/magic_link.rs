//! Magic-link issuance and redemption.
//!
//! Issuing stores the salted hash of a fresh token with a 10-minute expiry and
//! mails the raw token inside the callback URL. Redemption deletes the row
//! before minting, so a link works at most once; every failure mode (unknown,
//! reused, expired, lost race) comes back as `None`.

use chrono::{Duration, NaiveDateTime, Utc};

use crate::{
    auth::{
        email::sign_in_email,
        generate_token, hash_token, normalize_email,
        session::Credential,
    },
    errors::{AppError, AppResult},
    models::VerificationToken,
    state::AppState,
};

pub const TOKEN_MINUTES:        i64 = 10;
pub const RESEND_COOLDOWN_SECS: i64 = 60;

/// Send a sign-in link to `email`. `callback_url` rides along in the link and
/// is handed back to the OTP landing after redemption.
pub async fn issue_link(state: &AppState, email: &str, callback_url: Option<&str>) -> AppResult<()> {
    let email = normalize_email(email)?;
    let mailer = state.mailer()?;
    let now = Utc::now().naive_utc();

    if let Some(expires) = state.store.latest_token_expiry(&email).await? {
        if let Some(wait) = cooldown_remaining(expires, now) {
            return Err(AppError::TooManyRequests(wait));
        }
    }

    let purged = state.store.purge_expired_tokens(&email, now).await?;
    if purged > 0 {
        tracing::debug!(email = %email, purged, "Purged expired verification tokens");
    }

    let raw = generate_token();
    state
        .store
        .insert_verification_token(&VerificationToken {
            identifier: email.clone(),
            token:      hash_token(&raw, &state.config.session_secret),
            expires:    now + Duration::minutes(TOKEN_MINUTES),
        })
        .await?;

    let link = callback_link(&state.config.app_base_url, &email, &raw, callback_url);
    mailer.send(&sign_in_email(&email, &link, TOKEN_MINUTES)).await?;

    tracing::info!(email = %email, "Magic link sent");
    Ok(())
}

/// Consume `(identifier, token)` and mint a session credential for it.
pub async fn redeem(state: &AppState, identifier: &str, token: &str) -> AppResult<Option<Credential>> {
    let identifier = identifier.trim().to_lowercase();
    let hashed = hash_token(token, &state.config.session_secret);

    let Some(row) = state.store.take_verification_token(&identifier, &hashed).await? else {
        tracing::info!(email = %identifier, "Magic link rejected: unknown or already used");
        return Ok(None);
    };

    let now = Utc::now().naive_utc();
    if row.expires <= now {
        tracing::info!(email = %identifier, "Magic link rejected: expired");
        return Ok(None);
    }

    let user = state.store.find_or_create_user(&identifier, now).await?;
    let credential = state.keys.mint(&user)?;
    tracing::info!(email = %identifier, user_id = %user.id, "Magic link redeemed");
    Ok(Some(credential))
}

/// Seconds left before another link may be sent, if the newest token is
/// younger than the cooldown. Token age is derived from its expiry.
fn cooldown_remaining(latest_expiry: NaiveDateTime, now: NaiveDateTime) -> Option<u64> {
    let issued_at = latest_expiry - Duration::minutes(TOKEN_MINUTES);
    let age = (now - issued_at).num_seconds();
    if (0..RESEND_COOLDOWN_SECS).contains(&age) {
        Some((RESEND_COOLDOWN_SECS - age) as u64)
    } else {
        None
    }
}

fn callback_link(base_url: &str, email: &str, raw_token: &str, callback_url: Option<&str>) -> String {
    let mut link = format!(
        "{base_url}/api/auth/callback/email?identifier={}&token={}",
        urlencoding::encode(email),
        urlencoding::encode(raw_token),
    );
    if let Some(cb) = callback_url.filter(|c| !c.is_empty()) {
        link.push_str("&callbackUrl=");
        link.push_str(&urlencoding::encode(cb));
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::IdentityStore,
        test_support::{test_state, test_state_without_mailer, TestContext},
    };

    /// Issue a link and pull the raw token back out of the recorded email.
    async fn issue_and_capture(ctx: &TestContext, email: &str) -> String {
        issue_link(&ctx.state, email, None).await.unwrap();
        let sent = ctx.mailer.last().expect("an email was sent");
        let (_, rest) = sent.text.split_once("token=").expect("link carries a token");
        rest.split(|c: char| c == '&' || c.is_whitespace()).next().unwrap().to_owned()
    }

    #[tokio::test]
    async fn link_redeems_exactly_once() {
        let ctx = test_state();
        let token = issue_and_capture(&ctx, "a@x.com").await;
        assert_eq!(ctx.store.token_count(), 1);

        let first = redeem(&ctx.state, "a@x.com", &token).await.unwrap();
        assert_eq!(first.unwrap().claims.email, "a@x.com");
        assert_eq!(ctx.store.token_count(), 0);

        let second = redeem(&ctx.state, "a@x.com", &token).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn token_row_expires_after_ten_minutes() {
        let ctx = test_state();
        let before = Utc::now().naive_utc();
        issue_and_capture(&ctx, "a@x.com").await;

        let expires = ctx.store.latest_token_expiry("a@x.com").await.unwrap().unwrap();
        let minutes = (expires - before).num_seconds();
        assert!((TOKEN_MINUTES * 60 - 5..=TOKEN_MINUTES * 60 + 5).contains(&minutes));
    }

    #[tokio::test]
    async fn expired_token_fails_on_first_attempt_and_is_deleted() {
        let ctx = test_state();
        let raw = generate_token();
        ctx.store
            .insert_verification_token(&VerificationToken {
                identifier: "a@x.com".into(),
                token:      hash_token(&raw, &ctx.state.config.session_secret),
                expires:    Utc::now().naive_utc() - Duration::seconds(1),
            })
            .await
            .unwrap();

        assert!(redeem(&ctx.state, "a@x.com", &raw).await.unwrap().is_none());
        assert_eq!(ctx.store.token_count(), 0);
    }

    #[tokio::test]
    async fn token_is_bound_to_its_identifier() {
        let ctx = test_state();
        let token = issue_and_capture(&ctx, "a@x.com").await;
        assert!(redeem(&ctx.state, "b@x.com", &token).await.unwrap().is_none());
        assert!(redeem(&ctx.state, "A@X.COM", &token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_redemptions_yield_one_credential() {
        let ctx = test_state();
        let token = issue_and_capture(&ctx, "a@x.com").await;

        let (a, b) = tokio::join!(
            redeem(&ctx.state, "a@x.com", &token),
            redeem(&ctx.state, "a@x.com", &token),
        );
        let successes = [a.unwrap(), b.unwrap()].iter().filter(|c| c.is_some()).count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn raw_token_is_not_stored() {
        let ctx = test_state();
        let token = issue_and_capture(&ctx, "a@x.com").await;
        assert!(ctx.store.take_verification_token("a@x.com", &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resend_within_cooldown_is_rejected() {
        let ctx = test_state();
        issue_link(&ctx.state, "a@x.com", None).await.unwrap();
        let err = issue_link(&ctx.state, "a@x.com", None).await.unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(s) if s > 0 && s <= 60));
        assert_eq!(ctx.mailer.count(), 1);
    }

    #[tokio::test]
    async fn missing_provider_is_a_configuration_error() {
        let ctx = test_state_without_mailer();
        let err = issue_link(&ctx.state, "a@x.com", None).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(ctx.store.token_count(), 0);
    }

    #[tokio::test]
    async fn delivery_failure_propagates() {
        let ctx = test_state();
        ctx.mailer.fail_next();
        let err = issue_link(&ctx.state, "a@x.com", None).await.unwrap_err();
        assert!(matches!(err, AppError::Delivery(_)));
    }

    #[test]
    fn cooldown_is_derived_from_expiry() {
        let now = Utc::now().naive_utc();
        let fresh = now + Duration::minutes(TOKEN_MINUTES) - Duration::seconds(20);
        assert_eq!(cooldown_remaining(fresh, now), Some(40));

        let older = now + Duration::minutes(TOKEN_MINUTES) - Duration::seconds(61);
        assert_eq!(cooldown_remaining(older, now), None);
    }

    #[test]
    fn callback_link_encodes_parts() {
        let link = callback_link("https://room.test", "a+b@x.com", "tok", Some("/room/files?id=1"));
        assert_eq!(
            link,
            "https://room.test/api/auth/callback/email?identifier=a%2Bb%40x.com&token=tok&callbackUrl=%2Froom%2Ffiles%3Fid%3D1"
        );
    }
}
