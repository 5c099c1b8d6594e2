//! Session credentials and session enrichment.
//!
//! The credential is an HS256 JWT carried in the `session` cookie. It names the
//! user and nothing else: approval and profile state are looked up again by
//! [`build_session`] every time a session is read, so an approval granted
//! mid-session shows up on the investor's next request.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tower_cookies::{
    cookie::{time::Duration as CookieDuration, SameSite},
    Cookie, Cookies,
};

use crate::{
    errors::{AppError, AppResult},
    models::{InvestorSnapshot, User},
    store::IdentityStore,
};

pub const SESSION_COOKIE:  &str = "session";
pub const SESSION_MINUTES: i64  = 15;

/// JWT claims. `sub` is the stable user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub:   String,
    pub email: String,
    pub iat:   i64,
    pub exp:   i64,
}

/// A freshly minted credential: the encoded JWT plus its claims.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token:  String,
    pub claims: SessionClaims,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a credential for `user`, valid for [`SESSION_MINUTES`]. No refresh.
    pub fn mint(&self, user: &User) -> AppResult<Credential> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub:   user.id.clone(),
            email: user.email.clone(),
            iat:   now.timestamp(),
            exp:   (now + Duration::minutes(SESSION_MINUTES)).timestamp(),
        };
        let token = self.encode(&claims)?;
        Ok(Credential { token, claims })
    }

    pub fn encode(&self, claims: &SessionClaims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode session token: {e}")))
    }

    /// Decode and validate a JWT. Bad signature, malformed or expired all
    /// collapse to `None`.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                None
            }
        }
    }
}

// ── Cookie helpers ────────────────────────────────────────────

/// Read and verify the session cookie.
pub fn read_claims(cookies: &Cookies, keys: &SessionKeys) -> Option<SessionClaims> {
    let token = cookies.get(SESSION_COOKIE)?;
    keys.verify(token.value())
}

pub fn set_session_cookie(cookies: &Cookies, credential: &Credential, secure: bool) {
    let cookie = Cookie::build((SESSION_COOKIE, credential.token.clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(CookieDuration::minutes(SESSION_MINUTES))
        .build();
    cookies.add(cookie);
}

pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(CookieDuration::ZERO)
        .build();
    cookies.add(cookie);
}

// ── Session enrichment ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionUser {
    pub id:    String,
    pub email: String,
}

/// Request-scoped session. Never stored; rebuilt on every read.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    pub user:     SessionUser,
    /// `None` means the email has no investor row yet (not onboarded).
    pub investor: Option<InvestorSnapshot>,
    pub expires:  i64,
}

/// Attach the live investor state to a verified credential.
pub async fn build_session(store: &dyn IdentityStore, claims: &SessionClaims) -> AppResult<Session> {
    let investor = store.find_investor(&claims.email).await?;
    Ok(Session {
        user: SessionUser {
            id:    claims.sub.clone(),
            email: claims.email.clone(),
        },
        investor: investor.as_ref().map(InvestorSnapshot::from),
        expires:  claims.exp,
    })
}
