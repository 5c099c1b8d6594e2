//! Shared fixtures for unit and router tests: an in-memory store, a mailer
//! that records instead of sending, and helpers to mint session cookies.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    auth::{
        email::{Mailer, OutgoingEmail},
        session::{SessionKeys, SESSION_COOKIE},
    },
    config::Config,
    errors::{AppError, AppResult},
    models::{Investor, User},
    state::AppState,
    store::MemoryStore,
};

pub const FOUNDER: &str = "founder@room.test";

pub fn test_config() -> Config {
    Config {
        db_host:              "localhost".into(),
        db_port:              3306,
        db_name:              "investor_room_test".into(),
        db_user:              "test".into(),
        db_password:          "test".into(),
        backend_host:         "127.0.0.1".into(),
        backend_port:         0,
        session_secret:       "test-secret-key-for-testing".into(),
        resend_api_key:       None,
        smtp_host:            String::new(),
        smtp_port:            587,
        smtp_user:            String::new(),
        smtp_password:        String::new(),
        email_from:           "onboarding@resend.dev".into(),
        founder_emails:       vec![FOUNDER.into()],
        google_client_id:     None,
        google_client_secret: None,
        google_refresh_token: None,
        google_calendar_id:   "primary".into(),
        google_meet_link:     None,
        app_env:              "test".into(),
        app_base_url:         "https://room.test".into(),
    }
}

/// Keeps every message it is asked to send. `fail_next` makes the next send
/// fail the way a provider outage would.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn last(&self) -> Option<OutgoingEmail> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(AppError::Delivery("provider unavailable".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestContext {
    pub state:  AppState,
    pub store:  Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    /// `Cookie` header value carrying a fresh session for `email`.
    pub fn session_cookie(&self, email: &str) -> String {
        let user = User {
            id:             format!("user-{email}"),
            email:          email.into(),
            email_verified: None,
            created_at:     Utc::now().naive_utc(),
        };
        let credential = self.state.keys.mint(&user).unwrap();
        format!("{SESSION_COOKIE}={}", credential.token)
    }

    /// Seed an investor row in a given profile/approval state.
    pub fn seed_investor(&self, email: &str, profile_complete: bool, approved: bool) -> Investor {
        let now = Utc::now().naive_utc();
        let mut investor = Investor::new(format!("inv-{email}"), email.into(), now);
        if profile_complete {
            investor.name = Some("Ana Inversora".into());
            investor.profile_complete = true;
        }
        if approved {
            investor.approved = true;
            investor.approved_at = Some(now);
            investor.approved_by = Some(FOUNDER.into());
        }
        self.store.put_investor(investor.clone());
        investor
    }
}

fn build(config: Config, with_mailer: bool) -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState {
        store:    store.clone(),
        keys:     SessionKeys::new(&config.session_secret),
        mailer:   with_mailer.then(|| mailer.clone() as Arc<dyn Mailer>),
        calendar: None,
        config,
    };
    TestContext { state, store, mailer }
}

pub fn test_state() -> TestContext {
    build(test_config(), true)
}

pub fn test_state_without_mailer() -> TestContext {
    build(test_config(), false)
}
