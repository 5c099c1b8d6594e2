use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Investors ────────────────────────────────────────────────

/// Source of truth for profile and approval state. Rows are keyed by the
/// lower-cased email and materialise on first write.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id:                 String,
    pub email:              String,
    pub user_id:            Option<String>,
    pub name:               Option<String>,
    pub phone:              Option<String>,
    pub company:            Option<String>,
    pub profile_complete:   bool,
    pub approved:           bool,
    pub approved_at:        Option<NaiveDateTime>,
    pub approved_by:        Option<String>,
    pub magic_link_sent:    bool,
    pub magic_link_sent_at: Option<NaiveDateTime>,
    pub created_at:         NaiveDateTime,
    pub updated_at:         NaiveDateTime,
}

impl Investor {
    /// A blank row as created by the implicit upsert.
    pub fn new(id: String, email: String, now: NaiveDateTime) -> Self {
        Self {
            id,
            email,
            user_id:            None,
            name:               None,
            phone:              None,
            company:            None,
            profile_complete:   false,
            approved:           false,
            approved_at:        None,
            approved_by:        None,
            magic_link_sent:    false,
            magic_link_sent_at: None,
            created_at:         now,
            updated_at:         now,
        }
    }
}

/// The slice of an investor that travels with a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvestorSnapshot {
    pub id:               String,
    pub email:            String,
    pub name:             Option<String>,
    pub phone:            Option<String>,
    pub company:          Option<String>,
    pub profile_complete: bool,
    pub approved:         bool,
}

impl From<&Investor> for InvestorSnapshot {
    fn from(i: &Investor) -> Self {
        Self {
            id:               i.id.clone(),
            email:            i.email.clone(),
            name:             i.name.clone(),
            phone:            i.phone.clone(),
            company:          i.company.clone(),
            profile_complete: i.profile_complete,
            approved:         i.approved,
        }
    }
}

/// Profile fields accepted by the update endpoint, already trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub name:    String,
    pub phone:   Option<String>,
    pub company: Option<String>,
}

/// Result of an approve action. `already_approved` means the original
/// approval stamps were left untouched.
#[derive(Debug, Clone)]
pub struct Approval {
    pub investor:         Investor,
    pub already_approved: bool,
}

// ── Users ────────────────────────────────────────────────────

/// Authentication identity. Its id is the JWT subject.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct User {
    pub id:             String,
    pub email:          String,
    pub email_verified: Option<NaiveDateTime>,
    pub created_at:     NaiveDateTime,
}

// ── Verification tokens ──────────────────────────────────────

/// `token` holds the salted hash; the raw value only ever lives in the email.
#[derive(Debug, Clone, sqlx::FromRow, PartialEq)]
pub struct VerificationToken {
    pub identifier: String,
    pub token:      String,
    pub expires:    NaiveDateTime,
}
