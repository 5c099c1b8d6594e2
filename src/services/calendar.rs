//! Google Calendar booking: refresh an OAuth access token, then create an
//! event with a Meet conference attached.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

const TOKEN_ENDPOINT:    &str = "https://oauth2.googleapis.com/token";
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_MEET_LINK: &str = "https://meet.google.com";

#[derive(Debug, Clone)]
pub struct MeetingRequest {
    pub summary:        String,
    pub description:    String,
    pub start:          DateTime<Utc>,
    pub end:            DateTime<Utc>,
    pub attendee_email: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub meeting_link:        String,
    pub calendar_event_link: String,
    pub event_id:            String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    id:              Option<String>,
    html_link:       Option<String>,
    conference_data: Option<ConferenceData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Deserialize)]
struct EntryPoint {
    uri: Option<String>,
}

#[derive(Clone)]
pub struct GoogleCalendar {
    client:        reqwest::Client,
    client_id:     String,
    client_secret: String,
    refresh_token: String,
    calendar_id:   String,
}

impl GoogleCalendar {
    /// `None` unless client id, secret and refresh token are all configured.
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.google_refresh_token.clone(),
        ) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(12))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            client_id,
            client_secret,
            refresh_token,
            calendar_id: config.google_calendar_id.clone(),
        }))
    }

    async fn access_token(&self) -> AppResult<String> {
        // Refresh tokens issued by the OAuth Playground start with "1//".
        if !self.refresh_token.starts_with("1//") {
            return Err(AppError::Configuration(
                "Invalid GOOGLE_REFRESH_TOKEN format (expected it to start with \"1//\")".into(),
            ));
        }

        let resp = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "Failed to get access token: {status} {detail}"
            )));
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to parse token response: {e}")))?
            .access_token
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("No access token in response")))
    }

    pub async fn create_meeting(&self, req: &MeetingRequest) -> AppResult<Meeting> {
        let access_token = self.access_token().await?;

        let event = json!({
            "summary": req.summary,
            "description": req.description,
            "start": { "dateTime": req.start.to_rfc3339(), "timeZone": "UTC" },
            "end":   { "dateTime": req.end.to_rfc3339(),   "timeZone": "UTC" },
            "conferenceData": {
                "createRequest": {
                    "requestId": format!("meet-{}", Uuid::new_v4().simple()),
                    "conferenceSolutionKey": { "type": "hangoutsMeet" }
                }
            },
            "attendees": [{ "email": req.attendee_email }],
        });

        let url = format!(
            "{CALENDAR_API_BASE}/calendars/{}/events?conferenceDataVersion=1",
            urlencoding::encode(&self.calendar_id)
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&event)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Calendar request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "Failed to create calendar event: {status} {detail}"
            )));
        }

        let data = resp
            .json::<EventResponse>()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to parse calendar event: {e}")))?;

        let meeting_link = data
            .conference_data
            .and_then(|c| c.entry_points.into_iter().find_map(|e| e.uri))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("No Google Meet link in response")))?;

        Ok(Meeting {
            meeting_link,
            calendar_event_link: data.html_link.unwrap_or_default(),
            event_id:            data.id.unwrap_or_default(),
        })
    }
}

/// Static Meet link used when the calendar integration is off or failing.
pub fn fallback_meet_link(config: &Config) -> String {
    config
        .google_meet_link
        .clone()
        .unwrap_or_else(|| DEFAULT_MEET_LINK.to_owned())
}
