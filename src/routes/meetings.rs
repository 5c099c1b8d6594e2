//! `/meetings`: book a founder call.
//!
//! With Google Calendar credentials a 30-minute event with a Meet conference
//! is created; without them the static Meet link is returned instead.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::normalize_email,
    errors::{AppError, AppResult},
    services::calendar::{fallback_meet_link, MeetingRequest},
    state::AppState,
};

const MEETING_MINUTES: i64 = 30;
const DEFAULT_HOUR: u32 = 14;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookRequest {
    email:          Option<String>,
    name:           Option<String>,
    preferred_date: Option<String>,
    preferred_time: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/meetings/book", post(book))
}

/// POST /meetings/book
async fn book(
    State(state): State<AppState>,
    Json(body): Json<BookRequest>,
) -> AppResult<Response> {
    let email = normalize_email(body.email.as_deref().unwrap_or_default())?;
    let now = Utc::now();
    let start = meeting_start(body.preferred_date.as_deref(), body.preferred_time.as_deref(), now)?;

    let Some(calendar) = &state.calendar else {
        return Ok(Json(json!({
            "meetingLink": fallback_meet_link(&state.config),
            "message": "Using direct Meet link. Configure Google Calendar API for automatic scheduling.",
        }))
        .into_response());
    };

    let who = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(email.as_str())
        .to_owned();
    let request = MeetingRequest {
        summary:        format!("Founder Call: {who}"),
        description:    format!("Founder call with {who} ({email})"),
        start,
        end:            start + Duration::minutes(MEETING_MINUTES),
        attendee_email: email.clone(),
    };

    match calendar.create_meeting(&request).await {
        Ok(meeting) => {
            tracing::info!(email = %email, event_id = %meeting.event_id, "Meeting booked");
            Ok(Json(meeting).into_response())
        }
        Err(e) => {
            tracing::error!(email = %email, error = %e, "Failed to create meeting");
            let body = json!({
                "error":       "Failed to create meeting",
                "message":     e.to_string(),
                "meetingLink": fallback_meet_link(&state.config),
            });
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}

/// Start time in UTC: the preferred date and time when both are given
/// (time defaults to 14:00 if unparseable), otherwise one hour from `now`.
fn meeting_start(
    date: Option<&str>,
    time: Option<&str>,
    now:  DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    let (Some(date), Some(time)) = (date.filter(|d| !d.is_empty()), time.filter(|t| !t.is_empty())) else {
        return Ok(now + Duration::hours(1));
    };

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid preferred date".into()))?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .ok()
        .or_else(|| NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0))
        .ok_or_else(|| AppError::BadRequest("Invalid preferred time".into()))?;

    let start = date.and_time(time).and_utc();
    if start < now {
        return Err(AppError::BadRequest(
            "Preferred date and time must be in the future".into(),
        ));
    }
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn start_defaults_to_an_hour_from_now() {
        let now = at("2026-03-01T10:00:00Z");
        assert_eq!(meeting_start(None, None, now).unwrap(), at("2026-03-01T11:00:00Z"));
        assert_eq!(meeting_start(Some("2026-03-05"), None, now).unwrap(), at("2026-03-01T11:00:00Z"));
    }

    #[test]
    fn preferred_slot_is_used_in_utc() {
        let now = at("2026-03-01T10:00:00Z");
        let start = meeting_start(Some("2026-03-05"), Some("09:30"), now).unwrap();
        assert_eq!(start, at("2026-03-05T09:30:00Z"));

        let fallback_hour = meeting_start(Some("2026-03-05"), Some("soon"), now).unwrap();
        assert_eq!(fallback_hour, at("2026-03-05T14:00:00Z"));
    }

    #[test]
    fn past_slot_is_rejected() {
        let now = at("2026-03-01T10:00:00Z");
        let err = meeting_start(Some("2026-02-28"), Some("14:00"), now).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("future")));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let now = at("2026-03-01T10:00:00Z");
        assert!(meeting_start(Some("05/03/2026"), Some("14:00"), now).is_err());
    }
}
