//! Transactional email.
//!
//! Two providers sit behind [`Mailer`]: the Resend HTTP API (preferred, keyed
//! by `RESEND_API_KEY`) and plain SMTP via lettre. With neither configured,
//! [`mailer_from_config`] yields `None` and every send site fails with a
//! configuration error instead of silently dropping the message.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to:      String,
    pub subject: String,
    pub html:    String,
    pub text:    String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message. Provider failures surface as `AppError::Delivery`.
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()>;
}

/// Pick a provider from the environment: Resend, then SMTP, else none.
pub fn mailer_from_config(config: &Config) -> AppResult<Option<Arc<dyn Mailer>>> {
    if let Some(api_key) = &config.resend_api_key {
        tracing::info!("Email provider: Resend");
        return Ok(Some(Arc::new(ResendMailer::new(api_key.clone(), config.email_from.clone())?)));
    }
    if !config.smtp_host.is_empty() {
        tracing::info!(host = %config.smtp_host, "Email provider: SMTP");
        return Ok(Some(Arc::new(SmtpMailer::new(config)?)));
    }
    tracing::warn!("No email provider configured; sign-in and admin emails will fail");
    Ok(None)
}

// ── Resend ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ResendBody<'a> {
    from:    &'a str,
    to:      [&'a str; 1],
    subject: &'a str,
    html:    &'a str,
    text:    &'a str,
}

pub struct ResendMailer {
    client:  reqwest::Client,
    api_key: String,
    from:    String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, api_key, from })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        let body = ResendBody {
            from:    &self.from,
            to:      [&email.to],
            subject: &email.subject,
            html:    &email.html,
            text:    &email.text,
        };

        let resp = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("Resend request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = resp.text().await.unwrap_or_default();
        Err(AppError::Delivery(format!("Resend returned {status}: {detail}")))
    }
}

// ── SMTP ──────────────────────────────────────────────────────

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> AppResult<Self> {
        let from: Mailbox = config
            .email_from
            .parse()
            .map_err(|_| AppError::Configuration("Invalid EMAIL_FROM address".into()))?;

        let creds = Credentials::new(config.smtp_user.clone(), config.smtp_password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AppError::Configuration(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse().map_err(|_| AppError::BadRequest("Invalid email address".into()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Delivery(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}

// ── Templates ─────────────────────────────────────────────────

pub fn sign_in_email(to: &str, link: &str, expires_minutes: i64) -> OutgoingEmail {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #0A2240;">Investor Room</h1>
    <h2 style="color: #0A2240;">Sign in to your account</h2>
    <p>Click the button below to sign in to the Investor Room. This link will expire in {expires_minutes} minutes.</p>
    <p style="text-align: center; margin: 30px 0;">
      <a href="{link}" style="background: #0A2240; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; font-weight: 600;">Sign In</a>
    </p>
    <p style="font-size: 14px; color: #666;">If you didn't request this email, you can safely ignore it.</p>
  </body>
</html>"#
    );
    let text = format!(
        "Sign in to the Investor Room:\n\n{link}\n\nThis link expires in {expires_minutes} minutes. If you didn't request this email, you can safely ignore it."
    );
    OutgoingEmail {
        to: to.to_owned(),
        subject: "Sign in to Investor Room".into(),
        html,
        text,
    }
}

/// Access email sent on approval and on "resend invitation". `resend` switches
/// to the re-delivery wording used for investors who are already approved.
pub fn access_email(to: &str, base_url: &str, resend: bool) -> OutgoingEmail {
    let access_url = format!("{base_url}/otp?callbackUrl=/room");
    let (subject, title, message) = if resend {
        (
            "Reenvío: Acceso a Sala de inversores",
            "Reenvío de acceso",
            "Se te ha reenviado el enlace de acceso a la Sala de inversores. Haz clic en el botón de abajo para iniciar sesión.",
        )
    } else {
        (
            "Acceso a Sala de inversores",
            "Has sido aprobado",
            "Felicidades, has sido aprobado para acceder a la Sala de inversores. Haz clic en el botón de abajo para iniciar sesión y acceder al data room.",
        )
    };

    let html = format!(
        r#"<div style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; max-width:600px; margin:24px auto; padding:20px; background:#fff; border-radius:8px;">
  <div style="text-align:center; margin-bottom:16px;">
    <img src="{base_url}/assets/svg/logo.svg" alt="Investor Room" style="height:40px;" />
  </div>
  <h2 style="color:#0A2240">{title}</h2>
  <p>{message}</p>
  <div style="text-align:center; margin:20px 0;">
    <a href="{access_url}" style="background:#0A2240;color:#fff;padding:12px 20px;border-radius:8px;text-decoration:none;font-weight:600;">Acceder a la Sala de inversores</a>
  </div>
  <p style="color:#6b7280;font-size:13px;">Si no solicitaste este acceso, ignora este correo.</p>
</div>"#
    );
    let text = format!("{title}\n\n{message}\n\n{access_url}\n\nSi no solicitaste este acceso, ignora este correo.");

    OutgoingEmail {
        to: to.to_owned(),
        subject: subject.into(),
        html,
        text,
    }
}
