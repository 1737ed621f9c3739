use serde::Serialize;
use worker::{Env, Headers, Method, Request, RequestInit};

use crate::error::{Error, Result};
use crate::mail::{EmailMessage, Mailer};
use crate::worker_wasm::env::env_string;

const SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody {
    sender: BrevoEmailAddress,
    to: Vec<BrevoEmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

/// Transactional email through the Brevo HTTP API.
pub struct BrevoMailer {
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl BrevoMailer {
    /// `None` unless both `BREVO_API_KEY` and `BREVO_SENDER_EMAIL` are set.
    pub fn from_env(env: &Env) -> Option<Self> {
        Some(Self {
            api_key: env_string(env, "BREVO_API_KEY")?,
            sender_email: env_string(env, "BREVO_SENDER_EMAIL")?,
            sender_name: env_string(env, "BREVO_SENDER_NAME"),
        })
    }

    fn request(&self, message: EmailMessage) -> worker::Result<Request> {
        let body = BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![BrevoEmailAddress {
                email: message.to_email,
                name: message.to_name,
            }],
            subject: message.subject,
            html_content: message.html,
            text_content: message.text,
        };
        let json = serde_json::to_string(&body)?;

        let headers = Headers::new();
        headers.set("api-key", &self.api_key)?;
        headers.set("Content-Type", "application/json")?;
        headers.set("Accept", "application/json")?;
        headers.set("User-Agent", "ContactDesk/0.1 (Cloudflare Worker)")?;

        let mut init = RequestInit::new();
        init.with_method(Method::Post);
        init.with_headers(headers);
        init.with_body(Some(json.into()));

        Request::new_with_init(SEND_URL, &init)
    }
}

fn mail_err(e: worker::Error) -> Error {
    Error::Mail(e.to_string())
}

#[async_trait::async_trait(?Send)]
impl Mailer for BrevoMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let to = message.to_email.clone();
        let req = self.request(message).map_err(mail_err)?;

        let mut resp = worker::Fetch::Request(req).send().await.map_err(mail_err)?;
        let status = resp.status_code();
        if (200..=299).contains(&status) {
            tracing::info!(to = %to, "email accepted by Brevo");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Mail(format!("Brevo send failed (status={status}): {body}")))
    }
}
