// src/services/notifier.rs

//! Notification delivery.
//!
//! Destinations are URLs whose scheme picks the transport:
//!
//! - `http://`, `https://`, `json://`, `jsons://`: JSON webhook
//!   (`{"title", "body", "type"}`); `json`/`jsons` map to `http`/`https`
//! - `mailgun://{user}@{domain}/{apikey}/{to}`: Mailgun messages API
//! - `sendgrid://{apikey}:{from}/{to}`: SendGrid v3 mail send

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::scheme_of;

const MAILGUN_API: &str = "https://api.mailgun.net/v3";
const MAILGUN_API_EU: &str = "https://api.eu.mailgun.net/v3";
const SENDGRID_API: &str = "https://api.sendgrid.com/v3/mail/send";

/// Delivers a title/body pair to a destination URL.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, url: &str, title: &str, body: &str) -> Result<()>;
}

/// A fully resolved outgoing request.
#[derive(Debug, Clone, PartialEq)]
enum Delivery {
    /// JSON POST without auth
    Webhook { endpoint: Url, payload: Value },
    /// Form POST with basic auth
    Form {
        endpoint: String,
        user: String,
        password: String,
        fields: Vec<(String, String)>,
    },
    /// JSON POST with a bearer token
    Bearer {
        endpoint: String,
        token: String,
        payload: Value,
    },
}

/// Notifier backed by HTTP APIs.
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Whether this notifier has a transport for the URL's scheme.
    pub fn supports(url: &str) -> bool {
        matches!(
            scheme_of(url).map(str::to_ascii_lowercase).as_deref(),
            Some("http" | "https" | "json" | "jsons" | "mailgun" | "sendgrid")
        )
    }

    fn prepare(url: &str, title: &str, body: &str) -> Result<Delivery> {
        let scheme = scheme_of(url)
            .ok_or_else(|| AppError::notification("none", format!("'{url}' has no scheme")))?
            .to_ascii_lowercase();
        let parsed = Url::parse(url.trim())
            .map_err(|e| AppError::notification(&scheme, format!("invalid URL: {e}")))?;

        match scheme.as_str() {
            "http" | "https" => Ok(Delivery::Webhook {
                endpoint: parsed,
                payload: webhook_payload(title, body),
            }),
            "json" | "jsons" => {
                let target = if scheme == "json" { "http" } else { "https" };
                let rewritten = format!("{}{}", target, &url.trim()[scheme.len()..]);
                let endpoint = Url::parse(&rewritten)
                    .map_err(|e| AppError::notification(&scheme, format!("invalid URL: {e}")))?;
                Ok(Delivery::Webhook {
                    endpoint,
                    payload: webhook_payload(title, body),
                })
            }
            "mailgun" => Self::prepare_mailgun(&parsed, title, body),
            "sendgrid" => Self::prepare_sendgrid(&parsed, title, body),
            _ => Err(AppError::notification(
                &scheme,
                "unsupported destination scheme",
            )),
        }
    }

    fn prepare_mailgun(url: &Url, title: &str, body: &str) -> Result<Delivery> {
        let invalid = |m: &str| AppError::notification("mailgun", m);
        let domain = url.host_str().ok_or_else(|| invalid("missing domain"))?;
        if url.username().is_empty() {
            return Err(invalid("missing sender user"));
        }
        let from = format!("{}@{}", url.username(), domain);

        let mut segments = path_segments(url);
        if segments.is_empty() {
            return Err(invalid("missing API key"));
        }
        let api_key = segments.remove(0);
        let recipients = if segments.is_empty() {
            vec![from.clone()]
        } else {
            segments
        };

        let base = match url.query_pairs().find(|(k, _)| k == "region") {
            Some((_, region)) if region.eq_ignore_ascii_case("eu") => MAILGUN_API_EU,
            _ => MAILGUN_API,
        };

        let mut fields = vec![("from".to_string(), from)];
        fields.extend(recipients.into_iter().map(|to| ("to".to_string(), to)));
        fields.push(("subject".to_string(), title.to_string()));
        fields.push(("html".to_string(), body.to_string()));

        Ok(Delivery::Form {
            endpoint: format!("{base}/{domain}/messages"),
            user: "api".to_string(),
            password: api_key,
            fields,
        })
    }

    fn prepare_sendgrid(url: &Url, title: &str, body: &str) -> Result<Delivery> {
        let invalid = |m: &str| AppError::notification("sendgrid", m);
        let api_key = url.username();
        let from_user = url.password().unwrap_or("");
        let from_host = url.host_str().unwrap_or("");
        if api_key.is_empty() || from_user.is_empty() || from_host.is_empty() {
            return Err(invalid("expected sendgrid://{apikey}:{from}/{to}"));
        }
        let from = format!("{from_user}@{from_host}");

        let recipients = path_segments(url);
        let recipients = if recipients.is_empty() {
            vec![from.clone()]
        } else {
            recipients
        };
        let to: Vec<Value> = recipients.iter().map(|r| json!({ "email": r })).collect();

        Ok(Delivery::Bearer {
            endpoint: SENDGRID_API.to_string(),
            token: api_key.to_string(),
            payload: json!({
                "personalizations": [{ "to": to }],
                "from": { "email": from },
                "subject": title,
                "content": [{ "type": "text/html", "value": body }],
            }),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, url: &str, title: &str, body: &str) -> Result<()> {
        let delivery = Self::prepare(url, title, body)?;
        let scheme = scheme_of(url).unwrap_or("none").to_ascii_lowercase();

        let request = match delivery {
            Delivery::Webhook { endpoint, payload } => self.client.post(endpoint).json(&payload),
            Delivery::Form {
                endpoint,
                user,
                password,
                fields,
            } => self
                .client
                .post(endpoint)
                .basic_auth(user, Some(password))
                .form(&fields),
            Delivery::Bearer {
                endpoint,
                token,
                payload,
            } => self.client.post(endpoint).bearer_auth(token).json(&payload),
        };

        log::debug!("Sending notification via {scheme}: {title}");
        let response = request
            .send()
            .await
            .map_err(|e| AppError::notification(&scheme, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::notification(
                &scheme,
                format!("destination returned {status}"),
            ));
        }
        Ok(())
    }
}

fn webhook_payload(title: &str, body: &str) -> Value {
    json!({ "title": title, "body": body, "type": "info" })
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
