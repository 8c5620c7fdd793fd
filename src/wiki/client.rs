//! wiki::client
//!
//! MediaWiki Action API implementation of the `Wiki` trait.
//!
//! # Design
//!
//! One `ApiClient` per wiki (the local wiki, and optionally the shared
//! identity origin). The client keeps a cookie session; `login` must be
//! called before any write. All requests go through the Action API with
//! `format=json&formatversion=2`.
//!
//! # Error mapping
//!
//! MediaWiki reports failures as an `error` object with a string code.
//! Codes are mapped onto the [`WikiError`] taxonomy:
//! `ratelimited`/`maxlag` become `RateLimited`, `editconflict` becomes
//! `EditConflict`, token and login codes become auth errors, and anything
//! else is surfaced as `ApiError`.
//!
//! # Rate Limiting
//!
//! The client returns `WikiError::RateLimited` when the API asks for
//! backoff; it does not retry automatically (caller's responsibility).

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::traits::{PageText, Wiki, WikiError};
use crate::core::event::{LogKind, RawLogEvent, Window};
use crate::core::types::{Group, Username};

/// Default User-Agent header value for API requests.
const DEFAULT_USER_AGENT: &str = concat!("masslist/", env!("CARGO_PKG_VERSION"));

/// Maximum users per `list=users` request.
const USERS_BATCH: usize = 50;

/// MediaWiki Action API client.
pub struct ApiClient {
    /// HTTP client holding the session cookies.
    client: Client,
    /// Full api.php URL, e.g. `https://en.wikipedia.org/w/api.php`.
    api_url: String,
    /// Short wiki name used in messages.
    site_name: String,
}

// Custom Debug: the cookie jar carries the session.
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.api_url)
            .field("site_name", &self.site_name)
            .finish()
    }
}

impl ApiClient {
    /// Create a client for one wiki.
    ///
    /// # Errors
    ///
    /// Returns `WikiError::NetworkError` if the HTTP client cannot be
    /// constructed.
    pub fn new(
        api_url: impl Into<String>,
        site_name: impl Into<String>,
        user_agent: Option<&str>,
    ) -> Result<Self, WikiError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .map_err(|e| WikiError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            site_name: site_name.into(),
        })
    }

    /// Log in with a bot password.
    ///
    /// # Errors
    ///
    /// Returns `WikiError::AuthFailed` when the API rejects the
    /// credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), WikiError> {
        let token = self.fetch_token("login").await?;
        let response = self
            .post(&[
                ("action", "login"),
                ("lgname", username),
                ("lgpassword", password),
                ("lgtoken", &token),
            ])
            .await?;
        let result = response
            .pointer("/login/result")
            .and_then(Value::as_str)
            .ok_or_else(|| WikiError::InvalidResponse("login result missing".into()))?;
        if result != "Success" {
            let reason = response
                .pointer("/login/reason")
                .and_then(Value::as_str)
                .unwrap_or(result);
            return Err(WikiError::AuthFailed(reason.to_string()));
        }
        Ok(())
    }

    /// Fetch a token of the given type (`login` or `csrf`).
    async fn fetch_token(&self, kind: &str) -> Result<String, WikiError> {
        let response = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", kind)])
            .await?;
        let pointer = format!("/query/tokens/{kind}token");
        let token = response
            .pointer(&pointer)
            .and_then(Value::as_str)
            .ok_or_else(|| WikiError::InvalidResponse(format!("{kind} token missing")))?;
        // The API hands anonymous sessions the placeholder token.
        if token == "+\\" && kind == "csrf" {
            return Err(WikiError::AuthRequired);
        }
        Ok(token.to_string())
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        let request = self
            .client
            .get(&self.api_url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params);
        let response = request
            .send()
            .await
            .map_err(|e| WikiError::NetworkError(e.to_string()))?;
        Self::parse_response(response).await
    }

    async fn post(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        let mut form: Vec<(&str, &str)> = vec![("format", "json"), ("formatversion", "2")];
        form.extend_from_slice(params);
        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| WikiError::NetworkError(e.to_string()))?;
        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value, WikiError> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(WikiError::RateLimited);
        }
        if !status.is_success() {
            return Err(WikiError::ApiError {
                code: status.as_u16().to_string(),
                message: "HTTP error".to_string(),
            });
        }
        let value: Value = response
            .json()
            .await
            .map_err(|e| WikiError::InvalidResponse(e.to_string()))?;
        if let Some(error) = value.get("error") {
            return Err(map_api_error(error));
        }
        Ok(value)
    }
}

/// Map a MediaWiki `error` object onto the error taxonomy.
fn map_api_error(error: &Value) -> WikiError {
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = error
        .get("info")
        .and_then(Value::as_str)
        .unwrap_or("no details")
        .to_string();
    match code.as_str() {
        "ratelimited" | "maxlag" => WikiError::RateLimited,
        "missingtitle" => WikiError::NotFound(message),
        "badtoken" | "notoken" => WikiError::AuthRequired,
        "notloggedin" | "permissiondenied" | "assertuserfailed" | "assertbotfailed" => {
            WikiError::AuthFailed(message)
        }
        _ => WikiError::ApiError { code, message },
    }
}

/// Format a timestamp the way the API expects.
fn api_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Deserialize)]
struct LogEventRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    params: LogEventParams,
}

#[derive(Debug, Default, Deserialize)]
struct LogEventParams {
    #[serde(default)]
    olduser: Option<String>,
    #[serde(default)]
    newuser: Option<String>,
    #[serde(default)]
    oldgroups: Option<Vec<String>>,
    #[serde(default)]
    newgroups: Option<Vec<String>>,
}

impl From<LogEventRecord> for RawLogEvent {
    fn from(record: LogEventRecord) -> Self {
        RawLogEvent {
            title: record.title,
            timestamp: record.timestamp,
            old_user: record.params.olduser,
            new_user: record.params.newuser,
            old_groups: record.params.oldgroups,
            new_groups: record.params.newgroups,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageRecord {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    revisions: Vec<RevisionRecord>,
}

#[derive(Debug, Deserialize)]
struct RevisionRecord {
    timestamp: DateTime<Utc>,
    slots: SlotsRecord,
}

#[derive(Debug, Deserialize)]
struct SlotsRecord {
    main: SlotRecord,
}

#[derive(Debug, Deserialize)]
struct SlotRecord {
    content: String,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    name: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    groups: Vec<String>,
}

#[async_trait]
impl Wiki for ApiClient {
    fn name(&self) -> &str {
        &self.site_name
    }

    async fn fetch_log_events(
        &self,
        kind: LogKind,
        window: &Window,
    ) -> Result<Vec<RawLogEvent>, WikiError> {
        let letype = kind.to_string();
        let start = api_timestamp(window.start());
        let end = api_timestamp(window.end());
        let mut events = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("action", "query"),
                ("list", "logevents"),
                ("letype", letype.as_str()),
                ("lestart", start.as_str()),
                ("leend", end.as_str()),
                ("ledir", "newer"),
                ("lelimit", "max"),
                ("leprop", "title|timestamp|details"),
            ];
            if let Some(token) = &continue_token {
                params.push(("lecontinue", token.as_str()));
            }
            let response = self.get(&params).await?;

            let records = response
                .pointer("/query/logevents")
                .cloned()
                .ok_or_else(|| WikiError::InvalidResponse("logevents missing".into()))?;
            let records: Vec<LogEventRecord> = serde_json::from_value(records)
                .map_err(|e| WikiError::InvalidResponse(e.to_string()))?;
            events.extend(records.into_iter().map(RawLogEvent::from));

            match response
                .pointer("/continue/lecontinue")
                .and_then(Value::as_str)
            {
                Some(token) => continue_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(events)
    }

    async fn fetch_page(&self, title: &str) -> Result<Option<PageText>, WikiError> {
        let response = self
            .get(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content|timestamp"),
                ("rvslots", "main"),
                ("titles", title),
            ])
            .await?;
        let pages = response
            .pointer("/query/pages")
            .cloned()
            .ok_or_else(|| WikiError::InvalidResponse("pages missing".into()))?;
        let mut pages: Vec<PageRecord> = serde_json::from_value(pages)
            .map_err(|e| WikiError::InvalidResponse(e.to_string()))?;
        let Some(page) = pages.pop() else {
            return Err(WikiError::InvalidResponse("empty pages list".into()));
        };
        if page.missing {
            return Ok(None);
        }
        let Some(revision) = page.revisions.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(PageText {
            text: revision.slots.main.content,
            base_timestamp: revision.timestamp,
        }))
    }

    async fn fetch_user_groups(
        &self,
        users: &[Username],
    ) -> Result<BTreeMap<Username, BTreeSet<Group>>, WikiError> {
        let mut membership = BTreeMap::new();
        for batch in users.chunks(USERS_BATCH) {
            let names = batch
                .iter()
                .map(Username::as_str)
                .collect::<Vec<_>>()
                .join("|");
            let response = self
                .get(&[
                    ("action", "query"),
                    ("list", "users"),
                    ("ususers", names.as_str()),
                    ("usprop", "groups"),
                ])
                .await?;
            let records = response
                .pointer("/query/users")
                .cloned()
                .ok_or_else(|| WikiError::InvalidResponse("users missing".into()))?;
            let records: Vec<UserRecord> = serde_json::from_value(records)
                .map_err(|e| WikiError::InvalidResponse(e.to_string()))?;
            for record in records {
                if record.missing {
                    continue;
                }
                // Names the API will not normalize further; skip the odd
                // invalid one rather than failing the batch.
                let Ok(user) = Username::new(&record.name) else {
                    continue;
                };
                let groups = record
                    .groups
                    .iter()
                    .filter_map(|g| Group::new(g).ok())
                    .collect();
                membership.insert(user, groups);
            }
        }
        Ok(membership)
    }

    async fn save_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        base_timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), WikiError> {
        let token = self.fetch_token("csrf").await?;
        let base = base_timestamp.map(api_timestamp);
        let mut params = vec![
            ("action", "edit"),
            ("title", title),
            ("text", text),
            ("summary", summary),
            ("bot", "1"),
            ("nocreate", "1"),
            ("token", token.as_str()),
        ];
        if let Some(base) = &base {
            params.push(("basetimestamp", base.as_str()));
        }
        match self.post(&params).await {
            Ok(_) => Ok(()),
            Err(WikiError::ApiError { code, .. }) if code == "editconflict" => {
                Err(WikiError::EditConflict(title.to_string()))
            }
            Err(other) => Err(other),
        }
    }
}
