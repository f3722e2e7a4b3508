//! Authenticated session against the SlimTimer API.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use thiserror::Error;

use st_core::timestamp::format_timestamp;
use st_core::{AuthToken, CodecError, CompletedFilter, Entry, Task, xml};

/// Host the service is reached at unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "http://www.slimtimer.com";

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const XML_MEDIA_TYPE: &str = "application/xml";

/// Session errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Username or API key missing.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed before a response arrived.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The token endpoint rejected the credentials.
    #[error("server returned error [{status}]: {body}")]
    Authentication { status: u16, body: String },
    /// A write or delete came back with something other than 200.
    #[error("could not {action}; response was [{status}]: {body}")]
    Status {
        action: &'static str,
        status: u16,
        body: String,
    },
    /// A 200 response body could not be decoded, or a request body built.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Scheme and host, without a trailing path.
    pub base_url: String,
    /// Upper bound on a single round trip. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// The authenticated channel through which task and entry operations run.
///
/// Construction logs in. Every operation is one blocking round trip; the
/// session owns its connection exclusively, so operations take `&mut self`.
/// After a successful delete the connection is dropped, reopened and
/// re-authenticated before the call returns.
pub struct Session {
    config: SessionConfig,
    username: String,
    password: String,
    api_key: String,
    http: Client,
    token: Option<AuthToken>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .field("user_id", &self.user_id())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Logs in against the default host.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::with_config(username, password, api_key, SessionConfig::default())
    }

    /// Logs in against the host in `config`.
    ///
    /// # Errors
    ///
    /// Fails without touching the network if the username or API key is
    /// empty, and with [`ApiError::Authentication`] if the server answers
    /// the token request with anything but 200.
    pub fn with_config(
        username: impl Into<String>,
        password: impl Into<String>,
        api_key: impl Into<String>,
        config: SessionConfig,
    ) -> Result<Self, ApiError> {
        let username = username.into();
        let api_key = api_key.into();
        if username.is_empty() {
            return Err(ApiError::InvalidCredentials {
                reason: "username cannot be empty",
            });
        }
        if api_key.is_empty() {
            return Err(ApiError::InvalidCredentials {
                reason: "API key cannot be empty",
            });
        }

        let http = build_client(&config)?;
        let mut session = Self {
            config,
            username,
            password: password.into(),
            api_key,
            http,
            token: None,
        };
        session.authenticate()?;
        Ok(session)
    }

    /// The configured username. No network call.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// User id from the current token, if logged in.
    pub fn user_id(&self) -> Option<&str> {
        self.token.as_ref().map(|token| token.user_id.as_str())
    }

    // ========== Tasks ==========

    /// Fetch a task by id. Any non-200 status yields `None`.
    pub fn get_task_by_id(&mut self, id: u64) -> Result<Option<Task>, ApiError> {
        let (status, body) = self.send(Method::GET, &format!("tasks/{id}"), &[], None)?;
        match ok_body(status, body) {
            Some(body) => Ok(Some(xml::parse_task(&body)?)),
            None => Ok(None),
        }
    }

    /// Fetch every task matching `completed`. Any non-200 status yields `None`.
    pub fn list_tasks(
        &mut self,
        completed: CompletedFilter,
    ) -> Result<Option<Vec<Task>>, ApiError> {
        let query = [("show_completed", completed.wire_value().to_string())];
        let (status, body) = self.send(Method::GET, "tasks", &query, None)?;
        match ok_body(status, body) {
            Some(body) => Ok(Some(xml::parse_tasks(&body)?)),
            None => Ok(None),
        }
    }

    /// First task whose name equals `name` exactly.
    pub fn get_task_by_name(
        &mut self,
        name: &str,
        completed: CompletedFilter,
    ) -> Result<Option<Task>, ApiError> {
        let tasks = self.list_tasks(completed)?.unwrap_or_default();
        Ok(tasks.into_iter().find(|task| task.name == name))
    }

    /// Create `task` if it has never been saved, otherwise update it in place
    /// on the server. Returns the record the server sent back.
    pub fn update_task(&mut self, task: &Task) -> Result<Task, ApiError> {
        let request = xml::serialize_task(task, Utc::now())?;
        let (method, path, action) = if task.is_saved() {
            (Method::PUT, format!("tasks/{}", task.id()), "update task")
        } else {
            (Method::POST, "tasks".to_string(), "create task")
        };

        let (status, body) = self.send(method, &path, &[], Some(request))?;
        let body = require_ok(status, body, action)?;
        Ok(xml::parse_task(&body)?)
    }

    /// Delete a task, then reset the connection.
    pub fn delete_task(&mut self, task: &Task) -> Result<(), ApiError> {
        self.delete(&format!("tasks/{}", task.id()), "delete task")
    }

    // ========== Time entries ==========

    /// Create or update a time entry; see [`Entry::duration_in_seconds`] for
    /// the duration sent.
    pub fn update_time_entry(&mut self, entry: &Entry) -> Result<Entry, ApiError> {
        let request = xml::serialize_time_entry(entry)?;
        let (method, path, action) = if entry.is_saved() {
            (
                Method::PUT,
                format!("time_entries/{}", entry.id()),
                "update time entry",
            )
        } else {
            (Method::POST, "time_entries".to_string(), "create time entry")
        };

        let (status, body) = self.send(method, &path, &[], Some(request))?;
        let body = require_ok(status, body, action)?;
        Ok(xml::parse_time_entry(&body)?)
    }

    /// Delete a time entry, then reset the connection.
    pub fn delete_entry(&mut self, entry: &Entry) -> Result<(), ApiError> {
        self.delete(&format!("time_entries/{}", entry.id()), "delete time entry")
    }

    /// Fetch time entries, optionally limited to a start/end range.
    /// Any non-200 status yields `None`.
    pub fn get_time_entries(
        &mut self,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Result<Option<Vec<Entry>>, ApiError> {
        let mut query = Vec::new();
        if let Some(start) = range_start {
            query.push(("range_start", format_timestamp(&start)));
        }
        if let Some(end) = range_end {
            query.push(("range_end", format_timestamp(&end)));
        }

        let (status, body) = self.send(Method::GET, "time_entries", &query, None)?;
        match ok_body(status, body) {
            Some(body) => Ok(Some(xml::parse_time_entries(&body)?)),
            None => Ok(None),
        }
    }

    // ========== Internals ==========

    fn delete(&mut self, path: &str, action: &'static str) -> Result<(), ApiError> {
        let (status, body) = self.send(Method::DELETE, path, &[], None)?;
        require_ok(status, body, action)?;
        // The service does not answer cleanly on a connection that served a delete.
        self.reset_connection()
    }

    fn reset_connection(&mut self) -> Result<(), ApiError> {
        tracing::debug!("resetting connection");
        self.token = None;
        self.http = build_client(&self.config)?;
        self.authenticate()?;
        Ok(())
    }

    /// Token for the current connection, logging in first if there is none.
    fn authenticate(&mut self) -> Result<&AuthToken, ApiError> {
        let token = match self.token.take() {
            Some(token) => token,
            None => self.login()?,
        };
        Ok(&*self.token.insert(token))
    }

    fn login(&self) -> Result<AuthToken, ApiError> {
        let request = xml::login_request(&self.username, &self.password, &self.api_key)?;
        let response = self
            .http
            .post(format!("{}/users/token", self.config.base_url))
            .header(ACCEPT, XML_MEDIA_TYPE)
            .header(CONTENT_TYPE, XML_MEDIA_TYPE)
            .body(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if status != StatusCode::OK {
            return Err(ApiError::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let token = xml::parse_auth_token(&body)?;
        tracing::debug!(user_id = %token.user_id, "logged in");
        Ok(token)
    }

    /// One round trip to `/users/{user_id}/{path}` with the credential query
    /// parameters appended.
    fn send(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
    ) -> Result<(StatusCode, String), ApiError> {
        let token = self.authenticate()?.clone();
        let url = resource_url(&self.config.base_url, &token.user_id, path);

        let mut request = self
            .http
            .request(method.clone(), url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("access_token", token.access_token.as_str()),
            ])
            .query(query)
            .header(ACCEPT, XML_MEDIA_TYPE);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, XML_MEDIA_TYPE).body(body);
        }

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        tracing::debug!(%method, path, %status, "request completed");
        Ok((status, body))
    }
}

fn build_client(config: &SessionConfig) -> Result<Client, ApiError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(ApiError::ClientBuild)
}

/// `{base}/users/{user_id}/{path}`.
fn resource_url(base_url: &str, user_id: &str, path: &str) -> String {
    format!("{}/users/{user_id}/{path}", base_url.trim_end_matches('/'))
}

fn ok_body(status: StatusCode, body: String) -> Option<String> {
    if status == StatusCode::OK {
        Some(body)
    } else {
        tracing::debug!(%status, "treating non-200 read as not found");
        None
    }
}

fn require_ok(status: StatusCode, body: String, action: &'static str) -> Result<String, ApiError> {
    if status == StatusCode::OK {
        Ok(body)
    } else {
        Err(ApiError::Status {
            action,
            status: status.as_u16(),
            body,
        })
    }
}
