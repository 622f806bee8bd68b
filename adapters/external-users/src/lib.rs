//! external-users — HTTP implementation of the UserPort.
//!
//! Purpose
//! - Fetch users from a third-party listing service (dummyjson by default)
//!   and map them into the domain `User` shape.
//!
//! API
//! - `ExternalUserApi::new(base_url)` then `fetch(count)` through `UserPort`.
//!   One `GET {base_url}?limit={count}` per call.
//!
//! Notes
//! - Blocking `reqwest` client. No timeout unless one is configured, so a hung
//!   service blocks the caller; use `with_timeout` or `with_client` to bound it.
//! - No retry and no pagination: if the service returns fewer users than asked
//!   for, that is what the caller gets.

use std::error::Error as _;
use std::time::Duration;

use domain::validate::validate_positive_count;
use domain::{Address, CoreError, User, UserPort};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Listing endpoint used when none is configured.
pub const DEFAULT_USERS_URL: &str = "https://dummyjson.com/users";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid base url '{0}'")]
    BadUrl(String),
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Body(String),
}

impl From<FetchError> for CoreError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::BadUrl(_) => CoreError::InvalidArgument(e.to_string()),
            FetchError::Status(code) => CoreError::RequestFailed {
                status: Some(code),
                message: e.to_string(),
            },
            FetchError::Client(ref inner) | FetchError::Transport(ref inner) => {
                CoreError::RequestFailed {
                    status: inner.status().map(|s| s.as_u16()),
                    message: with_causes(&e.to_string(), inner),
                }
            }
            FetchError::Body(_) => CoreError::RequestFailed {
                status: None,
                message: e.to_string(),
            },
        }
    }
}

/// Append the `source()` chain of `err` to `head`, e.g.
/// `transport error: error sending request ...: tcp connect error: Connection refused`.
fn with_causes(head: &str, err: &reqwest::Error) -> String {
    let mut out = head.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        let text = c.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        cause = c.source();
    }
    out
}

/// Non-negative integral ages, including ones sent as `25.0`.
fn parse_age(v: &serde_json::Value) -> Option<u32> {
    if let Some(a) = v.as_u64() {
        return u32::try_from(a).ok();
    }
    let f = v.as_f64()?;
    if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f) {
        Some(f as u32)
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    age: serde_json::Value,
    #[serde(default)]
    address: serde_json::Value,
}

impl From<ApiUser> for User {
    fn from(u: ApiUser) -> Self {
        User {
            name: format!(
                "{} - {}",
                u.last_name.unwrap_or_default(),
                u.first_name.unwrap_or_default()
            ),
            age: parse_age(&u.age).unwrap_or_else(|| {
                if !u.age.is_null() {
                    debug!(age = %u.age, "unusable age, defaulting to 0");
                }
                0
            }),
            address: Address::from(u.address),
        }
    }
}

/// Parse a listing response body into users.
pub fn parse_users(body: &str) -> Result<Vec<User>, FetchError> {
    let page: UsersPage =
        serde_json::from_str(body).map_err(|e| FetchError::Body(e.to_string()))?;
    Ok(page.users.into_iter().map(User::from).collect())
}

/// `UserPort` backed by the HTTP listing service.
#[derive(Debug, Clone)]
pub struct ExternalUserApi {
    client: Client,
    base_url: Url,
}

impl ExternalUserApi {
    /// Client without a request timeout.
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, CoreError> {
        // The blocking client defaults to 30s; `None` really means no timeout.
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Self::with_client(base_url, client)
    }

    /// Use a caller-configured client (timeouts, proxies, TLS).
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, CoreError> {
        let base_url =
            Url::parse(base_url).map_err(|_| FetchError::BadUrl(base_url.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// `{base_url}?limit={count}`, keeping any query the base already carries.
    pub fn request_url(&self, count: usize) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("limit", &count.to_string());
        url
    }

    fn get_users(&self, url: Url) -> Result<Vec<User>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(FetchError::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "user listing returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().map_err(FetchError::Transport)?;
        parse_users(&body)
    }
}

impl UserPort for ExternalUserApi {
    fn fetch(&self, count: i64) -> Result<Vec<User>, CoreError> {
        let n = validate_positive_count(count)?;
        let url = self.request_url(n);
        debug!(%url, "fetching external users");
        let users = self.get_users(url)?;
        if users.len() < n {
            debug!(requested = n, received = users.len(), "listing returned fewer users");
        }
        info!(count = users.len(), "external users fetched");
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve exactly one canned HTTP response; the handle yields the request line.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (format!("http://{addr}/users"), handle)
    }

    fn api(base: &str) -> ExternalUserApi {
        let client = Client::builder().no_proxy().build().unwrap();
        ExternalUserApi::with_client(base, client).unwrap()
    }

    #[test]
    fn maps_listing_into_users() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"users": [{"firstName": "John", "lastName": "Doe", "age": 25, "address": "X"}]}"#,
        );
        let users = api(&base).fetch(1).unwrap();
        assert_eq!(
            serde_json::to_value(&users).unwrap(),
            serde_json::json!([{"name": "Doe - John", "age": 25, "address": "X"}])
        );
        assert_eq!(server.join().unwrap(), "GET /users?limit=1 HTTP/1.1");
    }

    #[test]
    fn error_status_is_request_failed() {
        let (base, server) = serve_once("503 Service Unavailable", "{}");
        let err = api(&base).fetch(5).unwrap_err();
        assert!(matches!(err, CoreError::RequestFailed { status: Some(503), .. }));
        server.join().unwrap();
    }

    #[test]
    fn non_positive_count_makes_no_request() {
        // Nothing listens on the discard port; a request would be a transport error.
        let api = api("http://127.0.0.1:9/users");
        assert!(matches!(api.fetch(0), Err(CoreError::InvalidArgument(_))));
        assert!(matches!(api.fetch(-2), Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn refused_connection_keeps_cause() {
        // Bind then drop to get a local port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = api(&format!("http://127.0.0.1:{port}/users"))
            .fetch(3)
            .unwrap_err();
        match err {
            CoreError::RequestFailed {
                status: None,
                message,
            } => {
                assert!(message.starts_with("transport error: "), "{message}");
                assert!(
                    message.to_lowercase().contains("connection refused"),
                    "{message}"
                );
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            ExternalUserApi::new("not a url"),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn request_url_appends_limit() {
        let api = api("https://dummyjson.com/users?select=firstName");
        assert_eq!(
            api.request_url(20).as_str(),
            "https://dummyjson.com/users?select=firstName&limit=20"
        );
    }

    #[test]
    fn missing_users_array_is_empty() {
        assert!(parse_users(r#"{"total": 0}"#).unwrap().is_empty());
    }

    #[test]
    fn structured_address_passes_through() {
        let users = parse_users(
            r#"{"users": [{"firstName": "Emily", "lastName": "Johnson", "age": 28,
                "address": {"address": "626 Main Street", "city": "Phoenix"}}]}"#,
        )
        .unwrap();
        assert_eq!(users[0].name, "Johnson - Emily");
        assert_eq!(
            users[0].address,
            Address::Structured(serde_json::json!({"address": "626 Main Street", "city": "Phoenix"}))
        );
    }

    #[test]
    fn missing_fields_fall_back() {
        let users = parse_users(r#"{"users": [{"firstName": "Solo", "age": -4}]}"#).unwrap();
        assert_eq!(users[0].name, " - Solo");
        assert_eq!(users[0].age, 0);
        assert_eq!(users[0].address, Address::Text(String::new()));
    }

    #[test]
    fn integral_float_age_is_accepted() {
        let users = parse_users(r#"{"users": [{"age": 25.0}, {"age": 25.5}, {"age": "old"}]}"#)
            .unwrap();
        assert_eq!(users[0].age, 25);
        assert_eq!(users[1].age, 0);
        assert_eq!(users[2].age, 0);
    }

    #[test]
    fn garbage_body_is_request_failed() {
        let err: CoreError = parse_users("<html>").unwrap_err().into();
        assert!(matches!(err, CoreError::RequestFailed { status: None, .. }));
    }
}
