//! Credential handshake against the cross-domain probe
//!
//! The probe answers a basic-auth GET by setting three cookies at different
//! paths. Together they form the session token; the token is then replayed
//! as a plain `Cookie` header instead of through a cookie jar.

use crate::error::ClientError;
use crate::session::Session;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Path of the lightweight authenticated probe
pub const PROBE_PATH: &str = "/cuic/rest/crossdomain";

/// A cookie identified by the path it was scoped to and its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieScope {
    pub path: &'static str,
    pub name: &'static str,
}

/// The cookies that make up a session token, in token order
pub const SESSION_COOKIES: [CookieScope; 3] = [
    CookieScope {
        path: "/cuic",
        name: "JSESSIONID",
    },
    CookieScope {
        path: "/",
        name: "JSESSIONIDSSO",
    },
    CookieScope {
        path: "/",
        name: "XSRF-TOKEN",
    },
];

/// A cookie as set by a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, path: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: path.map(str::to_string),
        }
    }

    /// Effective path, falling back to the default path of the request
    fn scope_path<'a>(&'a self, request_path: &'a str) -> &'a str {
        self.path
            .as_deref()
            .unwrap_or_else(|| default_cookie_path(request_path))
    }
}

/// Default cookie path for a request path (RFC 6265 section 5.1.4)
pub fn default_cookie_path(request_path: &str) -> &str {
    if !request_path.starts_with('/') {
        return "/";
    }
    match request_path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &request_path[..idx],
    }
}

/// Find the value set for `scope`; the last matching cookie wins
pub fn extract_cookie<'a>(
    cookies: &'a [SetCookie],
    scope: &CookieScope,
    request_path: &str,
) -> Option<&'a str> {
    cookies
        .iter()
        .rev()
        .find(|cookie| cookie.name == scope.name && cookie.scope_path(request_path) == scope.path)
        .map(|cookie| cookie.value.as_str())
}

/// Compose the session token from the cookies set by the probe
pub fn compose_session_token(
    cookies: &[SetCookie],
    request_path: &str,
) -> Result<String, ClientError> {
    let mut token = String::new();
    for scope in &SESSION_COOKIES {
        let value = extract_cookie(cookies, scope, request_path).ok_or_else(|| {
            ClientError::AuthenticationFailed(format!(
                "no {} cookie at path {} in probe response",
                scope.name, scope.path
            ))
        })?;
        token.push_str(scope.name);
        token.push('=');
        token.push_str(value);
        token.push(';');
    }
    Ok(token)
}

/// Performs the basic-auth probe and builds a [`Session`]
#[derive(Clone)]
pub struct Authenticator {
    client: Client,
    base_url: String,
    login: String,
    password: String,
}

impl Authenticator {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub async fn authenticate(&self) -> Result<Session, ClientError> {
        info!(login = %self.login, "Authenticating against CUIC");

        let response = self
            .client
            .get(format!("{}{PROBE_PATH}", self.base_url))
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(%status, "Probe rejected credentials");
            return Err(ClientError::AuthenticationFailed(format!(
                "probe rejected credentials with status {status}"
            )));
        }
        if !status.is_success() && !status.is_redirection() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let cookies: Vec<SetCookie> = response
            .cookies()
            .map(|cookie| SetCookie::new(cookie.name(), cookie.value(), cookie.path()))
            .collect();
        debug!(count = cookies.len(), "Probe set cookies");

        let token = compose_session_token(&cookies, PROBE_PATH)?;
        info!("Authenticated, session established");
        Ok(Session::new(token))
    }
}
