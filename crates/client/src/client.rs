//! CUIC security-permissions client

use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{Session, SessionStore};
use cuic_core::ValidateConfig;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, header, redirect};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The endpoint every listing and grant command is posted to
pub const SECURITY_PERMISSIONS_PATH: &str = "/cuic/security/SecurityPermissions.htmx";

/// Stateful CUIC client
///
/// Owns one [`SessionStore`]; every authenticated call goes through
/// [`CuicClient::ensure_fresh`] first.
pub struct CuicClient {
    client: Client,
    base_url: String,
    authenticator: Authenticator,
    session: SessionStore,
    throttle: Duration,
}

impl CuicClient {
    /// Create a client from a validated configuration
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let client = ClientBuilder::new()
            .user_agent(concat!("cuic-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            // Unauthenticated calls are answered with a redirect to the login page
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        let base_url = config.base_url();
        let authenticator = Authenticator::new(
            client.clone(),
            base_url.clone(),
            config.login_name(),
            config.password.clone(),
        );

        Ok(Self {
            client,
            base_url,
            authenticator,
            session: SessionStore::new(config.session_timeout()),
            throttle: config.throttle(),
        })
    }

    /// Create a new client builder
    pub fn builder() -> CuicClientBuilder {
        CuicClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delay applied between writes of a bulk job
    pub const fn throttle(&self) -> Duration {
        self.throttle
    }

    pub const fn session_store(&self) -> &SessionStore {
        &self.session
    }

    /// Authenticate unconditionally and replace the stored session
    pub async fn authenticate(&self) -> Result<Arc<Session>, ClientError> {
        let session = self.authenticator.authenticate().await?;
        Ok(self.session.replace(session).await)
    }

    /// Authenticate only if the stored session is missing or stale
    pub async fn ensure_fresh(&self) -> Result<Arc<Session>, ClientError> {
        self.session
            .get_or_refresh(|| self.authenticator.authenticate())
            .await
    }

    /// Forget the current session; the next call re-authenticates
    pub async fn invalidate_session(&self) {
        self.session.invalidate().await;
    }

    /// Create a request builder carrying the session cookie
    pub fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::ORIGIN, &self.base_url)
            .header(header::COOKIE, session.token())
    }

    /// Execute a request and return the body, mapping redirects and error statuses
    pub async fn execute(&self, request: RequestBuilder) -> Result<String, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            warn!(%status, %location, "Authenticated call was redirected, session expired");
            return Err(ClientError::SessionExpired { location });
        }

        if status.is_success() {
            Ok(response.text().await?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Post a form-encoded command to the security permissions endpoint
    pub(crate) async fn post_command(&self, form: &[(&str, String)]) -> Result<String, ClientError> {
        let session = self.ensure_fresh().await?;
        debug!(cmd = form.first().map(|(_, v)| v.as_str()), "Posting security command");
        let request = self
            .request(Method::POST, SECURITY_PERMISSIONS_PATH, &session)
            .form(form);
        self.execute(request).await
    }

    /// Fetch the security permissions page
    pub(crate) async fn get_security_page(&self) -> Result<String, ClientError> {
        let session = self.ensure_fresh().await?;
        let request = self.request(Method::GET, SECURITY_PERMISSIONS_PATH, &session);
        self.execute(request).await
    }
}

/// Builder for [`CuicClient`]
///
/// Timeouts have whole-second resolution; a duration with a fractional
/// second makes [`CuicClientBuilder::build`] fail.
#[derive(Default)]
pub struct CuicClientBuilder {
    config: ClientConfig,
    rejected: Vec<String>,
}

impl CuicClientBuilder {
    fn whole_seconds(&mut self, field: &str, duration: Duration) -> u64 {
        if duration.subsec_nanos() != 0 {
            self.rejected.push(format!(
                "{field}: must be a whole number of seconds, got {duration:?}"
            ));
        }
        duration.as_secs()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = domain.into();
        self
    }

    /// Override the derived `https://{host}:8444` base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout_secs = self.whole_seconds("session_timeout", timeout);
        self
    }

    /// Delay between bulk writes, kept at millisecond resolution
    pub fn throttle(mut self, throttle: Duration) -> Self {
        self.config.throttle_ms = u64::try_from(throttle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = self.whole_seconds("request_timeout", timeout);
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CuicClient, ClientError> {
        if let Some(reason) = self.rejected.into_iter().next() {
            return Err(ClientError::Configuration(reason));
        }
        CuicClient::new(&self.config)
    }
}
