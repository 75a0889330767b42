//! Authenticated session state
//!
//! A [`Session`] is the composed cookie string the platform accepts on every
//! authenticated call, stamped with the time it was issued. The
//! [`SessionStore`] owns the current session and replaces it as a whole.

use crate::error::ClientError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

/// Composed session token and its issue time
#[derive(Clone)]
pub struct Session {
    token: String,
    issued_at: Instant,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            issued_at: Instant::now(),
        }
    }

    /// Value sent verbatim as the `Cookie` header
    pub fn token(&self) -> &str {
        &self.token
    }

    pub const fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }

    pub fn is_fresh(&self, timeout: Duration) -> bool {
        self.age() < timeout
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("age", &self.age())
            .finish()
    }
}

/// Holder of the current session
///
/// Readers get an `Arc` snapshot, so a replacement never exposes a partially
/// written token. Refreshes are serialized: callers that find the session
/// stale while another refresh is in flight wait for it and reuse its result.
pub struct SessionStore {
    timeout: Duration,
    current: RwLock<Option<Arc<Session>>>,
    refresh: Mutex<()>,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn current(&self) -> Option<Arc<Session>> {
        self.current.read().await.clone()
    }

    /// Current session if it is still within the timeout
    pub async fn fresh(&self) -> Option<Arc<Session>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|session| session.is_fresh(self.timeout))
            .cloned()
    }

    pub async fn replace(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        *self.current.write().await = Some(session.clone());
        session
    }

    /// Drop the current session so the next call re-authenticates
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }

    /// Return a fresh session, running `authenticate` only when the stored one is stale
    pub async fn get_or_refresh<F, Fut>(&self, authenticate: F) -> Result<Arc<Session>, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Session, ClientError>>,
    {
        if let Some(session) = self.fresh().await {
            return Ok(session);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(session) = self.fresh().await {
            debug!("Session refreshed by a concurrent caller");
            return Ok(session);
        }

        debug!(timeout_secs = self.timeout.as_secs(), "Session missing or stale, authenticating");
        let session = authenticate().await?;
        Ok(self.replace(session).await)
    }
}
