//! Page fetching
//!
//! This module defines the capability the harvester needs from a page driver
//! and provides an HTTP implementation of it:
//! - [`PageFetcher`] opens one [`FetchSession`] per attempt
//! - A session fetches documents until it is closed
//! - [`HttpFetcher`] builds a fresh `reqwest` client per session and can
//!   route every request through a scraping proxy

use crate::config::{FetcherConfig, ProxyConfig};
use crate::url::proxy_url;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A fetched page
#[derive(Debug, Clone)]
pub struct Document {
    /// URL that was requested (before any proxy wrapping)
    pub url: String,
    /// Raw page body
    pub body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// Parses the body as an HTML document
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Errors that can occur while fetching a page; all of them are retryable
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to open fetch session: {0}")]
    Session(String),

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Session already closed")]
    Closed,
}

/// Opens scoped fetch sessions
///
/// Every attempt of a fetch task opens its own session and closes it before
/// the next attempt starts or the task gives up. Sessions are never shared
/// between workers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Session: FetchSession + 'static;

    async fn open_session(&self) -> Result<Self::Session, FetchError>;
}

/// A live page-driver session
#[async_trait]
pub trait FetchSession: Send {
    async fn fetch(&mut self, url: &str) -> Result<Document, FetchError>;

    /// Releases the session's resources; must be safe to call once per session
    async fn close(&mut self);
}

/// Holds an open session until it is explicitly closed
///
/// [`SessionGuard::close`] is the normal release path. If the guard is
/// dropped with the session still open, for example while a panic unwinds
/// through an attempt, `close` is spawned on the runtime the guard was
/// created on.
pub struct SessionGuard<S: FetchSession + 'static> {
    session: Option<S>,
    runtime: Option<tokio::runtime::Handle>,
}

impl<S: FetchSession + 'static> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
            runtime: tokio::runtime::Handle::try_current().ok(),
        }
    }

    pub async fn fetch(&mut self, url: &str) -> Result<Document, FetchError> {
        match self.session.as_mut() {
            Some(session) => session.fetch(url).await,
            None => Err(FetchError::Closed),
        }
    }

    /// Closes the session, consuming the guard
    pub async fn close(mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }
}

impl<S: FetchSession + 'static> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            match &self.runtime {
                Some(runtime) => {
                    tracing::debug!("Releasing fetch session from drop");
                    runtime.spawn(async move { session.close().await });
                }
                None => tracing::warn!("Fetch session dropped outside a runtime; not closed"),
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }

    builder.build()
}

/// [`PageFetcher`] backed by plain HTTP requests
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    config: FetcherConfig,
    proxy: Option<ProxyConfig>,
    sessions_opened: Arc<AtomicU64>,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig, proxy: Option<ProxyConfig>) -> Self {
        Self {
            config,
            proxy,
            sessions_opened: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    type Session = HttpSession;

    async fn open_session(&self) -> Result<HttpSession, FetchError> {
        let client =
            build_http_client(&self.config).map_err(|e| FetchError::Session(e.to_string()))?;
        let id = self.sessions_opened.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!("Opened fetch session {}", id);

        Ok(HttpSession {
            id,
            client: Some(client),
            proxy: self.proxy.clone(),
        })
    }
}

/// One HTTP session; owns its own client and connection pool
#[derive(Debug)]
pub struct HttpSession {
    id: u64,
    client: Option<Client>,
    proxy: Option<ProxyConfig>,
}

impl HttpSession {
    fn request_url(&self, url: &str) -> Result<String, FetchError> {
        match &self.proxy {
            Some(proxy) => proxy_url(proxy, url)
                .map(|u| u.to_string())
                .map_err(|e| FetchError::Request {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(url.to_string()),
        }
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn fetch(&mut self, url: &str) -> Result<Document, FetchError> {
        let client = self.client.as_ref().ok_or(FetchError::Closed)?;
        let request_url = self.request_url(url)?;

        let response = client
            .get(request_url.as_str())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;
        Ok(Document::new(url, body))
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!("Closed fetch session {}", self.id);
        }
    }
}

/// Maps a transport error onto a [`FetchError`]
fn classify_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
