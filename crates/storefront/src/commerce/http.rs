//! Shared HTTP plumbing for the commerce platform API.
//!
//! Owns the OAuth token lifecycle. The storefront starts on the anonymous
//! session flow; a successful login switches the client to the password
//! flow, and a cached refresh token restores an authenticated session after
//! reload. Logout drops back to a fresh anonymous session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::commerce::CommerceError;
use crate::config::CommerceConfig;

/// Slack subtracted from token lifetimes so a token is never used at the
/// edge of expiry.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Which OAuth grant the client currently authenticates with.
#[derive(Clone)]
pub enum AuthFlow {
    /// Anonymous session (client credentials against the anonymous
    /// token endpoint).
    Anonymous,
    /// Resource-owner password flow for a signed-in customer.
    Password {
        username: String,
        password: SecretString,
    },
    /// Refresh-token flow used for silent re-login after reload.
    Refresh { refresh_token: SecretString },
}

impl std::fmt::Debug for AuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Refresh { .. } => f.write_str("Refresh([REDACTED])"),
        }
    }
}

/// Token response from the OAuth service.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

struct CachedToken {
    access_token: SecretString,
    expires_at: Instant,
}

struct TokenState {
    flow: AuthFlow,
    token: Option<CachedToken>,
    /// Refresh token from the most recent grant, if the flow issued one.
    refresh_token: Option<SecretString>,
}

/// Shared HTTP client for the commerce platform.
///
/// Cheaply cloneable; all clones share the token cache.
#[derive(Clone)]
pub struct CommerceHttp {
    inner: Arc<CommerceHttpInner>,
}

struct CommerceHttpInner {
    client: reqwest::Client,
    config: CommerceConfig,
    state: Mutex<TokenState>,
}

/// Error body shape returned by the platform.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(default)]
    code: Option<String>,
}

impl CommerceHttp {
    /// Create a new client starting on the anonymous session flow.
    #[must_use]
    pub fn new(config: &CommerceConfig) -> Self {
        Self {
            inner: Arc::new(CommerceHttpInner {
                client: reqwest::Client::new(),
                config: config.clone(),
                state: Mutex::new(TokenState {
                    flow: AuthFlow::Anonymous,
                    token: None,
                    refresh_token: None,
                }),
            }),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CommerceConfig {
        &self.inner.config
    }

    /// Switch to the password flow for a signed-in customer.
    ///
    /// Drops the cached token so the next request exchanges credentials.
    /// A rejected exchange leaves the client on its previous flow, so a
    /// failed login never blocks further anonymous browsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential exchange fails.
    pub async fn use_password_flow(
        &self,
        username: &str,
        password: SecretString,
    ) -> Result<(), CommerceError> {
        let mut state = self.inner.state.lock().await;
        let previous_flow = std::mem::replace(
            &mut state.flow,
            AuthFlow::Password {
                username: username.to_string(),
                password,
            },
        );
        let previous_refresh = state.refresh_token.take();
        state.token = None;
        drop(state);
        // Exchange eagerly so a bad credential surfaces at login time
        match self.bearer().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let mut state = self.inner.state.lock().await;
                state.flow = previous_flow;
                state.token = None;
                state.refresh_token = previous_refresh;
                Err(e)
            }
        }
    }

    /// Switch to the refresh-token flow (silent re-login after reload).
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is no longer accepted.
    pub async fn use_refresh_flow(&self, refresh_token: SecretString) -> Result<(), CommerceError> {
        let mut state = self.inner.state.lock().await;
        state.flow = AuthFlow::Refresh {
            refresh_token: refresh_token.clone(),
        };
        state.token = None;
        state.refresh_token = Some(refresh_token);
        drop(state);
        self.bearer().await.map(|_| ())
    }

    /// Drop back to a fresh anonymous session (logout).
    pub async fn reset_to_anonymous(&self) {
        let mut state = self.inner.state.lock().await;
        state.flow = AuthFlow::Anonymous;
        state.token = None;
        state.refresh_token = None;
    }

    /// The refresh token issued by the most recent grant, if any.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.inner.state.lock().await.refresh_token.clone()
    }

    /// Get a valid bearer token, exchanging credentials when the cached
    /// token is absent or near expiry.
    async fn bearer(&self) -> Result<SecretString, CommerceError> {
        let mut state = self.inner.state.lock().await;

        if let Some(cached) = &state.token
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.access_token.clone());
        }

        let response = self.fetch_token(&state.flow).await?;
        let access_token = SecretString::from(response.access_token);
        let lifetime = Duration::from_secs(response.expires_in);
        state.token = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SLACK),
        });
        if let Some(refresh) = response.refresh_token {
            state.refresh_token = Some(SecretString::from(refresh));
        }
        debug!(expires_in = response.expires_in, "Obtained access token");
        Ok(access_token)
    }

    /// Exchange credentials for a token according to the given flow.
    async fn fetch_token(&self, flow: &AuthFlow) -> Result<TokenResponse, CommerceError> {
        let config = &self.inner.config;
        let scope = config.scope_param();

        let (url, params): (String, Vec<(&str, String)>) = match flow {
            AuthFlow::Anonymous => (
                format!(
                    "{}/oauth/{}/anonymous/token",
                    config.auth_url, config.project_key
                ),
                vec![
                    ("grant_type", "client_credentials".to_string()),
                    ("scope", scope),
                ],
            ),
            AuthFlow::Password { username, password } => (
                format!(
                    "{}/oauth/{}/customers/token",
                    config.auth_url, config.project_key
                ),
                vec![
                    ("grant_type", "password".to_string()),
                    ("username", username.clone()),
                    ("password", password.expose_secret().to_string()),
                    ("scope", scope),
                ],
            ),
            AuthFlow::Refresh { refresh_token } => (
                format!("{}/oauth/token", config.auth_url),
                vec![
                    ("grant_type", "refresh_token".to_string()),
                    ("refresh_token", refresh_token.expose_secret().to_string()),
                ],
            ),
        };

        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(
                &config.client_id,
                Some(config.client_secret.expose_secret()),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Token exchange failed");
            return Err(CommerceError::Auth(format!(
                "token exchange failed with status {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Build a project-scoped API URL.
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.inner.config.api_url,
            self.inner.config.project_key,
            path.trim_start_matches('/')
        )
    }

    /// GET a project-scoped resource with query parameters.
    ///
    /// # Errors
    ///
    /// Returns a typed [`CommerceError`] for transport, auth and API
    /// failures.
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, CommerceError> {
        let token = self.bearer().await?;
        let response = self
            .inner
            .client
            .get(self.api_url(path))
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await?;

        Self::decode(path, response).await
    }

    /// POST a JSON body to a project-scoped resource.
    ///
    /// # Errors
    ///
    /// Returns a typed [`CommerceError`] for transport, auth and API
    /// failures; a 409 maps to [`CommerceError::VersionConflict`].
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CommerceError> {
        let token = self.bearer().await?;
        let response = self
            .inner
            .client
            .post(self.api_url(path))
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        Self::decode(path, response).await
    }

    /// Map a platform response to a typed result.
    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, CommerceError> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CommerceError::NotFound(path.to_string()));
        }
        if status == reqwest::StatusCode::CONFLICT {
            return Err(CommerceError::VersionConflict);
        }

        let text = response.text().await?;

        if !status.is_success() {
            let parsed: Option<ApiErrorBody> = serde_json::from_str(&text).ok();
            let (message, codes) = parsed.map_or_else(
                || (text.chars().take(200).collect::<String>(), Vec::new()),
                |body| {
                    (
                        body.message.unwrap_or_else(|| "unknown error".to_string()),
                        body.errors.into_iter().filter_map(|e| e.code).collect(),
                    )
                },
            );
            tracing::error!(status = %status, message = %message, "Commerce API error");
            return Err(CommerceError::Api {
                status: status.as_u16(),
                message,
                codes,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse commerce API response"
            );
            CommerceError::Parse(e)
        })
    }
}
