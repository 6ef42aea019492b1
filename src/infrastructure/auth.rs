//! Bearer token providers.
//!
//! The transport asks its provider for a token before every request.
//! `StaticToken` hands out a token supplied by the user; `DeviceCodeProvider`
//! runs the OAuth2 device authorization grant (RFC 8628) against the
//! Microsoft identity platform and keeps the token until it expires.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::{AppError, Result};

/// Delegated scopes needed to read chats, members and profile photos.
const SCOPES: &str = "Chat.Read User.Read User.ReadBasic.All offline_access";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Source of bearer tokens.
#[allow(async_fn_in_trait)]
pub trait TokenProvider {
    /// Returns a currently valid access token.
    ///
    /// # Errors
    /// Returns `Auth` if no token can be obtained.
    async fn access_token(&self) -> Result<String>;
}

/// A pre-acquired token, e.g. from `TEAMS_EXPORT_TOKEN`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorization {
    device_code: String,
    message: String,
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
}

const fn default_interval() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
    refresh_token: Option<String>,
}

impl CachedToken {
    fn from_response(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            expires_at: response
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            refresh_token: response.refresh_token,
        }
    }

    /// Expired, with a 60 second buffer.
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + chrono::Duration::seconds(60) >= exp)
    }
}

enum PollOutcome {
    Token(TokenResponse),
    Pending,
    SlowDown,
}

/// Interactive device-code login for a registered application.
pub struct DeviceCodeProvider {
    http_client: Client,
    client_id: String,
    tenant_id: String,
    cached: Mutex<Option<CachedToken>>,
}

impl DeviceCodeProvider {
    #[must_use]
    pub fn new(client_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            cached: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/{path}",
            self.tenant_id
        )
    }

    fn cached(&self) -> Option<CachedToken> {
        self.cached.lock().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, token: CachedToken) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some(token);
        }
    }

    async fn post_form(&self, path: &str, params: &HashMap<&str, &str>) -> Result<reqwest::Response> {
        self.http_client
            .post(self.endpoint(path))
            .form(params)
            .send()
            .await
            .map_err(AppError::http)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", self.client_id.as_str());
        params.insert("scope", SCOPES);

        let response = self.post_form("token", &params).await?;
        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await.map_err(AppError::http)?;
            return Err(auth_error(&error));
        }
        response.json().await.map_err(AppError::http)
    }

    async fn poll(&self, device_code: &str) -> Result<PollOutcome> {
        let mut params = HashMap::new();
        params.insert("grant_type", DEVICE_CODE_GRANT);
        params.insert("device_code", device_code);
        params.insert("client_id", self.client_id.as_str());

        let response = self.post_form("token", &params).await?;
        if response.status().is_success() {
            let token = response.json().await.map_err(AppError::http)?;
            return Ok(PollOutcome::Token(token));
        }

        let error: ErrorResponse = response.json().await.map_err(AppError::http)?;
        match error.error.as_str() {
            "authorization_pending" => Ok(PollOutcome::Pending),
            "slow_down" => Ok(PollOutcome::SlowDown),
            _ => Err(auth_error(&error)),
        }
    }

    async fn authorize(&self) -> Result<TokenResponse> {
        let mut params = HashMap::new();
        params.insert("client_id", self.client_id.as_str());
        params.insert("scope", SCOPES);

        let response = self.post_form("devicecode", &params).await?;
        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await.map_err(AppError::http)?;
            return Err(auth_error(&error));
        }
        let auth: DeviceAuthorization = response.json().await.map_err(AppError::http)?;

        // The service message carries the verification URL and the user code.
        eprintln!("{}", auth.message);

        let deadline =
            Utc::now() + chrono::Duration::seconds(i64::try_from(auth.expires_in).unwrap_or(900));
        let mut interval = Duration::from_secs(auth.interval);

        loop {
            if Utc::now() >= deadline {
                return Err(AppError::Auth {
                    message: format!("Device code expired after {} seconds", auth.expires_in),
                });
            }

            tokio::time::sleep(interval).await;

            match self.poll(&auth.device_code).await? {
                PollOutcome::Token(token) => return Ok(token),
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += Duration::from_secs(5),
            }
        }
    }
}

impl TokenProvider for DeviceCodeProvider {
    async fn access_token(&self) -> Result<String> {
        let cached = self.cached();

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.access_token.clone());
        }

        let refreshed = match cached.as_ref().and_then(|t| t.refresh_token.as_deref()) {
            Some(refresh_token) => match self.refresh(refresh_token).await {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!("Token refresh failed, signing in again: {}", e);
                    None
                }
            },
            None => None,
        };

        let response = match refreshed {
            Some(response) => response,
            None => self.authorize().await?,
        };

        let mut token = CachedToken::from_response(response);
        if token.refresh_token.is_none() {
            token.refresh_token = cached.and_then(|t| t.refresh_token);
        }
        let access_token = token.access_token.clone();
        self.store(token);

        Ok(access_token)
    }
}

fn auth_error(error: &ErrorResponse) -> AppError {
    AppError::Auth {
        message: match &error.error_description {
            Some(description) => format!("{}: {description}", error.error),
            None => error.error.clone(),
        },
    }
}
