//! HTTP transport for the remote API.
//!
//! `Transport` is the only seam between the exporter and the network.
//! `HttpTransport` injects a bearer token on every request.

use reqwest::Client;
use serde_json::Value;

use crate::domain::{AppError, Result};

use super::auth::TokenProvider;

/// Authenticated GET requests against the remote service.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Fetches and decodes a JSON document.
    ///
    /// # Errors
    /// Returns `RemoteFetch` on a non-success status.
    async fn get_json(&self, url: &str) -> Result<Value>;

    /// Fetches a binary resource.
    ///
    /// # Errors
    /// Returns `RemoteFetch` on a non-success status.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production transport backed by `reqwest`.
pub struct HttpTransport<P> {
    client: Client,
    tokens: P,
}

impl<P: TokenProvider> HttpTransport<P> {
    /// Creates a transport that asks `tokens` for a credential on every call.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(tokens: P) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("teams-chat-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::http)?;

        Ok(Self { client, tokens })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let token = self.tokens.access_token().await?;

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(AppError::http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::remote_fetch(status.as_u16(), url));
        }

        Ok(response)
    }
}

impl<P: TokenProvider> Transport for HttpTransport<P> {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let bytes = self.get_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(AppError::json_parse)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(AppError::http)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory transport serving canned responses.

    use std::cell::RefCell;
    use std::collections::HashMap;

    use serde_json::Value;

    use super::Transport;
    use crate::domain::{AppError, Result};

    enum Canned {
        Json(Value),
        Bytes(Vec<u8>),
        Status(u16),
    }

    /// Serves registered URLs and counts every request.
    #[derive(Default)]
    pub struct FakeTransport {
        routes: HashMap<String, Canned>,
        calls: RefCell<HashMap<String, usize>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn json(mut self, url: &str, body: Value) -> Self {
            self.routes.insert(url.to_string(), Canned::Json(body));
            self
        }

        pub fn bytes(mut self, url: &str, body: &[u8]) -> Self {
            self.routes.insert(url.to_string(), Canned::Bytes(body.to_vec()));
            self
        }

        pub fn status(mut self, url: &str, status: u16) -> Self {
            self.routes.insert(url.to_string(), Canned::Status(status));
            self
        }

        /// Number of requests made to `url`.
        pub fn calls(&self, url: &str) -> usize {
            self.calls.borrow().get(url).copied().unwrap_or(0)
        }

        /// Number of requests made to any URL.
        pub fn total_calls(&self) -> usize {
            self.calls.borrow().values().sum()
        }

        fn hit(&self, url: &str) -> Result<&Canned> {
            *self.calls.borrow_mut().entry(url.to_string()).or_default() += 1;
            match self.routes.get(url) {
                Some(Canned::Status(status)) => Err(AppError::remote_fetch(*status, url)),
                Some(canned) => Ok(canned),
                None => Err(AppError::remote_fetch(404, url)),
            }
        }
    }

    impl Transport for FakeTransport {
        async fn get_json(&self, url: &str) -> Result<Value> {
            match self.hit(url)? {
                Canned::Json(value) => Ok(value.clone()),
                Canned::Bytes(bytes) => serde_json::from_slice(bytes).map_err(AppError::json_parse),
                Canned::Status(status) => Err(AppError::remote_fetch(*status, url)),
            }
        }

        async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
            match self.hit(url)? {
                Canned::Json(value) => Ok(value.to_string().into_bytes()),
                Canned::Bytes(bytes) => Ok(bytes.clone()),
                Canned::Status(status) => Err(AppError::remote_fetch(*status, url)),
            }
        }
    }
}
