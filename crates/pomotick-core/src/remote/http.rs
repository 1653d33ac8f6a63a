//! HTTP client for the settings store.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET  api/pomodoro/settings` -> `{ settings, focusSessions }`
//! - `PUT  api/pomodoro/settings` with `{ settings }` -> `{ ok }`
//! - `PUT  api/pomodoro/session` -> `{ ok }`

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{RemoteState, SettingsStore};
use crate::error::StoreError;
use crate::storage::ServerConfig;
use crate::timer::Settings;

const SETTINGS_PATH: &str = "api/pomodoro/settings";
const SESSION_PATH: &str = "api/pomodoro/session";

#[derive(Debug, Deserialize)]
struct Ack {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpSettingsStore {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpSettingsStore {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        // Endpoint paths are joined relative to the base, which needs a
        // trailing slash to keep any path prefix.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: Url::parse(&base)?,
            token,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        Self::new(
            &config.base_url,
            config.identity().map(str::to_string),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        let url = self.base.join(path)?;
        debug!(%method, %url, "settings store request");
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }
}

async fn success_body(resp: Response) -> Result<String, StoreError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

async fn expect_ack(resp: Response) -> Result<(), StoreError> {
    let body = success_body(resp).await?;
    let ack: Ack = serde_json::from_str(&body)?;
    if ack.ok {
        Ok(())
    } else {
        Err(StoreError::Rejected(
            ack.error.unwrap_or_else(|| "ok: false".to_string()),
        ))
    }
}

impl SettingsStore for HttpSettingsStore {
    fn fetch(&self) -> impl Future<Output = Result<RemoteState, StoreError>> + Send {
        async move {
            let resp = self.request(Method::GET, SETTINGS_PATH)?.send().await?;
            let body = success_body(resp).await?;
            Ok(serde_json::from_str(&body)?)
        }
    }

    fn save(&self, settings: Settings) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let resp = self
                .request(Method::PUT, SETTINGS_PATH)?
                .json(&json!({ "settings": settings }))
                .send()
                .await?;
            expect_ack(resp).await
        }
    }

    fn increment_session(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let resp = self.request(Method::PUT, SESSION_PATH)?.send().await?;
            expect_ack(resp).await
        }
    }
}
