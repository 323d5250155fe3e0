// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Baidu AI open platform access tokens and response checks

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::AppCredentials;
use crate::providers::{build_client, parse_response, send_json, ProviderError};

pub const BAIDU_BASE_URL: &str = "https://aip.baidubce.com";

/// Tokens are refreshed this long before the vendor says they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Client-credentials token client for one Baidu application
///
/// One instance per credential set. The token is shared by every call made
/// through the instance and fetched again once it nears expiry.
pub struct BaiduAuth {
    provider: &'static str,
    credentials: AppCredentials,
    base_url: String,
    client: Client,
    timeout: Duration,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl BaiduAuth {
    pub fn new(provider: &'static str, credentials: AppCredentials, timeout: Duration) -> Self {
        Self {
            provider,
            credentials,
            base_url: BAIDU_BASE_URL.to_string(),
            client: build_client(timeout),
            timeout,
            token: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current access token, fetching a new one when needed
    pub async fn access_token(&self) -> Result<String, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured {
                provider: self.provider.to_string(),
            });
        }

        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
            debug!("[{}] access token near expiry, refreshing", self.provider);
        }

        let request = self
            .client
            .post(format!("{}/oauth/2.0/token", self.base_url))
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.api_key.as_str()),
                ("client_secret", self.credentials.secret_key.as_str()),
            ]);
        let value = send_json(self.provider, self.timeout, request).await?;
        let response: TokenResponse = parse_response(self.provider, value)?;

        let token = match response.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(ProviderError::Vendor {
                    provider: self.provider.to_string(),
                    code: response.error.unwrap_or_else(|| "token".to_string()),
                    message: response
                        .error_description
                        .unwrap_or_else(|| "failed to obtain access token".to_string()),
                })
            }
        };

        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(0));
        *slot = Some(CachedToken {
            value: token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });
        info!(
            "✅ [{}] obtained access token (expires in {}s)",
            self.provider,
            lifetime.as_secs()
        );
        Ok(token)
    }

    /// POST a form to `path` on the API host
    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        let token = self.access_token().await?;
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .query(&[("access_token", token.as_str())])
            .form(form);
        let value = send_json(self.provider, self.timeout, request).await?;
        check_error(self.provider, &value)?;
        Ok(value)
    }

    /// POST a JSON body to `path` on the API host
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let token = self.access_token().await?;
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .query(&[("access_token", token.as_str())])
            .json(body);
        let value = send_json(self.provider, self.timeout, request).await?;
        check_error(self.provider, &value)?;
        Ok(value)
    }
}

/// Baidu replies carry `error_code`/`error_msg` instead of an HTTP status
pub fn check_error(provider: &str, value: &Value) -> Result<(), ProviderError> {
    let code = match value.get("error_code") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => s.parse().unwrap_or(-1),
        _ => return Ok(()),
    };
    if code == 0 {
        return Ok(());
    }
    let message = value
        .get("error_msg")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Err(ProviderError::Vendor {
        provider: provider.to_string(),
        code: code.to_string(),
        message,
    })
}

/// `log_id` as it appears in a reply (number or string)
pub fn log_id(value: &Value) -> Value {
    value.get("log_id").cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_error() {
        assert!(check_error("baidu", &json!({"log_id": 1, "result": []})).is_ok());
        assert!(check_error("baidu", &json!({"error_code": 0, "error_msg": "SUCCESS"})).is_ok());

        let err = check_error(
            "baidu",
            &json!({"error_code": 17, "error_msg": "Open api daily request limit reached"}),
        )
        .unwrap_err();
        match err {
            ProviderError::Vendor { code, message, .. } => {
                assert_eq!(code, "17");
                assert!(message.contains("limit"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(check_error("baidu", &json!({"error_code": "216201"})).is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_token_request() {
        let auth = BaiduAuth::new("baidu", AppCredentials::default(), Duration::from_secs(1));
        assert!(matches!(
            auth.access_token().await.unwrap_err(),
            ProviderError::NotConfigured { .. }
        ));
    }

    #[test]
    fn test_base_url_override() {
        let auth = BaiduAuth::new(
            "baidu",
            AppCredentials::new("1", "ak", "sk"),
            Duration::from_secs(1),
        )
        .with_base_url("http://127.0.0.1:1234/");
        assert_eq!(auth.base_url(), "http://127.0.0.1:1234");
        assert!(auth.is_configured());
    }
}
