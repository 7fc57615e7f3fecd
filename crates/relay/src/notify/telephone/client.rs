//! HTTP client for the voice-notification provider.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

use super::config::TelephoneConfig;
use crate::{Error, Result};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

pub const FAST_LOGIN_PATH: &str = "/rest/fastlogin/v1.0";
pub const REFRESH_PATH: &str = "/omp/oauth/refresh";
pub const CALL_NOTIFY_PATH: &str = "/rest/httpsessions/callnotify/v2.0";

/// Tokens handed out by a login or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish_non_exhaustive()
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    resultcode: Option<String>,
    #[serde(default)]
    resultdesc: Option<String>,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<ExpiresIn>,
}

/// The provider documents `expires_in` as a string, but be lenient.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Number(i64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> i64 {
        match self {
            ExpiresIn::Number(n) => *n,
            ExpiresIn::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

impl TokenResponse {
    fn into_grant(self) -> Result<TokenGrant> {
        if self.access_token.is_empty() {
            return Err(Error::Provider {
                status: StatusCode::OK.as_u16(),
                body: format!(
                    "no access token in response (resultcode {:?}, resultdesc {:?})",
                    self.resultcode, self.resultdesc
                ),
            });
        }

        Ok(TokenGrant {
            expires_in_secs: self.expires_in.as_ref().map(ExpiresIn::seconds).unwrap_or(0),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        })
    }
}

/// Call notification request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallNotifyRequest<'a> {
    display_nbr: &'a str,
    callee_nbr: &'a str,
    play_info_list: [PlayInfo<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayInfo<'a> {
    template_id: &'a str,
    template_paras: [&'static str; 1],
    collect_ind: u8,
}

impl<'a> CallNotifyRequest<'a> {
    fn new(display_nbr: &'a str, callee_nbr: &'a str, template_id: &'a str) -> Self {
        Self {
            display_nbr,
            callee_nbr,
            play_info_list: [PlayInfo {
                template_id,
                template_paras: ["1"],
                collect_ind: 0,
            }],
        }
    }
}

/// The three provider operations the notifier relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelephonyApi: Send + Sync {
    /// Initial login with the static authorization value.
    async fn acquire_token(&self) -> Result<TokenGrant>;

    /// Exchange a refresh token for a new grant.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Place one voice call. `callee` must already carry its country code.
    async fn call_notify(&self, access_token: &str, callee: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpTelephonyClient {
    http: Client,
    base_url: String,
    app_key: String,
    app_secret: String,
    username: String,
    authorization: String,
    display_number: String,
    template_id: String,
}

impl HttpTelephonyClient {
    pub fn new(config: &TelephoneConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http.timeout())
            .danger_accept_invalid_certs(config.http.insecure_skip_verify)
            .build()?;

        Ok(Self::with_client(http, config))
    }

    fn with_client(http: Client, config: &TelephoneConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
            username: config.username.clone(),
            authorization: config.authorization.clone(),
            display_number: config.display_number.clone(),
            template_id: config.template_id.clone(),
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url.trim_end_matches('/'), path))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn read_grant(response: Response) -> Result<TokenGrant> {
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read provider error body");
                String::new()
            });
            return Err(Error::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response.json().await?;
        body.into_grant()
    }
}

#[async_trait]
impl TelephonyApi for HttpTelephonyClient {
    async fn acquire_token(&self) -> Result<TokenGrant> {
        let url = self.endpoint(
            FAST_LOGIN_PATH,
            &[("app_key", self.app_key.as_str()), ("username", self.username.as_str())],
        )?;
        debug!(path = FAST_LOGIN_PATH, "Requesting provider access token");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(AUTHORIZATION, self.authorization.as_str())
            .send()
            .await?;

        Self::read_grant(response).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let url = self.endpoint(
            REFRESH_PATH,
            &[
                ("app_key", self.app_key.as_str()),
                ("app_secret", self.app_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )?;
        debug!(path = REFRESH_PATH, "Refreshing provider access token");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .send()
            .await
            // the URL carries the app secret and refresh token
            .map_err(|e| Error::Http(e.without_url()))?;

        Self::read_grant(response).await
    }

    async fn call_notify(&self, access_token: &str, callee: &str) -> Result<()> {
        let url = self.endpoint(
            CALL_NOTIFY_PATH,
            &[("app_key", self.app_key.as_str()), ("access_token", access_token)],
        )?;
        let body = CallNotifyRequest::new(&self.display_number, callee, &self.template_id);

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        // Only transport failures count. The body is drained and discarded.
        let status = response.status();
        if let Err(e) = response.bytes().await {
            debug!(error = %e, "Failed to drain call notify response");
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), callee, "Provider answered call notify with non-success status");
        } else {
            debug!(status = status.as_u16(), callee, "Call notify accepted");
        }

        Ok(())
    }
}

impl fmt::Debug for HttpTelephonyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTelephonyClient")
            .field("base_url", &self.base_url)
            .field("app_key", &self.app_key)
            .field("username", &self.username)
            .field("display_number", &self.display_number)
            .field("template_id", &self.template_id)
            .finish_non_exhaustive()
    }
}
