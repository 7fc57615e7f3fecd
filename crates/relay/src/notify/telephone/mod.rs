//! Voice-call notification channel.
//!
//! The notifier logs in once when it is built and keeps the resulting
//! credential for its whole lifetime. Before each event it refreshes the
//! credential if it is older than [`STALE_AFTER_HOURS`] hours, then
//! calls every configured operator in order. A failed refresh makes the event
//! retryable; a failed call only affects that operator.

mod client;
mod config;
mod credential;

pub use client::{
    HttpTelephonyClient, TelephonyApi, TokenGrant, CALL_NOTIFY_PATH, FAST_LOGIN_PATH, REFRESH_PATH,
};
pub use config::{HttpClientConfig, TelephoneConfig, DEFAULT_COUNTRY_CODE};
pub use credential::{Credential, STALE_AFTER_HOURS};

use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{DeliveryReport, Notifier, NotifyError};
use crate::alert::AlertGroup;
use crate::metrics::{CREDENTIAL_OPERATIONS_TOTAL, DELIVERIES_TOTAL, NOTIFICATIONS_TOTAL};
use crate::Result;

const CHANNEL: &str = "telephone";

pub struct TelephoneNotifier<A = HttpTelephonyClient> {
    api: A,
    operators: Vec<String>,
    country_code: String,
    credential: Mutex<Credential>,
}

impl TelephoneNotifier<HttpTelephonyClient> {
    /// Builds the provider client and performs the initial login.
    pub async fn new(config: TelephoneConfig) -> Result<Self> {
        let api = HttpTelephonyClient::new(&config)?;
        Self::with_api(api, &config).await
    }
}

impl<A: TelephonyApi> TelephoneNotifier<A> {
    /// Performs the initial login through `api`. There is no retry: a failed
    /// login fails construction.
    pub async fn with_api(api: A, config: &TelephoneConfig) -> Result<Self> {
        let grant = match api.acquire_token().await {
            Ok(grant) => {
                CREDENTIAL_OPERATIONS_TOTAL.with_label_values(&["acquire", "ok"]).inc();
                grant
            }
            Err(e) => {
                CREDENTIAL_OPERATIONS_TOTAL.with_label_values(&["acquire", "error"]).inc();
                error!(error = %e, "Failed to acquire telephony access token");
                return Err(e);
            }
        };

        info!(
            operators = config.operators.len(),
            expires_in = grant.expires_in_secs,
            "Acquired telephony access token"
        );

        Ok(Self {
            api,
            operators: config.operators.clone(),
            country_code: config.country_code.clone(),
            credential: Mutex::new(Credential::from_grant(grant, Utc::now())),
        })
    }

    /// Returns a usable access token, refreshing it first if it is stale.
    ///
    /// The lock is held across the refresh, so callers that race on a stale
    /// credential wait for the first refresh and then reuse its result.
    async fn access_token(&self) -> Result<String> {
        let mut credential = self.credential.lock().await;
        if !credential.is_stale_at(Utc::now()) {
            return Ok(credential.access_token().to_string());
        }

        debug!(issued_at = ?credential.issued_at(), "Telephony access token is stale");
        match self.api.refresh_token(credential.refresh_token()).await {
            Ok(grant) => {
                CREDENTIAL_OPERATIONS_TOTAL.with_label_values(&["refresh", "ok"]).inc();
                credential.renew(grant, Utc::now());
                info!(
                    expires_in = credential.expires_in_secs(),
                    "Refreshed telephony access token"
                );
                Ok(credential.access_token().to_string())
            }
            Err(e) => {
                CREDENTIAL_OPERATIONS_TOTAL.with_label_values(&["refresh", "error"]).inc();
                Err(e)
            }
        }
    }

    async fn call_operators(&self, access_token: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for operator in &self.operators {
            let callee = normalize_callee(&self.country_code, operator);
            match self.api.call_notify(access_token, &callee).await {
                Ok(()) => {
                    DELIVERIES_TOTAL.with_label_values(&[CHANNEL, "delivered"]).inc();
                    report.record_delivered(callee);
                }
                Err(e) => {
                    DELIVERIES_TOTAL.with_label_values(&[CHANNEL, "failed"]).inc();
                    error!(operator = %operator, error = %e, "Voice notification failed");
                    report.record_failed(callee, &e);
                }
            }
        }
        report
    }
}

/// Prefixes the country code unless the number already carries one.
pub fn normalize_callee(country_code: &str, number: &str) -> String {
    let number = number.trim();
    if number.starts_with('+') {
        number.to_string()
    } else {
        format!("{}{}", country_code, number)
    }
}

#[async_trait]
impl<A: TelephonyApi> Notifier for TelephoneNotifier<A> {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn notify(&self, group: &AlertGroup) -> std::result::Result<DeliveryReport, NotifyError> {
        // The call plays a fixed template; alert content is not used.
        debug!(
            alerts = group.alerts.len(),
            group_key = %group.group_key,
            "Dispatching voice notification"
        );

        let access_token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                NOTIFICATIONS_TOTAL.with_label_values(&[CHANNEL, "retry"]).inc();
                error!(error = %e, "Failed to refresh telephony access token");
                return Err(NotifyError::retryable(e));
            }
        };

        let report = self.call_operators(&access_token).await;
        NOTIFICATIONS_TOTAL.with_label_values(&[CHANNEL, "handled"]).inc();
        if report.is_complete() {
            info!(delivered = report.delivered.len(), "Voice notification sent");
        } else {
            warn!(
                attempted = report.attempted(),
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "Voice notification partially delivered"
            );
        }
        Ok(report)
    }
}

impl<A> fmt::Debug for TelephoneNotifier<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephoneNotifier")
            .field("operators", &self.operators)
            .field("country_code", &self.country_code)
            .finish_non_exhaustive()
    }
}
