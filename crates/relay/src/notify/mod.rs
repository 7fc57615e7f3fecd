//! Notification channels.
//!
//! A channel receives one [`AlertGroup`] per dispatch and reports either a
//! [`DeliveryReport`] or a [`NotifyError`] telling the dispatcher whether the
//! event is worth retrying later.

pub mod telephone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alert::AlertGroup;
use crate::Error;

pub use telephone::TelephoneNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, group: &AlertGroup) -> Result<DeliveryReport, NotifyError>;
}

/// A failed notification event.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct NotifyError {
    retryable: bool,
    source: Error,
}

impl NotifyError {
    pub fn retryable(source: Error) -> Self {
        Self {
            retryable: true,
            source,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelivery {
    pub destination: String,
    pub error: String,
}

/// Per-destination outcome of a handled event.
///
/// A handled event may still contain failed destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
}

impl DeliveryReport {
    pub fn record_delivered(&mut self, destination: impl Into<String>) {
        self.delivered.push(destination.into());
    }

    pub fn record_failed(&mut self, destination: impl Into<String>, error: &Error) {
        self.failed.push(FailedDelivery {
            destination: destination.into(),
            error: error.to_string(),
        });
    }

    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_retry_flag() {
        let err = NotifyError::retryable(Error::Config("down".to_string()));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Configuration error: down");
    }

    #[test]
    fn test_notify_error_exposes_source() {
        let err = NotifyError::retryable(Error::Provider {
            status: 500,
            body: "busy".to_string(),
        });
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Provider error: the response status code is 500, and body is busy")
        );
    }

    #[test]
    fn test_delivery_report_counts() {
        let mut report = DeliveryReport::default();
        assert!(report.is_complete());

        report.record_delivered("+8613800000001");
        report.record_failed("+8613800000002", &Error::Internal("timeout".to_string()));
        assert_eq!(report.attempted(), 2);
        assert!(!report.is_complete());
        assert_eq!(report.failed[0].destination, "+8613800000002");
        assert_eq!(report.failed[0].error, "Internal error: timeout");
    }
}
