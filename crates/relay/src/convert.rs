//! Search-index documents for alerts.
//!
//! Index mappings are inferred from the first document that carries a field,
//! so a `value` label that is sometimes a string and sometimes a number breaks
//! ingestion. Converting every label to a number is not an option either:
//! different alerts reuse the same key with different value types. Only the
//! reserved `value` label is coerced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::alert::{Alert, AlertGroup, LabelValue};
use crate::metrics::{CONVERSION_FAILURES_TOTAL, DOCUMENTS_CONVERTED_TOTAL};
use crate::{Error, Result};

pub const LABEL_NAME_VALUE: &str = "value";
pub const LABEL_NAME_SEVERITY: &str = "severity";
pub const LABEL_NAME_GROUP: &str = "group";

pub type AlertLabelSet = BTreeMap<String, LabelValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDocument {
    pub labels: AlertLabelSet,
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub timeout: bool,
}

/// Convert an alert into its index document.
///
/// A `value` label that does not parse as a finite 32-bit float fails the
/// whole conversion.
pub fn convert(alert: &Alert) -> Result<AlertDocument> {
    let mut labels = AlertLabelSet::new();
    for (name, value) in &alert.labels {
        let converted = if name == LABEL_NAME_VALUE {
            LabelValue::Number(parse_numeric(name, value)?)
        } else {
            value.clone()
        };
        labels.insert(name.clone(), converted);
    }

    Ok(AlertDocument {
        labels,
        annotations: alert.annotations.clone(),
        starts_at: alert.starts_at,
        ends_at: alert.ends_at,
        generator_url: alert.generator_url.clone(),
        updated_at: alert.updated_at,
        timeout: alert.timeout,
    })
}

fn parse_numeric(name: &str, value: &LabelValue) -> Result<f64> {
    let text = value.to_string();
    let parsed = text.parse::<f32>().map_err(|e| Error::Parse {
        label: name.to_string(),
        value: text.clone(),
        reason: e.to_string(),
    })?;

    // f32 parsing saturates to infinity instead of failing on overflow
    if !parsed.is_finite() {
        return Err(Error::Parse {
            label: name.to_string(),
            value: text,
            reason: "value out of range".to_string(),
        });
    }

    Ok(f64::from(parsed))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Labels an alert must carry before it is converted.
    #[serde(default = "default_required_labels")]
    pub required_labels: Vec<String>,
}

fn default_required_labels() -> Vec<String> {
    vec![
        LABEL_NAME_VALUE.to_string(),
        LABEL_NAME_SEVERITY.to_string(),
        LABEL_NAME_GROUP.to_string(),
    ]
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            required_labels: default_required_labels(),
        }
    }
}

/// Validates required labels, then converts.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn validate_labels(&self, labels: &BTreeMap<String, LabelValue>) -> Result<()> {
        for name in &self.config.required_labels {
            if !labels.contains_key(name) {
                return Err(Error::Validation(format!(
                    "the alert must have a label named {}",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn convert(&self, alert: &Alert) -> Result<AlertDocument> {
        let result = self
            .validate_labels(&alert.labels)
            .and_then(|_| convert(alert));

        match &result {
            Ok(_) => DOCUMENTS_CONVERTED_TOTAL.inc(),
            Err(e) => {
                debug!(error = %e, "Alert conversion failed");
                CONVERSION_FAILURES_TOTAL.inc();
            }
        }
        result
    }

    /// Converts every alert of the group, stopping at the first failure.
    pub fn convert_group(&self, group: &AlertGroup) -> Result<Vec<AlertDocument>> {
        group.alerts.iter().map(|alert| self.convert(alert)).collect()
    }
}
