pub mod alert;
pub mod config;
pub mod convert;
pub mod metrics;
pub mod notify;
pub mod server;

use thiserror::Error;

pub use alert::{Alert, AlertGroup, LabelValue};
pub use convert::{convert, AlertDocument, AlertLabelSet, Converter, ConverterConfig};
pub use notify::{DeliveryReport, Notifier, NotifyError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Parse error: label {label} has non-numeric value {value:?}: {reason}")]
    Parse {
        label: String,
        value: String,
        reason: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider error: the response status code is {status}, and body is {body}")]
    Provider { status: u16, body: String },
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
