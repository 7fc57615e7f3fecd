use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_COUNTRY_CODE: &str = "+86";

#[derive(Clone, Serialize, Deserialize)]
pub struct TelephoneConfig {
    pub app_key: String,
    pub app_secret: String,
    pub username: String,
    /// Static `Authorization` header value sent with the initial login.
    pub authorization: String,
    pub base_url: String,
    /// Caller number shown to the callee.
    pub display_number: String,
    /// Voice template played on the call.
    pub template_id: String,
    /// Phone numbers called for every notification, in order.
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default)]
    pub http: HttpClientConfig,
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

impl fmt::Debug for TelephoneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephoneConfig")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("username", &self.username)
            .field("authorization", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("display_number", &self.display_number)
            .field("template_id", &self.template_id)
            .field("operators", &self.operators)
            .field("country_code", &self.country_code)
            .field("http", &self.http)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Accept invalid TLS certificates from the provider.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            insecure_skip_verify: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_yaml() {
        let yaml = r#"
app_key: key
app_secret: secret
username: alerts
authorization: "WSSE realm=\"SDP\""
base_url: https://rtccall.example.com:8443
display_number: "+862000000000"
template_id: tpl-1
operators: ["13800000001"]
"#;
        let config: TelephoneConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.country_code, "+86");
        assert_eq!(config.http, HttpClientConfig::default());
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert_eq!(config.operators, vec!["13800000001"]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = TelephoneConfig {
            app_key: "key".to_string(),
            app_secret: "very-secret".to_string(),
            username: "alerts".to_string(),
            authorization: "WSSE token".to_string(),
            base_url: String::new(),
            display_number: String::new(),
            template_id: String::new(),
            operators: vec![],
            country_code: default_country_code(),
            http: HttpClientConfig::default(),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("WSSE token"));
        assert!(rendered.contains("<redacted>"));
    }
}
