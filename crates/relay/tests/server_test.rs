use alert_relay::{
    notify::{DeliveryReport, Notifier, NotifyError},
    server::Server,
    AlertGroup, Converter, Error,
};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stands in for a real channel so the router can be tested without a provider.
struct RecordingNotifier {
    calls: AtomicUsize,
    fail_retryable: bool,
}

impl RecordingNotifier {
    fn new(fail_retryable: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_retryable,
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, group: &AlertGroup) -> Result<DeliveryReport, NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_retryable {
            return Err(NotifyError::retryable(Error::Provider {
                status: 500,
                body: "token endpoint down".to_string(),
            }));
        }

        let mut report = DeliveryReport::default();
        for alert in &group.alerts {
            report.record_delivered(alert.generator_url.clone());
        }
        Ok(report)
    }
}

fn test_server(notifier: Option<Arc<dyn Notifier>>) -> axum_test::TestServer {
    let app = Server::new(Converter::default(), notifier).build_router();
    axum_test::TestServer::new(app).unwrap()
}

fn webhook_payload(value: &str) -> serde_json::Value {
    json!({
        "version": "4",
        "groupKey": "{}:{alertname=\"HighLatency\"}",
        "status": "firing",
        "receiver": "ops",
        "groupLabels": { "alertname": "HighLatency" },
        "commonLabels": { "alertname": "HighLatency" },
        "commonAnnotations": {},
        "externalURL": "http://alertmanager:9093",
        "alerts": [{
            "status": "firing",
            "labels": {
                "alertname": "HighLatency",
                "severity": "critical",
                "group": "payments",
                "value": value
            },
            "annotations": { "summary": "p99 above 2s" },
            "startsAt": "2024-05-01T10:00:00Z",
            "generatorURL": "http://prometheus:9090/graph",
            "fingerprint": "1a2b3c"
        }]
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let client = test_server(None);

    let response = client.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_convert_endpoint_returns_documents() {
    let client = test_server(None);

    let response = client.post("/convert").json(&webhook_payload("2.5")).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: serde_json::Value = response.json();
    let documents = body.as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["labels"]["value"], json!(2.5));
    assert_eq!(documents[0]["labels"]["severity"], json!("critical"));
    assert_eq!(documents[0]["annotations"]["summary"], json!("p99 above 2s"));
    assert_eq!(documents[0]["generatorURL"], json!("http://prometheus:9090/graph"));
    assert_eq!(documents[0]["timeout"], json!(false));
}

#[tokio::test]
async fn test_convert_endpoint_rejects_bad_value() {
    let client = test_server(None);

    let response = client.post("/convert").json(&webhook_payload("high")).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Conversion failed");
    assert!(body["message"].as_str().unwrap().contains("high"));
}

#[tokio::test]
async fn test_convert_endpoint_rejects_missing_label() {
    let client = test_server(None);

    let mut payload = webhook_payload("1");
    payload["alerts"][0]["labels"]
        .as_object_mut()
        .unwrap()
        .remove("group");

    let response = client.post("/convert").json(&payload).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("must have a label named group"));
}

#[tokio::test]
async fn test_telephone_webhook_not_configured() {
    let client = test_server(None);

    let response = client
        .post("/webhook/telephone")
        .json(&webhook_payload("1"))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_telephone_webhook_returns_report() {
    let notifier = RecordingNotifier::new(false);
    let client = test_server(Some(notifier.clone()));

    let response = client
        .post("/webhook/telephone")
        .json(&webhook_payload("1"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["delivered"], json!(["http://prometheus:9090/graph"]));
    assert_eq!(body["failed"], json!([]));
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_telephone_webhook_signals_retry() {
    let notifier = RecordingNotifier::new(true);
    let client = test_server(Some(notifier.clone()));

    let response = client
        .post("/webhook/telephone")
        .json(&webhook_payload("1"))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["retryable"], json!(true));
    assert!(body["message"].as_str().unwrap().contains("token endpoint down"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    alert_relay::metrics::register_metrics();
    let client = test_server(None);

    let _ = client.post("/convert").json(&webhook_payload("3")).await;

    let response = client.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("alertrelay_documents_converted_total"));
}
