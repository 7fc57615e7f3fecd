use lazy_static::lazy_static;
use prometheus::{core::Collector, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref DOCUMENTS_CONVERTED_TOTAL: IntCounter = register(
        IntCounter::new(
            "alertrelay_documents_converted_total",
            "Total number of alerts converted to index documents."
        )
        .expect("valid metric definition")
    );
    pub static ref CONVERSION_FAILURES_TOTAL: IntCounter = register(
        IntCounter::new(
            "alertrelay_conversion_failures_total",
            "Total number of alerts rejected by validation or numeric parsing."
        )
        .expect("valid metric definition")
    );
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "alertrelay_notifications_total",
                "Total number of notification events by channel and outcome."
            ),
            &["channel", "outcome"]
        )
        .expect("valid metric definition")
    );
    pub static ref DELIVERIES_TOTAL: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "alertrelay_deliveries_total",
                "Total number of per-destination delivery attempts by channel and outcome."
            ),
            &["channel", "outcome"]
        )
        .expect("valid metric definition")
    );
    pub static ref CREDENTIAL_OPERATIONS_TOTAL: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "alertrelay_credential_operations_total",
                "Total number of provider token acquisitions and refreshes by outcome."
            ),
            &["operation", "outcome"]
        )
        .expect("valid metric definition")
    );
}

fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    REGISTRY
        .register(Box::new(collector.clone()))
        .expect("metric registered once");
    collector
}

/// Forces registration of every metric so they show up before first use.
pub fn register_metrics() {
    lazy_static::initialize(&DOCUMENTS_CONVERTED_TOTAL);
    lazy_static::initialize(&CONVERSION_FAILURES_TOTAL);
    lazy_static::initialize(&NOTIFICATIONS_TOTAL);
    lazy_static::initialize(&DELIVERIES_TOTAL);
    lazy_static::initialize(&CREDENTIAL_OPERATIONS_TOTAL);
}

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}
