//! Pipeline counters and the publish latency histogram.
//!
//! All series live in one [`Registry`] owned by [`FilterMetrics`], which is
//! shared by `Arc` between the pipeline and the `/metrics` endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const PUBLISH_HISTOGRAM: &str = "message_publish_to_kafka";

/// Bucket bounds for publish latency, in microseconds.
pub const PUBLISH_BUCKETS: [f64; 11] = [
    100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 25000.0, 50000.0, 100000.0, 2500000.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    LinesRead,
    LinesParseError,
    LinesParsed,
    LinesSerializeError,
    LinesParsedAndPublished,
    LinesParsedButNotPublished,
    LinesOutputWritten,
    LinesOutputWriteError,
}

impl Counter {
    pub const ALL: [Counter; 8] = [
        Counter::LinesRead,
        Counter::LinesParseError,
        Counter::LinesParsed,
        Counter::LinesSerializeError,
        Counter::LinesParsedAndPublished,
        Counter::LinesParsedButNotPublished,
        Counter::LinesOutputWritten,
        Counter::LinesOutputWriteError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::LinesRead => "lines_read",
            Counter::LinesParseError => "lines_parse_error",
            Counter::LinesParsed => "lines_parsed",
            Counter::LinesSerializeError => "lines_serialize_error",
            Counter::LinesParsedAndPublished => "lines_parsed_and_published",
            Counter::LinesParsedButNotPublished => "lines_parsed_but_not_published",
            Counter::LinesOutputWritten => "lines_output_written",
            Counter::LinesOutputWriteError => "lines_output_write_error",
        }
    }

    fn help(self) -> &'static str {
        match self {
            Counter::LinesRead => "Lines read from input",
            Counter::LinesParseError => "Lines that failed to parse",
            Counter::LinesParsed => "Lines parsed into journal records",
            Counter::LinesSerializeError => "Parsed lines that failed to serialize",
            Counter::LinesParsedAndPublished => "Parsed lines published to the message channel",
            Counter::LinesParsedButNotPublished => "Parsed lines that could not be published",
            Counter::LinesOutputWritten => "Lines written to the output",
            Counter::LinesOutputWriteError => "Lines that failed to write to the output",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Prometheus metrics for the filter.
pub struct FilterMetrics {
    registry: Registry,
    counters: Vec<IntCounter>,
    publish_latency: Histogram,
}

impl FilterMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register every series in `registry`.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let mut counters = Vec::with_capacity(Counter::ALL.len());
        for counter in Counter::ALL {
            let c = IntCounter::new(counter.name(), counter.help())?;
            registry.register(Box::new(c.clone()))?;
            counters.push(c);
        }

        let publish_latency = Histogram::with_opts(
            HistogramOpts::new(
                PUBLISH_HISTOGRAM,
                "Time to publish one message, in microseconds",
            )
            .buckets(PUBLISH_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(publish_latency.clone()))?;

        Ok(Self {
            registry,
            counters,
            publish_latency,
        })
    }

    pub fn incr(&self, counter: Counter) {
        self.counters[counter.index()].inc();
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].get()
    }

    pub fn observe_publish_latency(&self, elapsed: Duration) {
        self.publish_latency.observe(elapsed.as_micros() as f64);
    }

    pub fn publish_latency_count(&self) -> u64 {
        self.publish_latency.get_sample_count()
    }

    /// Render all series in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Bind `addr` (`host:port`, host names resolved) and serve `GET /metrics`
/// in a background task.
///
/// Returns the bound address, which differs from `addr` when port 0 is used.
pub async fn serve_metrics(
    addr: &str,
    metrics: Arc<FilterMetrics>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Metrics endpoint stopped");
        }
    });

    info!(addr = %local_addr, "Serving metrics");
    Ok((local_addr, handle))
}

async fn metrics_handler(State(metrics): State<Arc<FilterMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = FilterMetrics::new().unwrap();
        for counter in Counter::ALL {
            assert_eq!(metrics.get(counter), 0, "{}", counter.name());
        }
    }

    #[test]
    fn test_incr() {
        let metrics = FilterMetrics::new().unwrap();
        metrics.incr(Counter::LinesRead);
        metrics.incr(Counter::LinesRead);
        metrics.incr(Counter::LinesParsed);

        assert_eq!(metrics.get(Counter::LinesRead), 2);
        assert_eq!(metrics.get(Counter::LinesParsed), 1);
        assert_eq!(metrics.get(Counter::LinesParseError), 0);
    }

    #[test]
    fn test_render_contains_all_series() {
        let metrics = FilterMetrics::new().unwrap();
        metrics.observe_publish_latency(Duration::from_micros(300));

        let output = metrics.render().unwrap();
        for counter in Counter::ALL {
            assert!(output.contains(counter.name()), "missing {}", counter.name());
        }
        assert!(output.contains("message_publish_to_kafka_bucket{le=\"500\"} 1"));
        assert!(output.contains("message_publish_to_kafka_bucket{le=\"250\"} 0"));
        assert!(output.contains("message_publish_to_kafka_bucket{le=\"2500000\"} 1"));
        assert!(output.contains("message_publish_to_kafka_count 1"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let _first = FilterMetrics::with_registry(registry.clone()).unwrap();
        assert!(FilterMetrics::with_registry(registry).is_err());
    }

    #[tokio::test]
    async fn test_serve_metrics() {
        let metrics = Arc::new(FilterMetrics::new().unwrap());
        metrics.incr(Counter::LinesRead);

        let (addr, handle) = serve_metrics("127.0.0.1:0", metrics.clone())
            .await
            .unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("lines_read 1"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_serve_metrics_bind_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken = listener.local_addr().unwrap();

        let metrics = Arc::new(FilterMetrics::new().unwrap());
        assert!(serve_metrics(&taken.to_string(), metrics).await.is_err());
    }

    #[tokio::test]
    async fn test_serve_metrics_resolves_host_names() {
        let metrics = Arc::new(FilterMetrics::new().unwrap());
        let (addr, handle) = serve_metrics("localhost:0", metrics).await.unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);

        handle.abort();
    }
}
