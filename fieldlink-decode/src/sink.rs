//! Telemetry sinks.
//!
//! A sink receives the JSON body of one decoded reading. [`HttpSink`] POSTs
//! it to the configured URL; [`LogSink`] only logs it, for gateways running
//! without a telemetry endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::info;

use crate::error::SinkError;

/// Outcome of a successful [`TelemetrySink::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The body reached the remote endpoint.
    Posted,
    /// The body was logged locally and not sent anywhere.
    Logged,
}

/// Destination for decoded telemetry.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Publish one JSON body. Never retried.
    async fn publish(&self, body: Vec<u8>) -> Result<Delivery, SinkError>;
}

/// POSTs JSON bodies to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    /// Create a sink posting to `url`, giving up on a request after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    async fn publish(&self, body: Vec<u8>) -> Result<Delivery, SinkError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        // The response body is dropped unread.
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }
        Ok(Delivery::Posted)
    }
}

/// Logs bodies instead of publishing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn publish(&self, body: Vec<u8>) -> Result<Delivery, SinkError> {
        info!(body = %String::from_utf8_lossy(&body), "not posting, no sink url set");
        Ok(Delivery::Logged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sink_never_fails() {
        assert_eq!(
            LogSink.publish(b"{}".to_vec()).await.unwrap(),
            Delivery::Logged
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpSink::new(format!("http://{addr}/ingest"), Duration::from_secs(2)).unwrap();
        let err = sink.publish(b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, SinkError::Connection(_)), "{err}");
    }
}
