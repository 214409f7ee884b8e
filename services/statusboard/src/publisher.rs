//! Relays each snapshot to the configured HTTP sink

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::io::HttpClient;
use crate::snapshot::Snapshot;

/// Timeout applied to the sink POST
pub const SINK_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of one publish attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRecord {
    /// Sink URL without the token
    pub url: String,
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub timestamp_utc: DateTime<Utc>,
}

/// Append the token as a query parameter
pub fn sink_url_with_token(url: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}token={}", url, separator, token)
        }
        _ => url.to_string(),
    }
}

/// Posts snapshots to the sink
pub struct SinkPublisher {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for SinkPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkPublisher").finish()
    }
}

impl SinkPublisher {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// POST the snapshot to the sink.
    ///
    /// Returns `None` without touching the network when no sink is configured.
    /// Failures are logged and reported in the record, never returned as errors.
    pub async fn publish(
        &self,
        snapshot: &Snapshot,
        sink_url: Option<&str>,
        sink_token: Option<&str>,
    ) -> Option<PublishRecord> {
        let url = sink_url.filter(|u| !u.is_empty())?;
        let final_url = sink_url_with_token(url, sink_token);

        let record = |success: bool, status: Option<u16>, error: Option<String>| PublishRecord {
            url: url.to_string(),
            success,
            status,
            error,
            timestamp_utc: Utc::now(),
        };

        let body = match serde_json::to_value(snapshot) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to serialize snapshot for sink: {}", e);
                return Some(record(false, None, Some(e.to_string())));
            }
        };

        tracing::debug!("Posting snapshot with {} entries to sink", snapshot.len());

        match self.http.post_json(&final_url, &body, SINK_TIMEOUT).await {
            Ok(response) if response.is_success() => {
                tracing::info!("Posted status data to sink (status {})", response.status);
                Some(record(true, Some(response.status), None))
            }
            Ok(response) => {
                tracing::warn!(
                    "Sink returned status {}: {}",
                    response.status,
                    response.body
                );
                Some(record(
                    false,
                    Some(response.status),
                    Some(format!("Sink returned status {}", response.status)),
                ))
            }
            Err(e) => {
                tracing::warn!("Failed to post status data to sink '{}': {}", url, e);
                Some(record(false, None, Some(e.to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};
    use crate::status::{ProbeResult, StatusLabel, TargetRef};

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.custom_services.push(ProbeResult::new(
            "Database",
            TargetRef::Custom,
            StatusLabel::Operational,
            "Operational",
        ));
        snapshot
    }

    #[test]
    fn token_appended_as_query_parameter() {
        assert_eq!(
            sink_url_with_token("https://sink.example/receive", Some("abc")),
            "https://sink.example/receive?token=abc"
        );
        assert_eq!(
            sink_url_with_token("https://sink.example/receive?site=1", Some("abc")),
            "https://sink.example/receive?site=1&token=abc"
        );
        assert_eq!(
            sink_url_with_token("https://sink.example/receive", None),
            "https://sink.example/receive"
        );
        assert_eq!(
            sink_url_with_token("https://sink.example/receive", Some("")),
            "https://sink.example/receive"
        );
    }

    #[tokio::test]
    async fn no_sink_url_makes_no_calls() {
        let mock = MockHttpClient::new();
        let publisher = SinkPublisher::new(Arc::new(mock));

        assert!(publisher.publish(&snapshot(), None, Some("tok")).await.is_none());
        assert!(publisher.publish(&snapshot(), Some(""), None).await.is_none());
    }

    #[tokio::test]
    async fn posts_snapshot_with_token() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body, timeout| {
                url == "https://sink.example/receive?token=s3cret"
                    && body["custom_services"][0]["label"] == "Database"
                    && *timeout == SINK_TIMEOUT
            })
            .times(1)
            .returning(|_, _, _| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: "Success".to_string(),
                    })
                })
            });

        let publisher = SinkPublisher::new(Arc::new(mock));
        let record = publisher
            .publish(&snapshot(), Some("https://sink.example/receive"), Some("s3cret"))
            .await
            .unwrap();

        assert!(record.success);
        assert_eq!(record.status, Some(200));
        assert_eq!(record.url, "https://sink.example/receive");
    }

    #[tokio::test]
    async fn non_2xx_is_recorded_not_raised() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 403,
                    body: "Error: Invalid secret token.".to_string(),
                })
            })
        });

        let publisher = SinkPublisher::new(Arc::new(mock));
        let record = publisher
            .publish(&snapshot(), Some("https://sink.example"), Some("bad"))
            .await
            .unwrap();

        assert!(!record.success);
        assert_eq!(record.status, Some(403));
        assert!(record.error.unwrap().contains("403"));
    }

    #[tokio::test]
    async fn transport_failure_is_recorded_not_raised() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _, _| {
            Box::pin(async { Err(crate::StatusboardError::Http("timeout".to_string())) })
        });

        let publisher = SinkPublisher::new(Arc::new(mock));
        let record = publisher
            .publish(&snapshot(), Some("https://sink.example"), None)
            .await
            .unwrap();

        assert!(!record.success);
        assert_eq!(record.status, None);
        assert!(record.error.unwrap().contains("timeout"));
    }
}
