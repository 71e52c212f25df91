use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::WebhookConfig;
use crate::payload::OutboundPayload;
use crate::routing::Destination;

/// One delivery attempt of a payload to a destination.
///
/// `Ok` carries the status of whatever response came back; `Err` means no
/// response arrived (connection failure, timeout).
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(
        &self,
        destination: Destination,
        payload: &OutboundPayload,
    ) -> Result<StatusCode>;
}

/// HTTP client posting payloads to the configured workflow webhooks.
pub struct WebhookClient {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookClient {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Delivery for WebhookClient {
    async fn deliver(
        &self,
        destination: Destination,
        payload: &OutboundPayload,
    ) -> Result<StatusCode> {
        let url = self.config.url_for(destination);

        debug!(
            "Posting {} payload to {} webhook: {}",
            payload.command_type, destination, url
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} webhook", destination))?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::IncomingMessage;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(String, HeaderMap, Value)>>>,
    }

    fn record(captured: &Captured, path: &str, headers: HeaderMap, body: Value) -> StatusCode {
        captured
            .requests
            .lock()
            .unwrap()
            .push((path.to_string(), headers, body));
        StatusCode::OK
    }

    async fn input_hook(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        record(&captured, "input", headers, body)
    }

    async fn query_hook(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        record(&captured, "query", headers, body)
    }

    async fn serve(captured: Captured) -> String {
        let app = Router::new()
            .route("/input", post(input_hook))
            .route("/query", post(query_hook))
            .route(
                "/broken",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route(
                "/slow",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    StatusCode::OK
                }),
            )
            .with_state(captured);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}", addr)
    }

    fn config(base: &str, input: &str, query: &str) -> WebhookConfig {
        WebhookConfig {
            input_url: format!("{}/{}", base, input),
            query_url: format!("{}/{}", base, query),
            ..WebhookConfig::default()
        }
    }

    fn payload(command_type: &str) -> OutboundPayload {
        OutboundPayload::build(
            &IncomingMessage::sample("!save milk"),
            command_type,
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_posts_json_to_destination_url() {
        let captured = Captured::default();
        let base = serve(captured.clone()).await;
        let client = WebhookClient::new(config(&base, "input", "query")).unwrap();

        let status = client
            .deliver(Destination::Input, &payload("save"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);

        let status = client
            .deliver(Destination::Query, &payload("ask"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);

        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);

        let (path, headers, body) = &requests[0];
        assert_eq!(path, "input");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["user-agent"], "SecondBrain-Discord-Bot/1.0");
        assert_eq!(body["commandType"], "save");
        assert_eq!(body["content"], "!save milk");

        let (path, _, body) = &requests[1];
        assert_eq!(path, "query");
        assert_eq!(body["commandType"], "ask");
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let base = serve(Captured::default()).await;
        let client = WebhookClient::new(config(&base, "broken", "broken")).unwrap();

        let status = client
            .deliver(Destination::Input, &payload("save"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            WebhookClient::new(config(&format!("http://{}", addr), "input", "query")).unwrap();
        let result = client.deliver(Destination::Input, &payload("save")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let base = serve(Captured::default()).await;
        let mut cfg = config(&base, "slow", "slow");
        cfg.timeout_secs = 1;
        let client = WebhookClient::new(cfg).unwrap();

        let result = client.deliver(Destination::Query, &payload("ask")).await;
        assert!(result.is_err());
    }
}
