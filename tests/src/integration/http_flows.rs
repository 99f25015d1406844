//! # HTTP Flows
//!
//! Each test drives a gateway bound to an ephemeral port:
//!
//! 1. **Happy path**: envelope → route → handler → typed reply
//! 2. **Isolation**: concurrent requests each receive their own reply
//! 3. **Rejections**: wrong method or path, bad envelopes → 400
//! 4. **Routing failures**: unknown key → 404, silent route → 504
//! 5. **Shutdown**: the serve future completes once signalled

#[cfg(test)]
mod tests {
    use crate::integration::TestServer;
    use futures::future::join_all;
    use gateway_runtime::{arithmetic, build_gateway};
    use rpc_gateway::{GatewayBuilder, GatewayConfig, LogLevel, BAD_REQUEST};
    use serde_json::{json, Value};
    use shared_types::{ReplyEnvelope, ServiceDefinition};
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn arithmetic_server(config: GatewayConfig) -> TestServer {
        let gateway = build_gateway(config, arithmetic::definition(), LogLevel::Warn).unwrap();
        TestServer::spawn(gateway).await.unwrap()
    }

    fn envelope(method: &str, args: Value) -> Value {
        json!({"serviceName": "arithmetic", "methodName": method, "args": args})
    }

    async fn post(client: &reqwest::Client, url: &str, body: &Value) -> (u16, String) {
        let response = client.post(url).json(body).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    // =============================================================================
    // HAPPY PATH
    // =============================================================================

    #[tokio::test]
    async fn test_add_over_http() {
        let server = arithmetic_server(GatewayConfig::default()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(server.endpoint_url())
            .json(&envelope("add", json!({"first": 2, "second": 3})))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        assert_eq!(
            response.text().await.unwrap(),
            r#"{"data":{"type":"number","value":5}}"#
        );

        drop(client);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_endpoint() {
        let mut config = GatewayConfig::default();
        config.http.endpoint = "/rpc".into();
        let server = arithmetic_server(config).await;
        let client = reqwest::Client::new();

        let body = envelope("subtract", json!({"first": 10, "second": 4}));
        let (status, text) = post(&client, &server.url("/rpc"), &body).await;
        assert_eq!(status, 200);
        assert_eq!(text, r#"{"data":{"type":"number","value":6}}"#);

        let (status, _) = post(&client, &server.url("/messages"), &body).await;
        assert_eq!(status, 400);
    }

    // =============================================================================
    // ISOLATION
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_get_their_own_replies() {
        let server = arithmetic_server(GatewayConfig::default()).await;
        let client = reqwest::Client::new();
        let url = server.endpoint_url();

        // Alternate between two dispatch keys so replies for different routes interleave.
        let requests = (0..32i64).map(|i| {
            let client = client.clone();
            let url = url.clone();
            let (method, expected) = if i % 2 == 0 {
                ("add", i + 1000)
            } else {
                ("subtract", i - 1000)
            };
            async move {
                let body = envelope(method, json!({"first": i, "second": 1000}));
                let (status, text) = post(&client, &url, &body).await;
                (expected, status, text)
            }
        });

        for (expected, status, text) in join_all(requests).await {
            assert_eq!(status, 200);
            let reply: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(reply["data"]["value"], json!(expected));
        }

        drop(client);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_next_request() {
        let server = arithmetic_server(GatewayConfig::default()).await;
        let client = reqwest::Client::new();
        let url = server.endpoint_url();

        let overflow = envelope("add", json!({"first": i64::MAX, "second": 1}));
        let (status, text) = post(&client, &url, &overflow).await;
        assert_eq!(status, 500);
        assert_eq!(text, ReplyEnvelope::INTERNAL_ERROR);

        let ok = envelope("add", json!({"first": 1, "second": 1}));
        let (status, _) = post(&client, &url, &ok).await;
        assert_eq!(status, 200);
    }

    // =============================================================================
    // REJECTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_rejections_are_bad_request() {
        let server = arithmetic_server(GatewayConfig::default()).await;
        let client = reqwest::Client::new();

        let get = client.get(server.endpoint_url()).send().await.unwrap();
        assert_eq!(get.status().as_u16(), 400);
        assert_eq!(get.text().await.unwrap(), BAD_REQUEST);

        let malformed = client
            .post(server.endpoint_url())
            .body("{\"serviceName\":")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status().as_u16(), 400);

        let missing_args = json!({"serviceName": "arithmetic", "methodName": "add"});
        let (status, text) = post(&client, &server.endpoint_url(), &missing_args).await;
        assert_eq!(status, 400);
        assert_eq!(text, BAD_REQUEST);
    }

    // =============================================================================
    // ROUTING FAILURES
    // =============================================================================

    #[tokio::test]
    async fn test_unknown_method_is_not_found() {
        let server = arithmetic_server(GatewayConfig::default()).await;
        let client = reqwest::Client::new();

        let (status, text) = post(
            &client,
            &server.endpoint_url(),
            &envelope("divide", json!({"first": 1, "second": 2})),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(text, ReplyEnvelope::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_silent_route_times_out() {
        let mut config = GatewayConfig::default();
        config.timeouts.reply = Duration::from_millis(100);
        let definition = ServiceDefinition::from_json(
            r#"{"clock": {"methods": {"tick": {"params": {}, "returnInfo": {"type": "number"}}}}}"#,
        )
        .unwrap();

        let gateway = GatewayBuilder::new(config, definition).build().unwrap();
        // Undeclared key with a subscriber that never replies.
        let _silent = gateway.bus().subscribe("clock_wait", |_| {});
        let metrics = gateway.metrics();
        let server = TestServer::spawn(gateway).await.unwrap();
        let client = reqwest::Client::new();

        let body = json!({"serviceName": "clock", "methodName": "wait", "args": {}});
        let (status, text) = post(&client, &server.endpoint_url(), &body).await;
        assert_eq!(status, 504);
        assert_eq!(text, ReplyEnvelope::GATEWAY_TIMEOUT);

        let body = json!({"serviceName": "clock", "methodName": "tick", "args": {}});
        let (status, text) = post(&client, &server.endpoint_url(), &body).await;
        assert_eq!(status, 501);
        assert_eq!(text, ReplyEnvelope::NOT_IMPLEMENTED);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.not_implemented, 1);
    }

    // =============================================================================
    // SHUTDOWN
    // =============================================================================

    #[tokio::test]
    async fn test_stop_completes_serve() {
        let server = arithmetic_server(GatewayConfig::default()).await;
        let addr = server.addr;
        tokio::time::timeout(Duration::from_secs(5), server.stop())
            .await
            .unwrap()
            .unwrap();

        let client = reqwest::Client::new();
        let result = client
            .post(format!("http://{addr}/messages"))
            .json(&envelope("add", json!({"first": 1, "second": 1})))
            .send()
            .await;
        assert!(result.is_err());
    }
}
