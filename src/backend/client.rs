//! HTTP relay to the backend's `/calculate` endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{Error, Result};

/// Payload forwarded to the backend. `params` and `vals` are passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculateRequest {
    pub formula: String,
    pub params: JsonValue,
    pub vals: JsonValue,
}

/// Client for the backend's HTTP API
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    calculate_url: String,
}

impl BackendClient {
    pub fn new(calculate_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            calculate_url: calculate_url.into(),
        }
    }

    pub fn calculate_url(&self) -> &str {
        &self.calculate_url
    }

    /// Forward a request and return the backend's JSON body verbatim.
    ///
    /// Errors reported by the backend inside a JSON body are returned as-is;
    /// only transport failures and non-JSON bodies become `Err`.
    pub async fn calculate(&self, request: &CalculateRequest) -> Result<JsonValue> {
        match self.post_calculate(request).await {
            Ok(body) => Ok(body),
            Err(e) => {
                tracing::error!("Calculate request to {} failed: {}", self.calculate_url, e);
                Err(e)
            }
        }
    }

    async fn post_calculate(&self, request: &CalculateRequest) -> Result<JsonValue> {
        tracing::debug!("POST {} formula={:?}", self.calculate_url, request.formula);

        let response = self
            .http
            .post(&self.calculate_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Backend responded with status {}", status);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::InvalidResponse(format!("status {}, body is not JSON: {}", status, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn sample_request() -> CalculateRequest {
        CalculateRequest {
            formula: "a+b".to_string(),
            params: json!({"a": 1, "b": 2}),
            vals: json!({}),
        }
    }

    #[test]
    fn test_request_serializes_inputs_unmodified() {
        let body = serde_json::to_value(sample_request()).unwrap();
        assert_eq!(
            body,
            json!({"formula": "a+b", "params": {"a": 1, "b": 2}, "vals": {}})
        );
    }

    #[tokio::test]
    async fn test_calculate_relays_body_and_returns_response() {
        let server = MockServer::start_async().await;

        let calc_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/calculate")
                    .header("content-type", "application/json")
                    .json_body(json!({"formula": "a+b", "params": {"a": 1, "b": 2}, "vals": {}}));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({"result": 3}));
            })
            .await;

        let client = BackendClient::new(server.url("/calculate"));
        let result = client.calculate(&sample_request()).await.unwrap();

        calc_mock.assert_async().await;
        assert_eq!(result, json!({"result": 3}));
    }

    #[tokio::test]
    async fn test_opaque_payload_shapes_pass_through() {
        let server = MockServer::start_async().await;
        let request = CalculateRequest {
            formula: " x**2 + y ".to_string(),
            params: json!(["x", "y"]),
            vals: json!("x=2, y=3"),
        };

        let calc_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/calculate")
                    .json_body(json!({"formula": " x**2 + y ", "params": ["x", "y"], "vals": "x=2, y=3"}));
                then.status(200).json_body(json!({"result": "7.00000000000000"}));
            })
            .await;

        let client = BackendClient::new(server.url("/calculate"));
        let result = client.calculate(&request).await.unwrap();

        calc_mock.assert_async().await;
        assert_eq!(result["result"], json!("7.00000000000000"));
    }

    #[tokio::test]
    async fn test_backend_error_body_is_passed_through() {
        let server = MockServer::start_async().await;
        let error_body = json!({"error": "Invalid params format. Expected a list."});

        server
            .mock_async(|when, then| {
                when.method(POST).path("/calculate");
                then.status(400).json_body(error_body.clone());
            })
            .await;

        let client = BackendClient::new(server.url("/calculate"));
        let result = client.calculate(&sample_request()).await.unwrap();

        assert_eq!(result, error_body);
    }

    #[tokio::test]
    async fn test_non_json_response_is_rejected() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/calculate");
                then.status(500).body("<html>Internal Server Error</html>");
            })
            .await;

        let client = BackendClient::new(server.url("/calculate"));
        let result = client.calculate(&sample_request()).await;

        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_rejected() {
        // Grab a free port, then release it so nothing is listening there
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = BackendClient::new(format!("http://127.0.0.1:{}/calculate", port));
        let result = client.calculate(&sample_request()).await;

        assert!(matches!(result, Err(Error::Http(_))));
    }
}
