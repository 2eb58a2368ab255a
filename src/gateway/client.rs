use crate::config::AppConfig;
use crate::model::{AnalysisRequest, GatewayError, RawResponse};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait MarketGateway: Send + Sync {
    /// `GET /symbols`
    async fn symbols(&self) -> Result<Vec<String>, GatewayError>;

    /// `POST /fetch_data`
    async fn fetch_data(&self, req: &AnalysisRequest) -> Result<RawResponse, GatewayError>;
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(config: &AppConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder().user_agent(concat!("mt5view/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl MarketGateway for GatewayClient {
    async fn symbols(&self) -> Result<Vec<String>, GatewayError> {
        let url = self.build_url("symbols");
        info!("Loading instruments from {}", url);
        let symbols = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<String>>()
            .await?;
        info!("Symbols received: {}", symbols.len());
        Ok(symbols)
    }

    /// Error statuses still carry a JSON body with an `error` entry, so the
    /// body is decoded regardless of status.
    async fn fetch_data(&self, req: &AnalysisRequest) -> Result<RawResponse, GatewayError> {
        let url = self.build_url("fetch_data");
        let response = self.client.post(&url).json(req).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Gateway responded [{}]", status);
        }
        match response.json::<Value>().await? {
            Value::Object(map) => Ok(RawResponse(map)),
            other => Err(GatewayError::InvalidBody(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slashes() {
        let config = AppConfig {
            base_url: "http://127.0.0.1:5001/".into(),
            ..AppConfig::default()
        };
        let client = GatewayClient::new(&config).unwrap();
        assert_eq!(client.build_url("symbols"), "http://127.0.0.1:5001/symbols");
        assert_eq!(client.build_url("/fetch_data"), "http://127.0.0.1:5001/fetch_data");
    }

    #[test]
    fn describes_unexpected_bodies() {
        assert_eq!(json_kind(&serde_json::json!([1])), "an array");
    }
}
