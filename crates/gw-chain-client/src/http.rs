use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::{Eip1193Provider, ProviderError, codes};

/// Methods that need a wallet and cannot be served by a public RPC node.
const WALLET_ONLY_METHODS: [&str; 5] = [
    "eth_requestAccounts",
    "eth_sendTransaction",
    "wallet_switchEthereumChain",
    "wallet_addEthereumChain",
    "personal_sign",
];

/// Read-only JSON-RPC provider over HTTP.
///
/// Reads `GW_RPC_URL` from environment at construction time when no
/// endpoint is given (default: the network's first public RPC URL).
pub struct HttpRpcProvider {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl HttpRpcProvider {
    pub fn new(endpoint: Option<String>, fallback: &str) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("GW_RPC_URL").ok())
            .unwrap_or_else(|| fallback.to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for HttpRpcProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        if WALLET_ONLY_METHODS.contains(&method) {
            return Err(ProviderError::new(
                codes::UNSUPPORTED_METHOD,
                format!("{method} requires a wallet"),
            ));
        }
        if method == "eth_accounts" {
            return Ok(Value::Array(Vec::new()));
        }

        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::internal(format!("{method} transport: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("rpc {method} HTTP {status}: {text}");
            return Err(ProviderError::internal(format!("{method} HTTP {status}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::internal(format!("{method} parse: {err}")))?;

        match (body.result, body.error) {
            (_, Some(error)) => Err(ProviderError {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}
