//! Chain access for the dApp: the EIP-1193 request surface, a JSON-RPC
//! transport built on top of it, and an HTTP provider for read-only use.

mod http;
mod rpc;

pub use http::HttpRpcProvider;
pub use rpc::ProviderTransport;

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use gw_api_types::TxHash;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// EIP-1193 / EIP-1474 error codes the dApp reacts to.
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INTERNAL: i64 = -32603;
}

/// Error object returned by a wallet provider or JSON-RPC endpoint.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, message)
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == codes::USER_REJECTED || self.nested_code() == Some(codes::USER_REJECTED)
    }

    /// Wallets report an unknown chain as 4902; some mobile wallets wrap it
    /// in an internal error with the original code under `data`.
    pub fn is_unknown_chain(&self) -> bool {
        self.code == codes::UNRECOGNIZED_CHAIN
            || self.nested_code() == Some(codes::UNRECOGNIZED_CHAIN)
            || self.message.to_ascii_lowercase().contains("unrecognized chain")
    }

    fn nested_code(&self) -> Option<i64> {
        let data = self.data.as_ref()?;
        data.get("originalError")
            .and_then(|original| original.get("code"))
            .or_else(|| data.get("code"))
            .and_then(Value::as_i64)
    }
}

/// The injected-provider request surface (`provider.request({method, params})`).
#[async_trait(?Send)]
pub trait Eip1193Provider {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderError>;
}

#[async_trait(?Send)]
impl<P: Eip1193Provider + ?Sized> Eip1193Provider for std::rc::Rc<P> {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderError> {
        (**self).request(method, params).await
    }
}

/// Suspends the current flow; backed by browser timers in the dApp.
#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to decode {what}: {detail}")]
    Decode { what: &'static str, detail: String },

    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: u64,
}

/// Signer-bound access to the chain used by the contracts layer.
#[async_trait(?Send)]
pub trait ChainTransport {
    /// Address transactions are sent from.
    fn signer(&self) -> Address;
    async fn chain_id(&self) -> Result<u64>;
    async fn balance(&self, address: Address) -> Result<U256>;
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash>;
    /// Waits until the transaction is mined; no timeout.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt>;
}
