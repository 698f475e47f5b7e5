use alloy_primitives::{Address, Bytes, U64, U256};
use async_trait::async_trait;
use gw_api_types::TxHash;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

use crate::{ChainError, ChainTransport, Eip1193Provider, Result, Timer, TxReceipt, TxRequest};

/// JSON-RPC transport over any EIP-1193 provider, bound to one signer address.
pub struct ProviderTransport<P> {
    provider: Rc<P>,
    from: Address,
    timer: Rc<dyn Timer>,
    receipt_poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    status: Option<U64>,
    block_number: Option<U64>,
}

impl<P: Eip1193Provider> ProviderTransport<P> {
    pub fn new(
        provider: Rc<P>,
        from: Address,
        timer: Rc<dyn Timer>,
        receipt_poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            from,
            timer,
            receipt_poll_interval,
        }
    }

    pub fn provider(&self) -> &Rc<P> {
        &self.provider
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        what: &'static str,
        method: &str,
        params: Value,
    ) -> Result<T> {
        let value = self.provider.request(method, params).await?;
        serde_json::from_value(value).map_err(|err| ChainError::Decode {
            what,
            detail: err.to_string(),
        })
    }
}

#[async_trait(?Send)]
impl<P: Eip1193Provider> ChainTransport for ProviderTransport<P> {
    fn signer(&self) -> Address {
        self.from
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain_id: U64 = self.request_as("chain id", "eth_chainId", json!([])).await?;
        Ok(chain_id.to::<u64>())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.request_as("balance", "eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let call = json!({ "from": self.from, "to": to, "data": data });
        self.request_as("call result", "eth_call", json!([call, "latest"]))
            .await
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash> {
        let mut request = json!({
            "from": self.from,
            "to": tx.to,
            "data": tx.data,
        });
        if !tx.value.is_zero() {
            request["value"] = json!(tx.value);
        }
        let tx_hash: TxHash = self
            .request_as("transaction hash", "eth_sendTransaction", json!([request]))
            .await?;
        debug!("submitted transaction {tx_hash}");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .request_as("receipt", "eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if let Some(receipt) = receipt {
                if let Some(block_number) = receipt.block_number {
                    let success = receipt.status.map(|s| s == U64::from(1)).unwrap_or(true);
                    if !success {
                        return Err(ChainError::Reverted(receipt.transaction_hash));
                    }
                    return Ok(TxReceipt {
                        tx_hash: receipt.transaction_hash,
                        success,
                        block_number: block_number.to::<u64>(),
                    });
                }
            }

            self.timer.sleep(self.receipt_poll_interval).await;
        }
    }
}
