//! Network indicator in the header.

use crate::app::App;
use crate::dom;
use alloy_primitives::U64;
use gw_chain_client::Eip1193Provider;
use serde_json::json;
use tracing::warn;

/// Chain the page is talking to: the wallet's when connected, the public
/// RPC's otherwise.
async fn current_chain(app: &App) -> Option<u64> {
    let raw = match app.wallet.provider().filter(|_| app.wallet.is_connected()) {
        Some(provider) => provider.request("eth_chainId", json!([])).await,
        None => app.rpc.request("eth_chainId", json!([])).await,
    };
    match raw {
        Ok(value) => serde_json::from_value::<U64>(value).ok().map(|id| id.to::<u64>()),
        Err(err) => {
            warn!("chain id unavailable from {}: {err}", app.rpc.endpoint());
            None
        }
    }
}

pub async fn refresh(app: &App) {
    let el = &app.els.network_status;
    let target = app.config.target_chain_id();
    match current_chain(app).await {
        Some(chain) if chain == target => {
            dom::set_text(el, &app.config.network.chain_name);
            dom::toggle_class(el, "network-ok", true);
            dom::toggle_class(el, "network-wrong", false);
        }
        Some(chain) => {
            dom::set_text(el, &format!("Wrong network ({chain})"));
            dom::toggle_class(el, "network-ok", false);
            dom::toggle_class(el, "network-wrong", true);
        }
        None => {
            dom::set_text(el, "Network unavailable");
            dom::toggle_class(el, "network-ok", false);
            dom::toggle_class(el, "network-wrong", true);
        }
    }
}
