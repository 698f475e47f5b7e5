//! Wallet session lifecycle: provider discovery, connection, network
//! enforcement and role lookup.

mod injection;
mod web3;

pub use injection::{Injected, InjectionPoint, NAMED_GLOBALS, WalletFlags, select_provider};
pub use web3::Web3Manager;

use alloy_primitives::Address;
use gw_chain_client::{Eip1193Provider, ProviderError, Timer};
use std::rc::Rc;
use thiserror::Error;

/// Browser capabilities the session manager depends on.
pub trait WalletHost {
    type Provider: Eip1193Provider;

    /// The injected provider, if one is present right now.
    fn detect_provider(&self) -> Option<Rc<Self::Provider>>;
    fn is_mobile(&self) -> bool;
    /// Current page URL, used to build the wallet-app deep link.
    fn page_url(&self) -> String;
    fn open_url(&self, url: &str);
    fn timer(&self) -> Rc<dyn Timer>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Probing,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub address: Address,
    pub chain_id: u64,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet provider found; install MetaMask or open this page in a wallet browser")]
    ProviderNotFound,

    #[error("opened the wallet app; retry after returning")]
    OpenedInWalletApp,

    #[error("request rejected in wallet")]
    UserRejected,

    #[error("wallet verification failed: {0}")]
    VerificationFailed(String),

    #[error("wrong network: expected chain {expected}, wallet is on {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    Provider(ProviderError),
}

impl WalletError {
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, WalletError::UserRejected)
    }
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        if err.is_user_rejected() {
            WalletError::UserRejected
        } else {
            WalletError::Provider(err)
        }
    }
}

/// `https://example.org/app?ref=7` → `{prefix}example.org/app?ref=7`.
pub fn wallet_deep_link(prefix: &str, page_url: &str) -> String {
    let target = page_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    format!("{prefix}{target}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_link_strips_scheme() {
        assert_eq!(
            wallet_deep_link("https://metamask.app.link/dapp/", "https://globalway.app/?ref=GW0000007"),
            "https://metamask.app.link/dapp/globalway.app/?ref=GW0000007"
        );
    }

    #[test]
    fn rejection_code_maps_to_user_rejected() {
        let err = WalletError::from(ProviderError::new(4001, "User rejected the request."));
        assert!(err.is_user_rejected());
        assert!(!WalletError::from(ProviderError::internal("boom")).is_user_rejected());
    }
}
