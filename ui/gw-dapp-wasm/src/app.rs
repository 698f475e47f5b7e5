//! Concrete manager types for the browser and the handle passed to handlers.

use crate::dom::Elements;
use crate::provider::{BrowserHost, InjectedProvider};
use crate::storage::LocalStore;
use gw_chain_client::{HttpRpcProvider, ProviderTransport};
use gw_config::AppConfig;
use gw_contracts::{AdminManager, ContractsManager};
use gw_registration::RegistrationFlow;
use gw_wallet_core::Web3Manager;
use std::rc::Rc;
use tracing::warn;

pub type Store = Rc<LocalStore>;
pub type Wallet = Web3Manager<BrowserHost, Store>;
pub type Transport = ProviderTransport<InjectedProvider>;
pub type Contracts = ContractsManager<Transport>;

pub struct App {
    pub els: Elements,
    pub config: Rc<AppConfig>,
    pub wallet: Wallet,
    pub contracts: Rc<Contracts>,
    pub registration: RegistrationFlow<Store>,
    /// Public RPC for the network indicator; works without a wallet.
    pub rpc: HttpRpcProvider,
}

impl App {
    pub fn new(els: Elements, config: AppConfig) -> Self {
        let config = Rc::new(config);
        let store = Rc::new(LocalStore);
        let rpc_url = config
            .network
            .rpc_urls
            .first()
            .cloned()
            .unwrap_or_default();
        Self {
            els,
            wallet: Web3Manager::new(config.clone(), BrowserHost, store.clone()),
            contracts: Rc::new(ContractsManager::new(config.clone())),
            registration: RegistrationFlow::new(store),
            rpc: HttpRpcProvider::new(None, &rpc_url),
            config,
        }
    }

    /// Bind contracts to the current wallet session.
    pub fn bind_contracts(&self) -> bool {
        match self.wallet.transport() {
            Some(transport) => {
                let ready = self.contracts.init(transport);
                if !ready {
                    warn!("running with reduced contract set");
                }
                ready
            }
            None => {
                self.contracts.reset();
                false
            }
        }
    }

    pub fn admin(&self) -> AdminManager<Transport> {
        AdminManager::new(self.contracts.clone(), self.wallet.roles())
    }
}

pub fn reload_page() {
    if let Some(window) = web_sys::window() {
        let _ = window.location().reload();
    }
}
