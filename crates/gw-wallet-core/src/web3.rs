use alloy_primitives::utils::format_ether;
use alloy_primitives::{Address, U64};
use gw_api_types::format::trim_decimal;
use gw_api_types::{RoleSet, SessionChange};
use gw_chain_client::{ChainTransport, Eip1193Provider, ProviderError, ProviderTransport};
use gw_config::{AppConfig, parse_address_any_case};
use gw_storage::{KeyValueStore, SessionStore};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{ConnectionState, Session, WalletError, WalletHost, wallet_deep_link};

type Transport<H> = ProviderTransport<<H as WalletHost>::Provider>;

/// Sleeps between the first and last detection attempt.
fn discovery_polls(timeout: Duration, poll: Duration) -> u128 {
    timeout.as_millis() / poll.as_millis().max(1)
}

struct Connected<H: WalletHost> {
    session: Session,
    transport: Rc<Transport<H>>,
}

/// Owns the wallet session. All methods take `&self`; no borrow is held
/// across an await point.
pub struct Web3Manager<H: WalletHost, S> {
    config: Rc<AppConfig>,
    host: H,
    store: SessionStore<S>,
    state: Cell<ConnectionState>,
    provider: RefCell<Option<Rc<H::Provider>>>,
    connected: RefCell<Option<Connected<H>>>,
    subscribed: Cell<bool>,
}

impl<H: WalletHost, S: KeyValueStore> Web3Manager<H, S> {
    pub fn new(config: Rc<AppConfig>, host: H, store: S) -> Self {
        Self {
            config,
            host,
            store: SessionStore::new(store),
            state: Cell::new(ConnectionState::Disconnected),
            provider: RefCell::new(None),
            connected: RefCell::new(None),
            subscribed: Cell::new(false),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state.get() == ConnectionState::Connected
    }

    pub fn session(&self) -> Option<Session> {
        self.connected.borrow().as_ref().map(|c| c.session)
    }

    pub fn address(&self) -> Option<Address> {
        self.session().map(|s| s.address)
    }

    /// Signer-bound transport for the contracts layer.
    pub fn transport(&self) -> Option<Rc<Transport<H>>> {
        self.connected.borrow().as_ref().map(|c| c.transport.clone())
    }

    /// The provider found by the last successful discovery.
    pub fn provider(&self) -> Option<Rc<H::Provider>> {
        self.provider.borrow().clone()
    }

    /// The discovered provider, handed out once so account and chain
    /// listeners are attached exactly once, whichever of `init` or
    /// `connect` found it.
    pub fn provider_for_events(&self) -> Option<Rc<H::Provider>> {
        if self.subscribed.get() {
            return None;
        }
        let provider = self.provider()?;
        self.subscribed.set(true);
        Some(provider)
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    /// Poll the host for an injected provider until `timeout` elapses.
    pub async fn discover_provider(&self, timeout: Duration) -> Option<Rc<H::Provider>> {
        if let Some(provider) = self.provider() {
            return Some(provider);
        }

        let poll = self.config.discovery.poll_interval().max(Duration::from_millis(1));
        let polls = discovery_polls(timeout, poll);
        let timer = self.host.timer();
        for attempt in 0..=polls {
            if let Some(provider) = self.host.detect_provider() {
                debug!("wallet provider detected after {attempt} polls");
                *self.provider.borrow_mut() = Some(provider.clone());
                return Some(provider);
            }
            if attempt < polls {
                timer.sleep(poll).await;
            }
        }
        debug!("no wallet provider after {timeout:?}");
        None
    }

    /// Cold start: discover the provider, then restore a previous session
    /// without prompting.
    pub async fn init(&self) -> Option<Address> {
        if self
            .discover_provider(self.config.discovery.init_timeout())
            .await
            .is_none()
        {
            info!("no wallet provider on startup");
            return None;
        }
        self.auto_connect().await
    }

    pub async fn connect(&self) -> Result<Address, WalletError> {
        self.state.set(ConnectionState::Probing);
        match self.try_connect().await {
            Ok(address) => {
                self.state.set(ConnectionState::Connected);
                info!("wallet connected: {address}");
                Ok(address)
            }
            Err(err) => {
                self.connected.borrow_mut().take();
                self.state.set(ConnectionState::Disconnected);
                if err.is_user_rejected() {
                    info!("wallet connection rejected by user");
                } else {
                    warn!("wallet connection failed: {err}");
                }
                Err(err)
            }
        }
    }

    async fn try_connect(&self) -> Result<Address, WalletError> {
        let Some(provider) = self
            .discover_provider(self.config.discovery.connect_timeout())
            .await
        else {
            if self.host.is_mobile() {
                let link = wallet_deep_link(&self.config.wallet_deep_link, &self.host.page_url());
                info!("no injected provider on mobile; opening {link}");
                self.host.open_url(&link);
                return Err(WalletError::OpenedInWalletApp);
            }
            return Err(WalletError::ProviderNotFound);
        };

        let requested = request_accounts(&*provider, "eth_requestAccounts").await?;
        let Some(address) = requested.first().copied() else {
            return Err(WalletError::VerificationFailed("wallet returned no accounts".into()));
        };

        let chain_id = self.ensure_network(&provider).await?;

        let authorized = request_accounts(&*provider, "eth_accounts").await?;
        if !authorized.contains(&address) {
            return Err(WalletError::VerificationFailed(format!(
                "{address} is not an authorized signer"
            )));
        }

        self.establish(provider, address, chain_id);
        if let Err(err) = self.store.save_wallet(&address.to_string()) {
            warn!("failed to persist wallet session: {err}");
        }
        Ok(address)
    }

    /// Make sure the wallet is on the target chain. Issues at most one
    /// switch request, adding the chain first if the wallet does not know it.
    pub async fn ensure_network(&self, provider: &H::Provider) -> Result<u64, WalletError> {
        let target = self.config.target_chain_id();
        let current = read_chain_id(provider).await?;
        if current == target {
            return Ok(current);
        }

        info!("switching wallet network from {current} to {target}");
        let switch_params = json!([{ "chainId": self.config.network.chain_id_hex() }]);
        match provider
            .request("wallet_switchEthereumChain", switch_params.clone())
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_user_rejected() => return Err(WalletError::UserRejected),
            Err(err) if err.is_unknown_chain() => {
                info!("wallet does not know chain {target}; adding it");
                let params = json!([self.config.network.add_chain_params()]);
                provider.request("wallet_addEthereumChain", params).await?;
                provider
                    .request("wallet_switchEthereumChain", switch_params)
                    .await?;
            }
            Err(err) => return Err(err.into()),
        }

        let actual = read_chain_id(provider).await?;
        if actual != target {
            return Err(WalletError::NetworkMismatch {
                expected: target,
                actual,
            });
        }
        Ok(actual)
    }

    /// Restore the stored session when the wallet still authorizes that
    /// address and is already on the target chain. Never prompts.
    pub async fn auto_connect(&self) -> Option<Address> {
        let stored = self.store.connected_wallet()?;
        let Some(stored) = parse_address_any_case(&stored) else {
            warn!("discarding malformed stored wallet address");
            self.store.clear_wallet();
            return None;
        };
        let provider = self.provider()?;

        let authorized = match request_accounts(&*provider, "eth_accounts").await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!("auto-connect skipped: {err}");
                return None;
            }
        };
        if !authorized.contains(&stored) {
            info!("stored wallet {stored} is no longer authorized");
            self.store.clear_wallet();
            return None;
        }

        let chain_id = match read_chain_id(&*provider).await {
            Ok(chain_id) => chain_id,
            Err(err) => {
                warn!("auto-connect skipped: {err}");
                return None;
            }
        };
        if chain_id != self.config.target_chain_id() {
            info!("wallet on chain {chain_id}; waiting for an explicit connect");
            return None;
        }

        self.establish(provider, stored, chain_id);
        self.state.set(ConnectionState::Connected);
        info!("wallet session restored: {stored}");
        Some(stored)
    }

    fn establish(&self, provider: Rc<H::Provider>, address: Address, chain_id: u64) {
        let transport = Rc::new(ProviderTransport::new(
            provider,
            address,
            self.host.timer(),
            Duration::from_millis(self.config.receipt_poll_interval_ms),
        ));
        *self.connected.borrow_mut() = Some(Connected {
            session: Session { address, chain_id },
            transport,
        });
    }

    pub fn disconnect(&self) {
        self.connected.borrow_mut().take();
        self.store.clear_wallet();
        self.state.set(ConnectionState::Disconnected);
        info!("wallet disconnected");
    }

    pub fn on_accounts_changed(&self, accounts: &[String]) -> SessionChange {
        if accounts.is_empty() {
            self.disconnect();
            SessionChange::DisconnectAndReload
        } else {
            debug!("accounts changed; reloading");
            SessionChange::Reload
        }
    }

    pub fn on_chain_changed(&self, chain_id: &str) -> SessionChange {
        debug!("chain changed to {chain_id}; reloading");
        SessionChange::Reload
    }

    pub fn is_owner(&self) -> bool {
        self.address().is_some_and(|a| self.config.is_owner(&a))
    }

    pub fn is_founder(&self) -> bool {
        self.address().is_some_and(|a| self.config.is_founder(&a))
    }

    pub fn is_board(&self) -> bool {
        self.address().is_some_and(|a| self.config.is_board(&a))
    }

    pub fn roles(&self) -> RoleSet {
        self.address()
            .map(|a| self.config.roles_for(&a))
            .unwrap_or_default()
    }

    /// BNB balance of the connected wallet; `"0"` when unknown.
    pub async fn native_balance(&self) -> String {
        let Some(transport) = self.transport() else {
            return "0".to_string();
        };
        match transport.balance(transport.signer()).await {
            Ok(balance) => trim_decimal(&format_ether(balance), 18),
            Err(err) => {
                warn!("balance unavailable: {err}");
                "0".to_string()
            }
        }
    }
}

async fn read_chain_id<P: Eip1193Provider + ?Sized>(provider: &P) -> Result<u64, WalletError> {
    let raw = provider.request("eth_chainId", json!([])).await?;
    serde_json::from_value::<U64>(raw)
        .map(|id| id.to::<u64>())
        .map_err(|err| ProviderError::internal(format!("malformed chain id: {err}")).into())
}

async fn request_accounts<P: Eip1193Provider + ?Sized>(
    provider: &P,
    method: &str,
) -> Result<Vec<Address>, WalletError> {
    let raw = provider.request(method, json!([])).await?;
    let Value::Array(items) = raw else {
        return Err(WalletError::VerificationFailed(format!("{method} returned no account list")));
    };
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(parse_address_any_case)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gw_chain_client::{Timer, codes};
    use gw_storage::{InMemoryStore, WALLET_ADDRESS_KEY, WALLET_CONNECTED_KEY};

    const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

    struct MockProvider {
        chain_id: Cell<u64>,
        known_chains: RefCell<Vec<u64>>,
        accounts: Vec<String>,
        authorized: RefCell<Vec<String>>,
        reject_accounts: bool,
        wrap_unknown_chain: bool,
        calls: RefCell<Vec<String>>,
    }

    impl MockProvider {
        fn on_chain(chain_id: u64) -> Self {
            Self {
                chain_id: Cell::new(chain_id),
                known_chains: RefCell::new(vec![56, 204]),
                accounts: vec![ACCOUNT.to_string()],
                authorized: RefCell::new(Vec::new()),
                reject_accounts: false,
                wrap_unknown_chain: false,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn count(&self, method: &str) -> usize {
            self.calls.borrow().iter().filter(|m| m.as_str() == method).count()
        }
    }

    #[async_trait(?Send)]
    impl Eip1193Provider for MockProvider {
        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
            self.calls.borrow_mut().push(method.to_string());
            match method {
                "eth_requestAccounts" => {
                    if self.reject_accounts {
                        return Err(ProviderError::new(codes::USER_REJECTED, "User rejected the request."));
                    }
                    *self.authorized.borrow_mut() = self.accounts.clone();
                    Ok(json!(self.accounts))
                }
                "eth_accounts" => Ok(json!(*self.authorized.borrow())),
                "eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id.get()))),
                "wallet_switchEthereumChain" => {
                    let hex = params[0]["chainId"].as_str().unwrap_or_default();
                    let target = u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap_or(0);
                    if !self.known_chains.borrow().contains(&target) {
                        if self.wrap_unknown_chain {
                            return Err(ProviderError {
                                code: codes::INTERNAL,
                                message: "Internal error".into(),
                                data: Some(json!({ "originalError": { "code": 4902 } })),
                            });
                        }
                        return Err(ProviderError::new(codes::UNRECOGNIZED_CHAIN, "Unrecognized chain ID"));
                    }
                    self.chain_id.set(target);
                    Ok(Value::Null)
                }
                "wallet_addEthereumChain" => {
                    assert_eq!(params[0]["chainName"], "opBNB Mainnet");
                    assert!(params[0]["rpcUrls"].as_array().is_some_and(|urls| !urls.is_empty()));
                    self.known_chains.borrow_mut().push(204);
                    Ok(Value::Null)
                }
                "eth_getBalance" => Ok(json!("0x14d1120d7b160000")),
                other => Err(ProviderError::new(codes::UNSUPPORTED_METHOD, other)),
            }
        }
    }

    struct InstantTimer;

    #[async_trait(?Send)]
    impl Timer for InstantTimer {
        async fn sleep(&self, _duration: Duration) {}
    }

    struct MockHost {
        provider: Option<Rc<MockProvider>>,
        appears_after_polls: Cell<u32>,
        mobile: bool,
        opened: RefCell<Vec<String>>,
    }

    impl MockHost {
        fn with(provider: MockProvider) -> Self {
            Self {
                provider: Some(Rc::new(provider)),
                appears_after_polls: Cell::new(0),
                mobile: false,
                opened: RefCell::new(Vec::new()),
            }
        }

        fn empty(mobile: bool) -> Self {
            Self {
                provider: None,
                appears_after_polls: Cell::new(0),
                mobile,
                opened: RefCell::new(Vec::new()),
            }
        }
    }

    impl WalletHost for MockHost {
        type Provider = MockProvider;

        fn detect_provider(&self) -> Option<Rc<MockProvider>> {
            let remaining = self.appears_after_polls.get();
            if remaining > 0 {
                self.appears_after_polls.set(remaining - 1);
                return None;
            }
            self.provider.clone()
        }

        fn is_mobile(&self) -> bool {
            self.mobile
        }

        fn page_url(&self) -> String {
            "https://globalway.app/".to_string()
        }

        fn open_url(&self, url: &str) {
            self.opened.borrow_mut().push(url.to_string());
        }

        fn timer(&self) -> Rc<dyn Timer> {
            Rc::new(InstantTimer)
        }
    }

    fn manager(host: MockHost) -> Web3Manager<MockHost, Rc<InMemoryStore>> {
        manager_with_store(host, Rc::new(InMemoryStore::default()))
    }

    fn manager_with_store(host: MockHost, store: Rc<InMemoryStore>) -> Web3Manager<MockHost, Rc<InMemoryStore>> {
        Web3Manager::new(Rc::new(AppConfig::opbnb()), host, store)
    }

    fn provider_of(manager: &Web3Manager<MockHost, Rc<InMemoryStore>>) -> Rc<MockProvider> {
        manager.provider().expect("provider discovered")
    }

    #[tokio::test]
    async fn connect_switches_network_exactly_once() -> anyhow::Result<()> {
        let manager = manager(MockHost::with(MockProvider::on_chain(56)));

        let address = manager.connect().await?;
        assert_eq!(address, parse_address_any_case(ACCOUNT).unwrap());
        assert!(manager.is_connected());
        assert_eq!(manager.session().map(|s| s.chain_id), Some(204));

        let provider = provider_of(&manager);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 1);
        assert_eq!(provider.count("wallet_addEthereumChain"), 0);
        assert_eq!(manager.store().connected_wallet(), Some(address.to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_chain_is_added_then_switched() -> anyhow::Result<()> {
        let provider = MockProvider::on_chain(1);
        provider.known_chains.borrow_mut().retain(|id| *id != 204);
        let manager = manager(MockHost::with(provider));

        manager.connect().await?;
        let provider = provider_of(&manager);
        assert_eq!(provider.count("wallet_addEthereumChain"), 1);
        assert_eq!(provider.count("wallet_switchEthereumChain"), 2);
        assert_eq!(provider.chain_id.get(), 204);
        Ok(())
    }

    #[tokio::test]
    async fn wrapped_unknown_chain_error_is_recognized() -> anyhow::Result<()> {
        let mut provider = MockProvider::on_chain(1);
        provider.known_chains.borrow_mut().retain(|id| *id != 204);
        provider.wrap_unknown_chain = true;
        let manager = manager(MockHost::with(provider));

        manager.connect().await?;
        assert_eq!(provider_of(&manager).count("wallet_addEthereumChain"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_connect_leaves_no_session() {
        let mut provider = MockProvider::on_chain(204);
        provider.reject_accounts = true;
        let manager = manager(MockHost::with(provider));

        let err = manager.connect().await.unwrap_err();
        assert!(err.is_user_rejected());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.session().is_none());
        assert!(manager.transport().is_none());
        assert!(manager.store().connected_wallet().is_none());
    }

    #[tokio::test]
    async fn missing_provider_on_desktop_and_mobile() {
        let desktop = manager(MockHost::empty(false));
        assert!(matches!(desktop.connect().await, Err(WalletError::ProviderNotFound)));

        let mobile = manager(MockHost::empty(true));
        assert!(matches!(mobile.connect().await, Err(WalletError::OpenedInWalletApp)));
        assert_eq!(
            mobile.host.opened.borrow().as_slice(),
            ["https://metamask.app.link/dapp/globalway.app/"]
        );
    }

    #[tokio::test]
    async fn discovery_polls_until_provider_appears() {
        let host = MockHost::with(MockProvider::on_chain(204));
        host.appears_after_polls.set(5);
        let manager = manager(host);

        assert!(manager.discover_provider(Duration::from_secs(5)).await.is_some());
    }

    #[tokio::test]
    async fn discovery_is_bounded() {
        let host = MockHost::with(MockProvider::on_chain(204));
        host.appears_after_polls.set(1_000);
        let manager = manager(host);

        assert!(manager.discover_provider(Duration::from_millis(500)).await.is_none());
        assert_eq!(manager.host.appears_after_polls.get(), 1_000 - 6);
    }

    #[tokio::test]
    async fn discovery_gives_up_with_zero_poll_interval() {
        let mut config = AppConfig::opbnb();
        config.discovery.poll_interval_ms = 0;
        let host = MockHost::with(MockProvider::on_chain(204));
        host.appears_after_polls.set(u32::MAX);
        let manager = Web3Manager::new(Rc::new(config), host, Rc::new(InMemoryStore::default()));

        assert!(manager.discover_provider(Duration::from_millis(50)).await.is_none());
        assert_eq!(manager.host.appears_after_polls.get(), u32::MAX - 51);
    }

    #[test]
    fn discovery_poll_count_follows_timeout() {
        assert_eq!(discovery_polls(Duration::from_secs(5), Duration::from_millis(100)), 50);
        assert_eq!(discovery_polls(Duration::from_millis(50), Duration::ZERO), 50);
        assert_eq!(discovery_polls(Duration::ZERO, Duration::from_millis(100)), 0);
    }

    #[tokio::test]
    async fn event_provider_is_handed_out_once_after_late_discovery() -> anyhow::Result<()> {
        let host = MockHost::with(MockProvider::on_chain(204));
        host.appears_after_polls.set(u32::MAX);
        let manager = manager(host);

        assert!(manager.init().await.is_none());
        assert!(manager.provider_for_events().is_none());

        manager.host.appears_after_polls.set(3);
        manager.connect().await?;
        assert!(manager.provider_for_events().is_some());
        assert!(manager.provider_for_events().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn auto_connect_restores_authorized_session() {
        let store = Rc::new(InMemoryStore::default());
        store.set(WALLET_ADDRESS_KEY, &ACCOUNT.to_uppercase().replace("0X", "0x")).unwrap();
        store.set(WALLET_CONNECTED_KEY, "true").unwrap();

        let provider = MockProvider::on_chain(204);
        *provider.authorized.borrow_mut() = vec![ACCOUNT.to_string()];
        let manager = manager_with_store(MockHost::with(provider), store);

        assert!(manager.init().await.is_some());
        assert!(manager.is_connected());
        assert_eq!(provider_of(&manager).count("eth_requestAccounts"), 0);
    }

    #[tokio::test]
    async fn auto_connect_skips_unauthorized_and_wrong_chain() {
        let store = Rc::new(InMemoryStore::default());
        store.set(WALLET_ADDRESS_KEY, ACCOUNT).unwrap();
        store.set(WALLET_CONNECTED_KEY, "true").unwrap();

        let wrong_chain = MockProvider::on_chain(56);
        *wrong_chain.authorized.borrow_mut() = vec![ACCOUNT.to_string()];
        let manager = manager_with_store(MockHost::with(wrong_chain), store.clone());
        assert!(manager.init().await.is_none());
        assert!(manager.store().connected_wallet().is_some());
        assert_eq!(provider_of(&manager).count("wallet_switchEthereumChain"), 0);

        let revoked = MockProvider::on_chain(204);
        let manager = manager_with_store(MockHost::with(revoked), store);
        assert!(manager.init().await.is_none());
        assert!(manager.store().connected_wallet().is_none());
    }

    #[tokio::test]
    async fn empty_accounts_event_disconnects() -> anyhow::Result<()> {
        let manager = manager(MockHost::with(MockProvider::on_chain(204)));
        manager.connect().await?;

        assert_eq!(
            manager.on_accounts_changed(&[ACCOUNT.to_string()]),
            SessionChange::Reload
        );
        assert!(manager.is_connected());
        assert_eq!(manager.on_chain_changed("0x38"), SessionChange::Reload);
        assert_eq!(manager.on_accounts_changed(&[]), SessionChange::DisconnectAndReload);
        assert!(!manager.is_connected());
        assert!(manager.store().connected_wallet().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn balance_and_roles_follow_session() -> anyhow::Result<()> {
        let manager = manager(MockHost::with(MockProvider::on_chain(204)));
        assert_eq!(manager.native_balance().await, "0");
        assert_eq!(manager.roles(), RoleSet::default());

        manager.connect().await?;
        assert_eq!(manager.native_balance().await, "1.5");
        assert!(!manager.is_owner());
        assert!(!manager.roles().any());
        Ok(())
    }
}
