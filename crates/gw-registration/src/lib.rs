//! Referral identifiers and sponsor resolution for new registrations.

use alloy_primitives::Address;
use async_trait::async_trait;
use gw_api_types::TxHash;
use gw_chain_client::ChainTransport;
use gw_config::parse_address_any_case;
use gw_contracts::{ContractError, ContractsManager};
use gw_storage::{KeyValueStore, SessionStore};
use thiserror::Error;
use tracing::{debug, info, warn};

const ID_PREFIX: &str = "GW";
const ID_DIGITS: usize = 7;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid sponsor: {0}")]
    InvalidSponsor(String),

    #[error("this wallet is already registered")]
    AlreadyRegistered,

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl RegistrationError {
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, RegistrationError::Contract(err) if err.is_user_rejected())
    }
}

/// What a user typed into the sponsor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SponsorRef {
    Id(u64),
    Address(Address),
}

/// `7` → `"GW0000007"`.
pub fn format_user_id(id: u64) -> String {
    format!("{ID_PREFIX}{id:0width$}", width = ID_DIGITS)
}

/// Inverse of [`format_user_id`]; the prefix is matched case-insensitively
/// and padding is optional.
pub fn parse_user_id(input: &str) -> Option<u64> {
    let input = input.trim();
    let digits = input
        .get(..ID_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(ID_PREFIX))
        .map(|_| &input[ID_PREFIX.len()..])?;
    parse_digits(digits)
}

fn parse_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|id| *id != 0)
}

/// Accepts a bare numeric ID, a `GW`-prefixed ID or a hex address.
pub fn parse_sponsor_ref(input: &str) -> Result<SponsorRef, RegistrationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(RegistrationError::InvalidSponsor("sponsor is required".into()));
    }
    if let Some(id) = parse_digits(input).or_else(|| parse_user_id(input)) {
        return Ok(SponsorRef::Id(id));
    }
    if let Some(address) = parse_address_any_case(input) {
        return Ok(SponsorRef::Address(address));
    }
    Err(RegistrationError::InvalidSponsor(format!(
        "{input} is neither a user ID nor an address"
    )))
}

/// Sponsor carried by a referral link (`?ref=GW0000007`).
pub fn sponsor_from_query(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "ref")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The contract calls registration needs.
#[async_trait(?Send)]
pub trait RegistrationContracts {
    async fn address_for_id(&self, id: u64) -> Result<Option<Address>, ContractError>;
    async fn is_registered(&self, user: Address) -> bool;
    async fn register(&self, sponsor: Address) -> Result<TxHash, ContractError>;
}

#[async_trait(?Send)]
impl<T: ChainTransport> RegistrationContracts for ContractsManager<T> {
    async fn address_for_id(&self, id: u64) -> Result<Option<Address>, ContractError> {
        ContractsManager::address_for_id(self, id).await
    }

    async fn is_registered(&self, user: Address) -> bool {
        ContractsManager::is_registered(self, user).await
    }

    async fn register(&self, sponsor: Address) -> Result<TxHash, ContractError> {
        ContractsManager::register(self, sponsor).await
    }
}

/// Resolve typed sponsor input to a registered address.
pub async fn resolve_sponsor<C>(contracts: &C, input: &str) -> Result<Address, RegistrationError>
where
    C: RegistrationContracts + ?Sized,
{
    let address = match parse_sponsor_ref(input)? {
        SponsorRef::Address(address) => address,
        SponsorRef::Id(id) => match contracts.address_for_id(id).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                return Err(RegistrationError::InvalidSponsor(format!(
                    "no user with ID {}",
                    format_user_id(id)
                )));
            }
            Err(err @ (ContractError::UserRejected | ContractError::NotInitialized(_))) => {
                return Err(err.into());
            }
            Err(err) => {
                warn!("lookup of sponsor ID {id} failed: {err}");
                return Err(RegistrationError::InvalidSponsor(format!(
                    "could not look up ID {}",
                    format_user_id(id)
                )));
            }
        },
    };

    if address.is_zero() {
        return Err(RegistrationError::InvalidSponsor("zero address".into()));
    }
    if !contracts.is_registered(address).await {
        return Err(RegistrationError::InvalidSponsor(format!("{address} is not registered")));
    }
    debug!("sponsor {input} resolved to {address}");
    Ok(address)
}

/// Registration with a referral sponsor that survives reconnects.
pub struct RegistrationFlow<S> {
    store: SessionStore<S>,
}

impl<S: KeyValueStore> RegistrationFlow<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: SessionStore::new(store),
        }
    }

    /// Remember the sponsor from a referral link, if any.
    pub fn capture_referral(&self, query: &str) -> Option<String> {
        let sponsor = sponsor_from_query(query)?;
        if let Err(err) = self.store.set_pending_sponsor(&sponsor) {
            warn!("failed to persist referral sponsor: {err}");
        }
        info!("referral sponsor captured: {sponsor}");
        Some(sponsor)
    }

    pub fn pending_sponsor(&self) -> Option<String> {
        self.store.pending_sponsor()
    }

    pub async fn register<C>(
        &self,
        contracts: &C,
        user: Address,
        sponsor_input: &str,
    ) -> Result<TxHash, RegistrationError>
    where
        C: RegistrationContracts + ?Sized,
    {
        if contracts.is_registered(user).await {
            return Err(RegistrationError::AlreadyRegistered);
        }
        let sponsor = resolve_sponsor(contracts, sponsor_input).await?;
        let tx_hash = contracts.register(sponsor).await?;
        self.store.clear_pending_sponsor();
        info!("registered {user} under sponsor {sponsor}");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use gw_storage::InMemoryStore;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn who(byte: u8) -> Address {
        Address::with_last_byte(byte)
    }

    #[derive(Default)]
    struct FakeContracts {
        ids: HashMap<u64, Address>,
        registered: RefCell<Vec<Address>>,
        reject: bool,
        lookup_error: Option<fn() -> ContractError>,
    }

    #[async_trait(?Send)]
    impl RegistrationContracts for FakeContracts {
        async fn address_for_id(&self, id: u64) -> Result<Option<Address>, ContractError> {
            if let Some(error) = self.lookup_error {
                return Err(error());
            }
            Ok(self.ids.get(&id).copied())
        }

        async fn is_registered(&self, user: Address) -> bool {
            self.registered.borrow().contains(&user)
        }

        async fn register(&self, _sponsor: Address) -> Result<TxHash, ContractError> {
            if self.reject {
                return Err(ContractError::UserRejected);
            }
            Ok(B256::with_last_byte(1))
        }
    }

    fn directory() -> FakeContracts {
        FakeContracts {
            ids: HashMap::from([(7, who(7)), (8, who(8))]),
            registered: RefCell::new(vec![who(7), who(9)]),
            reject: false,
            lookup_error: None,
        }
    }

    #[test]
    fn user_ids_format_and_parse() {
        assert_eq!(format_user_id(7), "GW0000007");
        assert_eq!(format_user_id(9_999_999), "GW9999999");
        assert_eq!(parse_user_id("gw0000042"), Some(42));
        assert_eq!(parse_user_id("GW42"), Some(42));
        assert_eq!(parse_user_id("GW"), None);
        assert_eq!(parse_user_id("GW0000000"), None);
        assert_eq!(parse_user_id("XX0000001"), None);

        for id in (1..=9_999_999u64).step_by(9_973).chain([1, 9_999_999]) {
            assert_eq!(parse_user_id(&format_user_id(id)), Some(id));
        }
    }

    #[test]
    fn sponsor_refs_by_shape() {
        assert_eq!(parse_sponsor_ref(" 7 ").unwrap(), SponsorRef::Id(7));
        assert_eq!(parse_sponsor_ref("GW0000007").unwrap(), SponsorRef::Id(7));
        assert_eq!(
            parse_sponsor_ref("0x00000000000000000000000000000000000000AB").unwrap(),
            SponsorRef::Address(who(0xab))
        );
        assert!(parse_sponsor_ref("0").is_err());
        assert!(parse_sponsor_ref("").is_err());
        assert!(parse_sponsor_ref("0x1234").is_err());
        assert!(parse_sponsor_ref("00000000000000000000000000000000000000AB").is_err());
        assert!(parse_sponsor_ref("alice").is_err());
    }

    #[test]
    fn referral_query_parsing() {
        assert_eq!(sponsor_from_query("?ref=GW0000007"), Some("GW0000007".into()));
        assert_eq!(sponsor_from_query("?lang=en&ref=12"), Some("12".into()));
        assert_eq!(sponsor_from_query("?ref="), None);
        assert_eq!(sponsor_from_query(""), None);
    }

    #[tokio::test]
    async fn resolves_prefixed_id_to_registered_sponsor() -> anyhow::Result<()> {
        let contracts = directory();
        assert_eq!(resolve_sponsor(&contracts, "GW0000007").await?, who(7));
        assert_eq!(resolve_sponsor(&contracts, &who(9).to_string()).await?, who(9));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_or_unregistered_sponsors_fail() {
        let contracts = directory();
        assert!(matches!(
            resolve_sponsor(&contracts, "GW0000099").await,
            Err(RegistrationError::InvalidSponsor(_))
        ));
        // ID 8 maps to an address that never registered
        assert!(matches!(
            resolve_sponsor(&contracts, "8").await,
            Err(RegistrationError::InvalidSponsor(_))
        ));
    }

    #[tokio::test]
    async fn failed_id_lookup_is_an_invalid_sponsor() {
        let reverting = FakeContracts {
            lookup_error: Some(|| ContractError::Reverted("header not found".into())),
            ..directory()
        };
        assert!(matches!(
            resolve_sponsor(&reverting, "GW0000007").await,
            Err(RegistrationError::InvalidSponsor(_))
        ));

        let unbound = FakeContracts {
            lookup_error: Some(|| ContractError::NotInitialized(gw_api_types::ContractName::GlobalWay)),
            ..directory()
        };
        assert!(matches!(
            resolve_sponsor(&unbound, "GW0000007").await,
            Err(RegistrationError::Contract(ContractError::NotInitialized(_)))
        ));

        let rejecting = FakeContracts {
            lookup_error: Some(|| ContractError::UserRejected),
            ..directory()
        };
        let err = resolve_sponsor(&rejecting, "7").await.unwrap_err();
        assert!(err.is_user_rejected());
    }

    #[tokio::test]
    async fn pending_sponsor_survives_until_registration() -> anyhow::Result<()> {
        let store = Rc::new(InMemoryStore::default());
        let flow = RegistrationFlow::new(store.clone());
        assert_eq!(flow.capture_referral("?ref=GW0000007").as_deref(), Some("GW0000007"));

        let reloaded = RegistrationFlow::new(store.clone());
        assert_eq!(reloaded.pending_sponsor().as_deref(), Some("GW0000007"));

        let rejecting = FakeContracts {
            reject: true,
            ..directory()
        };
        let err = reloaded.register(&rejecting, who(1), "GW0000007").await.unwrap_err();
        assert!(err.is_user_rejected());
        assert!(reloaded.pending_sponsor().is_some());

        reloaded.register(&directory(), who(1), "GW0000007").await?;
        assert!(reloaded.pending_sponsor().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn registered_users_are_refused() {
        let contracts = directory();
        let flow = RegistrationFlow::new(Rc::new(InMemoryStore::default()));
        assert!(matches!(
            flow.register(&contracts, who(9), "7").await,
            Err(RegistrationError::AlreadyRegistered)
        ));

        let self_sponsor = who(7).to_string();
        assert!(matches!(
            flow.register(&contracts, who(7), &self_sponsor).await,
            Err(RegistrationError::AlreadyRegistered)
        ));
        assert!(matches!(
            flow.register(&contracts, who(1), "").await,
            Err(RegistrationError::InvalidSponsor(_))
        ));
    }
}
