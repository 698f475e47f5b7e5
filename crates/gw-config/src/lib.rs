//! Process-wide constant table: chain parameters, contract addresses, admin
//! lists and the level price/reward schedule.
//!
//! Built once at boot (`AppConfig::opbnb()` or a JSON override), validated,
//! then shared read-only behind an `Rc`.

use alloy_primitives::{Address, U256, address, utils::parse_ether};
use gw_api_types::{ContractName, Level, NativeCurrency, NetworkDescriptor, RoleSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("expected {expected} level tiers, got {actual}")]
    TierCount { expected: usize, actual: usize },

    #[error("level tier {index} is out of order (expected level {expected})")]
    TierOrder { index: usize, expected: u8 },

    #[error("invalid amount '{value}' for {field}")]
    InvalidAmount { field: String, value: String },

    #[error("level {level} {field} does not increase over the previous level")]
    NotIncreasing { level: u8, field: &'static str },

    #[error("no address configured for critical contract {0}")]
    MissingContract(ContractName),

    #[error("abi_paths must contain at least one path with a {{name}} placeholder")]
    AbiPaths,

    #[error("{field} must be a positive interval")]
    ZeroInterval { field: &'static str },

    #[error("{field} is shorter than the discovery poll interval")]
    TimeoutBelowPoll { field: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Price and GWT reward of one level, both as decimal strings in whole units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelTier {
    pub level: u8,
    pub price: String,
    pub token_reward: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_init_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    4_000
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            init_timeout_ms: default_init_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "discovery.poll_interval_ms",
            });
        }
        for (field, timeout) in [
            ("discovery.init_timeout_ms", self.init_timeout_ms),
            ("discovery.connect_timeout_ms", self.connect_timeout_ms),
        ] {
            if timeout < self.poll_interval_ms {
                return Err(ConfigError::TimeoutBelowPoll { field });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub network: NetworkDescriptor,
    pub contracts: BTreeMap<ContractName, Address>,
    pub owner: Address,
    #[serde(default)]
    pub founders: Vec<Address>,
    #[serde(default)]
    pub board: Vec<Address>,
    pub levels: Vec<LevelTier>,
    pub registration_fee: String,
    pub quarterly_fee: String,
    /// Candidate ABI locations tried in order; `{name}` is the contract name.
    #[serde(default = "default_abi_paths")]
    pub abi_paths: Vec<String>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Prefix for opening the dApp inside a mobile wallet's browser.
    #[serde(default = "default_wallet_deep_link")]
    pub wallet_deep_link: String,
    #[serde(default = "default_matrix_row_cap")]
    pub matrix_row_cap: usize,
    #[serde(default = "default_block_reason_min_len")]
    pub block_reason_min_len: usize,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_abi_paths() -> Vec<String> {
    vec![
        "./contracts/{name}.json".to_string(),
        "./abi/{name}.json".to_string(),
        "/contracts/{name}.json".to_string(),
    ]
}

fn default_wallet_deep_link() -> String {
    "https://metamask.app.link/dapp/".to_string()
}

fn default_matrix_row_cap() -> usize {
    100
}

fn default_block_reason_min_len() -> usize {
    10
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::opbnb()
    }
}

impl AppConfig {
    /// Production table for opBNB mainnet.
    pub fn opbnb() -> Self {
        let contracts = BTreeMap::from([
            (ContractName::GlobalWay, address!("0x6567b30af75ad1f78c476f44be5b66d14aae9ae6")),
            (ContractName::Token, address!("0xa1df309b95c9a8cb8d3fb348f3e5e37405d172fb")),
            (ContractName::Stats, address!("0x65b189253453f366a5deffff2180b30dda615280")),
            (ContractName::LeaderPool, address!("0x27da643e22182b13a34e140636200cfab81c262f")),
            (ContractName::Investment, address!("0xb96f94bd4f05694d3e17b932d2b40242134a761b")),
            (ContractName::Quarterly, address!("0x6df9638a256a88ba53e7af6355b4e06207e482d6")),
            (ContractName::Governance, address!("0x2f68eba61a7d43c582d0504140dfc198bfa38167")),
            (ContractName::TechAccounts, address!("0x02cebc8994fe71b9f5d98741fb624b8a64aca306")),
            (ContractName::Marketing, address!("0x986f42156a315392424646cbd8f85c923ed138c5")),
            (ContractName::Bridge, address!("0x1fb7ad981c6ae45eb368160b64eb10197176d143")),
        ]);

        let prices = [
            "0.0015", "0.003", "0.006", "0.012", "0.024", "0.048", "0.096", "0.192", "0.384",
            "0.768", "1.536", "3.072",
        ];
        let rewards = [
            "5", "10", "15", "30", "60", "120", "240", "480", "960", "1920", "3840", "7680",
        ];
        let levels = prices
            .iter()
            .zip(rewards.iter())
            .enumerate()
            .map(|(index, (price, reward))| LevelTier {
                level: index as u8 + 1,
                price: (*price).to_string(),
                token_reward: (*reward).to_string(),
            })
            .collect();

        Self {
            network: NetworkDescriptor {
                chain_id: 204,
                chain_name: "opBNB Mainnet".to_string(),
                rpc_urls: vec!["https://opbnb-mainnet-rpc.bnbchain.org".to_string()],
                block_explorer_urls: vec!["https://opbnbscan.com".to_string()],
                native_currency: NativeCurrency {
                    name: "BNB".to_string(),
                    symbol: "BNB".to_string(),
                    decimals: 18,
                },
            },
            contracts,
            owner: address!("0xc3da46d86a632c09e2abcc724e1c84320a004772"),
            founders: vec![
                address!("0xdb7aa65c0cb27c346d9777877c366cd5534ed918"),
                address!("0xb6a9347286f20603d83f367501986cf9d3e81fa8"),
            ],
            board: vec![
                address!("0xd24a5c96834a6a6f166b8aab7f917f90b98a89b0"),
                address!("0x0ad851292a1f7ccc5c1cf05d2582060cb26514a8"),
                address!("0xd7e8318dd47322c979b6f8598e73c04d11c56977"),
            ],
            levels,
            registration_fee: "0.0005".to_string(),
            quarterly_fee: "0.075".to_string(),
            abi_paths: default_abi_paths(),
            discovery: DiscoveryConfig::default(),
            wallet_deep_link: default_wallet_deep_link(),
            matrix_row_cap: default_matrix_row_cap(),
            block_reason_min_len: default_block_reason_min_len(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }

    /// Parse a JSON table and validate it.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let expected = usize::from(gw_api_types::MAX_LEVEL);
        if self.levels.len() != expected {
            return Err(ConfigError::TierCount {
                expected,
                actual: self.levels.len(),
            });
        }

        let mut previous: Option<(U256, U256)> = None;
        for (index, tier) in self.levels.iter().enumerate() {
            let expected_level = index as u8 + 1;
            if tier.level != expected_level {
                return Err(ConfigError::TierOrder {
                    index,
                    expected: expected_level,
                });
            }

            let price = parse_amount("levels.price", &tier.price)?;
            let reward = parse_amount("levels.token_reward", &tier.token_reward)?;
            if let Some((prev_price, prev_reward)) = previous {
                if price <= prev_price {
                    return Err(ConfigError::NotIncreasing {
                        level: tier.level,
                        field: "price",
                    });
                }
                if reward <= prev_reward {
                    return Err(ConfigError::NotIncreasing {
                        level: tier.level,
                        field: "token_reward",
                    });
                }
            }
            previous = Some((price, reward));
        }

        parse_amount("registration_fee", &self.registration_fee)?;
        parse_amount("quarterly_fee", &self.quarterly_fee)?;

        for name in ContractName::CRITICAL {
            match self.contracts.get(&name) {
                Some(address) if !address.is_zero() => {}
                _ => return Err(ConfigError::MissingContract(name)),
            }
        }

        if !self.abi_paths.iter().any(|path| path.contains("{name}")) {
            return Err(ConfigError::AbiPaths);
        }

        self.discovery.validate()?;
        if self.receipt_poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "receipt_poll_interval_ms",
            });
        }

        Ok(())
    }

    pub fn target_chain_id(&self) -> u64 {
        self.network.chain_id
    }

    pub fn contract_address(&self, name: ContractName) -> Option<Address> {
        self.contracts
            .get(&name)
            .copied()
            .filter(|address| !address.is_zero())
    }

    pub fn level_tier(&self, level: Level) -> Option<&LevelTier> {
        self.levels.get(usize::from(level.get()) - 1)
    }

    /// Candidate ABI paths for one contract, in lookup order.
    pub fn abi_candidates(&self, name: ContractName) -> Vec<String> {
        self.abi_paths
            .iter()
            .map(|template| template.replace("{name}", name.as_str()))
            .collect()
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owner == *address
    }

    pub fn is_founder(&self, address: &Address) -> bool {
        self.founders.contains(address)
    }

    pub fn is_board(&self, address: &Address) -> bool {
        self.board.contains(address)
    }

    pub fn roles_for(&self, address: &Address) -> RoleSet {
        RoleSet {
            owner: self.is_owner(address),
            founder: self.is_founder(address),
            board: self.is_board(address),
        }
    }

    /// Role lookup from a textual address in any letter case. Unparseable
    /// input holds no roles.
    pub fn roles_of(&self, address: &str) -> RoleSet {
        parse_address_any_case(address)
            .map(|address| self.roles_for(&address))
            .unwrap_or_default()
    }
}

/// Parse `0x…`/`0X…` hex addresses regardless of letter case; checksums are
/// not enforced. The prefix is required.
pub fn parse_address_any_case(input: &str) -> Option<Address> {
    let lower = input.trim().to_ascii_lowercase();
    if !gw_api_types::format::is_valid_address(&lower) {
        return None;
    }
    lower.parse::<Address>().ok()
}

fn parse_amount(field: &str, value: &str) -> Result<U256> {
    parse_ether(value).map_err(|_| ConfigError::InvalidAmount {
        field: field.to_string(),
        value: value.to_string(),
    })
}
