//! Shared domain types for the GlobalWay dApp crates.

pub mod format;

pub use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TxHash = B256;

/// Highest purchasable level.
pub const MAX_LEVEL: u8 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContractName {
    GlobalWay,
    Token,
    Stats,
    LeaderPool,
    Investment,
    Quarterly,
    Governance,
    TechAccounts,
    Marketing,
    Bridge,
}

impl ContractName {
    pub const ALL: [ContractName; 10] = [
        ContractName::GlobalWay,
        ContractName::Token,
        ContractName::Stats,
        ContractName::LeaderPool,
        ContractName::Investment,
        ContractName::Quarterly,
        ContractName::Governance,
        ContractName::TechAccounts,
        ContractName::Marketing,
        ContractName::Bridge,
    ];

    /// Contracts without which the app does not consider itself operational.
    pub const CRITICAL: [ContractName; 4] = [
        ContractName::GlobalWay,
        ContractName::Token,
        ContractName::Stats,
        ContractName::Governance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractName::GlobalWay => "GlobalWay",
            ContractName::Token => "Token",
            ContractName::Stats => "Stats",
            ContractName::LeaderPool => "LeaderPool",
            ContractName::Investment => "Investment",
            ContractName::Quarterly => "Quarterly",
            ContractName::Governance => "Governance",
            ContractName::TechAccounts => "TechAccounts",
            ContractName::Marketing => "Marketing",
            ContractName::Bridge => "Bridge",
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pools a user can claim accumulated rewards from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RewardPool {
    Leader,
    Investment,
    Marketing,
}

impl RewardPool {
    pub fn contract(&self) -> ContractName {
        match self {
            RewardPool::Leader => ContractName::LeaderPool,
            RewardPool::Investment => ContractName::Investment,
            RewardPool::Marketing => ContractName::Marketing,
        }
    }
}

/// A level number in `1..=MAX_LEVEL`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const FIRST: Level = Level(1);

    pub fn new(level: u8) -> Option<Self> {
        (1..=MAX_LEVEL).contains(&level).then_some(Self(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Level> {
        (1..=MAX_LEVEL).map(Level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active levels packed into a bitset; bit `n - 1` marks level `n`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelSet(u16);

impl LevelSet {
    pub fn insert(&mut self, level: Level) {
        self.0 |= 1 << (level.get() - 1);
    }

    pub fn contains(&self, level: Level) -> bool {
        self.0 & (1 << (level.get() - 1)) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn highest(&self) -> Option<Level> {
        self.iter().last()
    }

    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        Level::all().filter(|level| self.contains(*level))
    }
}

impl FromIterator<Level> for LevelSet {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        let mut set = LevelSet::default();
        for level in iter {
            set.insert(level);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Founder,
    Board,
}

/// Role membership of one address. Tiers nest: an owner may act as founder
/// and board member, a founder as board member.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSet {
    pub owner: bool,
    pub founder: bool,
    pub board: bool,
}

impl RoleSet {
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::Owner => self.owner,
            Role::Founder => self.owner || self.founder,
            Role::Board => self.owner || self.founder || self.board,
        }
    }

    pub fn any(&self) -> bool {
        self.owner || self.founder || self.board
    }
}

/// Dashboard view model, rebuilt from chain reads on every load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub is_registered: bool,
    pub sponsor: Address,
    pub registration_time: u64,
    pub last_activity: u64,
    pub personal_invites: u64,
    pub total_earned: U256,
    pub user_id: u64,
    pub active_levels: LevelSet,
    pub referrals: Vec<Address>,
    pub leader_rank: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub total_earned: U256,
    pub referral_earnings: U256,
    pub matrix_earnings: U256,
    pub leader_earnings: U256,
    pub team_size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    pub price: U256,
    pub total_supply: U256,
    pub user_balance: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub recipient: Address,
    pub amount: U256,
    pub description: String,
    pub votes_for: u64,
    pub votes_against: u64,
    pub votes_required: u64,
    pub executed: bool,
    pub deadline: u64,
}

/// One rendered cell of the matrix; `occupant == None` renders as empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatrixSlot {
    pub local_position: u64,
    pub global_index: u64,
    pub occupant: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Full network descriptor, as needed to ask a wallet to add the chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

impl NetworkDescriptor {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Parameter object for `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> AddEthereumChainParameter {
        AddEthereumChainParameter {
            chain_id: self.chain_id_hex(),
            chain_name: self.chain_name.clone(),
            rpc_urls: self.rpc_urls.clone(),
            block_explorer_urls: self.block_explorer_urls.clone(),
            native_currency: self.native_currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

/// What the App must do after the wallet reports an account or chain change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Reload,
    DisconnectAndReload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bounds() {
        assert!(Level::new(0).is_none());
        assert!(Level::new(13).is_none());
        assert_eq!(Level::new(12).map(|l| l.get()), Some(12));
        assert_eq!(Level::all().count(), 12);
    }

    #[test]
    fn level_set_tracks_members() {
        let set: LevelSet = [1, 2, 5].into_iter().filter_map(Level::new).collect();
        assert_eq!(set.len(), 3);
        assert!(set.contains(Level::new(5).unwrap()));
        assert!(!set.contains(Level::new(4).unwrap()));
        assert_eq!(set.highest().map(|l| l.get()), Some(5));
        assert!(LevelSet::default().is_empty());
    }

    #[test]
    fn role_tiers_nest() {
        let owner = RoleSet { owner: true, ..Default::default() };
        assert!(owner.satisfies(Role::Board));
        assert!(owner.satisfies(Role::Founder));

        let board = RoleSet { board: true, ..Default::default() };
        assert!(board.satisfies(Role::Board));
        assert!(!board.satisfies(Role::Founder));
        assert!(!RoleSet::default().any());
    }

    #[test]
    fn add_chain_params_use_hex_chain_id() {
        let network = NetworkDescriptor {
            chain_id: 204,
            chain_name: "opBNB Mainnet".to_owned(),
            rpc_urls: vec!["https://opbnb-mainnet-rpc.bnbchain.org".to_owned()],
            block_explorer_urls: vec!["https://opbnbscan.com".to_owned()],
            native_currency: NativeCurrency {
                name: "BNB".to_owned(),
                symbol: "BNB".to_owned(),
                decimals: 18,
            },
        };
        let params = network.add_chain_params();
        assert_eq!(params.chain_id, "0xcc");
    }
}
