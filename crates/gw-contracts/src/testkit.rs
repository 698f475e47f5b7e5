//! In-memory chain used by the contracts tests.

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use gw_api_types::{ContractName, TxHash};
use gw_chain_client::{ChainError, ChainTransport, ProviderError, TxReceipt, TxRequest};
use gw_config::AppConfig;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tokio::sync::Notify;

use crate::abi::AbiRegistry;
use crate::manager::ContractsManager;

type Responder = Box<dyn Fn(&[DynSolValue]) -> Vec<DynSolValue>>;

pub fn user(byte: u8) -> Address {
    Address::with_last_byte(byte)
}

pub fn abi_for(name: ContractName) -> JsonAbi {
    abi_with(name, true)
}

fn abi_with(name: ContractName, direct_id_lookup: bool) -> JsonAbi {
    let mut signatures: Vec<&str> = match name {
        ContractName::GlobalWay => vec![
            "function register(address sponsor) payable",
            "function activateLevel(uint8 level) payable",
            "function batchActivateLevels(address[] users, uint8 maxLevel)",
            "function pause()",
            "function unpause()",
            "function paused() view returns (bool)",
            "function setProjectAuthorization(address project, bool authorized)",
            "function emergencyWithdraw()",
            "function isUserRegistered(address user) view returns (bool)",
            "function getUserInfo(address user) view returns (address sponsor, uint256 userId, uint256 registrationTime, uint256 lastActivity, uint256 personalInvites, uint256 totalEarned, uint8 leaderRank)",
            "function isLevelActive(address user, uint8 level) view returns (bool)",
            "function getUserReferrals(address user) view returns (address[])",
            "function getTotalUsers() view returns (uint256)",
            "function allUsers(uint256 index) view returns (address)",
            "function getMatrixPosition(address user, uint8 level) view returns (uint256)",
            "function getMatrixOccupant(uint8 level, uint256 index) view returns (address)",
        ],
        ContractName::Stats => vec![
            "function getUserStats(address user) view returns (uint256 totalEarned, uint256 referralEarnings, uint256 matrixEarnings, uint256 leaderEarnings, uint256 teamSize)",
        ],
        ContractName::Token => vec![
            "function balanceOf(address owner) view returns (uint256)",
            "function totalSupply() view returns (uint256)",
            "function getCurrentPrice() view returns (uint256)",
            "function transfer(address to, uint256 amount) returns (bool)",
            "function approve(address spender, uint256 amount) returns (bool)",
            "function buyTokens(uint256 amount) payable",
            "function sellTokens(uint256 amount)",
            "function calculatePurchaseCost(uint256 amount) view returns (uint256)",
        ],
        ContractName::Quarterly => vec![
            "function payQuarterlyActivity() payable",
            "function getNextPaymentTime(address user) view returns (uint256)",
        ],
        ContractName::LeaderPool | ContractName::Investment | ContractName::Marketing => vec![
            "function pendingRewards(address user) view returns (uint256)",
            "function claimRewards()",
        ],
        ContractName::Governance => vec![
            "function addBoardMember(address member)",
            "function removeBoardMember(address member)",
            "function blockUser(address user, string reason)",
            "function unblockUser(address user)",
            "function createWithdrawalProposal(address recipient, uint256 amount, string description)",
            "function vote(uint256 proposalId, bool support)",
            "function executeProposal(uint256 proposalId)",
            "function proposalCount() view returns (uint256)",
            "function getProposal(uint256 proposalId) view returns (address proposer, address recipient, uint256 amount, string description, uint256 votesFor, uint256 votesAgainst, uint256 votesRequired, bool executed, uint256 deadline)",
        ],
        ContractName::TechAccounts | ContractName::Bridge => {
            vec!["function owner() view returns (address)"]
        }
    };
    if name == ContractName::GlobalWay && direct_id_lookup {
        signatures.push("function getAddressById(uint256 id) view returns (address)");
    }
    JsonAbi::parse(signatures).expect("fixture ABI parses")
}

#[derive(Debug, Clone)]
pub struct SentTx {
    pub contract: ContractName,
    pub function: String,
    pub value: U256,
}

/// Answers `eth_call` from registered responders and records sends.
pub struct MockChain {
    config: AppConfig,
    direct_id_lookup: bool,
    responders: RefCell<HashMap<(ContractName, String), Responder>>,
    calls: RefCell<Vec<String>>,
    sent: RefCell<Vec<SentTx>>,
    reject: Cell<bool>,
    send_gate: RefCell<Option<Rc<Notify>>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            config: AppConfig::opbnb(),
            direct_id_lookup: true,
            responders: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            sent: RefCell::new(Vec::new()),
            reject: Cell::new(false),
            send_gate: RefCell::new(None),
        }
    }
}

impl MockChain {
    pub fn without_id_lookup() -> Self {
        Self {
            direct_id_lookup: false,
            ..Self::default()
        }
    }

    /// The first send waits until `gate` is notified.
    pub fn with_send_gate(self, gate: Rc<Notify>) -> Self {
        *self.send_gate.borrow_mut() = Some(gate);
        self
    }

    pub fn respond<F>(&self, contract: ContractName, function: &str, responder: F)
    where
        F: Fn(&[DynSolValue]) -> Vec<DynSolValue> + 'static,
    {
        self.responders
            .borrow_mut()
            .insert((contract, function.to_string()), Box::new(responder));
    }

    pub fn reject_sends(&self) {
        self.reject.set(true);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.borrow().clone()
    }

    pub fn call_count(&self, function: &str) -> usize {
        self.calls.borrow().iter().filter(|f| f.as_str() == function).count()
    }

    pub fn registry(&self) -> AbiRegistry {
        let mut registry = AbiRegistry::default();
        for name in ContractName::ALL {
            registry.insert(name, abi_with(name, self.direct_id_lookup));
        }
        registry
    }

    fn contract_at(&self, to: Address) -> ContractName {
        self.config
            .contracts
            .iter()
            .find(|(_, address)| **address == to)
            .map(|(name, _)| *name)
            .expect("call targets a configured contract")
    }

    fn resolve(&self, to: Address, data: &[u8]) -> (ContractName, alloy_json_abi::Function) {
        let contract = self.contract_at(to);
        let function = abi_with(contract, self.direct_id_lookup)
            .functions()
            .find(|f| f.selector().as_slice() == &data[..4])
            .cloned()
            .expect("selector belongs to the fixture ABI");
        (contract, function)
    }
}

#[async_trait(?Send)]
impl ChainTransport for MockChain {
    fn signer(&self) -> Address {
        user(1)
    }

    async fn chain_id(&self) -> gw_chain_client::Result<u64> {
        Ok(204)
    }

    async fn balance(&self, _address: Address) -> gw_chain_client::Result<U256> {
        Ok(U256::ZERO)
    }

    async fn call(&self, to: Address, data: Bytes) -> gw_chain_client::Result<Bytes> {
        let (contract, function) = self.resolve(to, &data);
        self.calls.borrow_mut().push(function.name.clone());

        let args = function
            .abi_decode_input(&data[4..])
            .expect("mock input decodes");
        let responders = self.responders.borrow();
        let Some(responder) = responders.get(&(contract, function.name.clone())) else {
            return Err(ChainError::Provider(ProviderError::internal(format!(
                "no responder for {contract}.{}",
                function.name
            ))));
        };
        let output = function
            .abi_encode_output(&responder(&args))
            .expect("mock output encodes");
        Ok(Bytes::from(output))
    }

    async fn send_transaction(&self, tx: TxRequest) -> gw_chain_client::Result<TxHash> {
        if self.reject.get() {
            return Err(ProviderError::new(4001, "User denied transaction signature").into());
        }
        let (contract, function) = self.resolve(tx.to, &tx.data);
        let gate = self.send_gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut sent = self.sent.borrow_mut();
        sent.push(SentTx {
            contract,
            function: function.name,
            value: tx.value,
        });
        Ok(B256::with_last_byte(sent.len() as u8))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> gw_chain_client::Result<TxReceipt> {
        Ok(TxReceipt {
            tx_hash,
            success: true,
            block_number: 1,
        })
    }
}

pub fn manager_with(chain: MockChain) -> (ContractsManager<MockChain>, Rc<MockChain>) {
    let manager = ContractsManager::new(Rc::new(AppConfig::opbnb()));
    manager.set_abis(chain.registry());
    (manager, Rc::new(chain))
}
