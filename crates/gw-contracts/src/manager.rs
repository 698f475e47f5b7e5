use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use gw_api_types::{
    ContractName, Level, LevelSet, Proposal, RewardPool, TokenInfo, TxHash, UserInfo, UserStats,
};
use gw_chain_client::{ChainTransport, TxRequest};
use gw_config::AppConfig;
use gw_matrix::OccupantSource;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::abi::{AbiRegistry, AbiSource, ContractHandle};
use crate::error::{ContractError, Result};
use crate::guard::InFlight;
use crate::units;

/// Decoded return values of one call.
struct Outputs {
    function: &'static str,
    values: Vec<DynSolValue>,
}

impl Outputs {
    fn value(&self, index: usize) -> Result<&DynSolValue> {
        self.values.get(index).ok_or_else(|| self.decode_error(index, "missing"))
    }

    fn decode_error(&self, index: usize, detail: &str) -> ContractError {
        ContractError::Decode {
            function: self.function.to_string(),
            detail: format!("output {index}: {detail}"),
        }
    }

    fn uint(&self, index: usize) -> Result<U256> {
        self.value(index)?
            .as_uint()
            .map(|(value, _)| value)
            .ok_or_else(|| self.decode_error(index, "expected uint"))
    }

    fn u64(&self, index: usize) -> Result<u64> {
        Ok(self.uint(index)?.saturating_to::<u64>())
    }

    fn address(&self, index: usize) -> Result<Address> {
        self.value(index)?
            .as_address()
            .ok_or_else(|| self.decode_error(index, "expected address"))
    }

    fn bool(&self, index: usize) -> Result<bool> {
        self.value(index)?
            .as_bool()
            .ok_or_else(|| self.decode_error(index, "expected bool"))
    }

    fn string(&self, index: usize) -> Result<String> {
        self.value(index)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.decode_error(index, "expected string"))
    }

    fn addresses(&self, index: usize) -> Result<Vec<Address>> {
        let items = self
            .value(index)?
            .as_array()
            .ok_or_else(|| self.decode_error(index, "expected address[]"))?;
        items
            .iter()
            .map(|item| {
                item.as_address()
                    .ok_or_else(|| self.decode_error(index, "expected address element"))
            })
            .collect()
    }
}

fn uint256(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

fn uint8(value: u8) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 8)
}

/// Owns the bound contract handles and exposes one method per on-chain call.
///
/// Read paths log and fall back to zero/empty defaults so the dashboard can
/// always render; write paths return [`ContractError`] to the caller.
pub struct ContractsManager<T> {
    config: Rc<AppConfig>,
    abis: RefCell<AbiRegistry>,
    transport: RefCell<Option<Rc<T>>>,
    handles: RefCell<BTreeMap<ContractName, Rc<ContractHandle>>>,
    purchase: InFlight,
    id_cache: RefCell<HashMap<u64, Address>>,
}

impl<T: ChainTransport> ContractsManager<T> {
    pub fn new(config: Rc<AppConfig>) -> Self {
        Self {
            config,
            abis: RefCell::new(AbiRegistry::default()),
            transport: RefCell::new(None),
            handles: RefCell::new(BTreeMap::new()),
            purchase: InFlight::default(),
            id_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch every contract ABI; returns how many loaded.
    pub async fn load_abis<S>(&self, source: &S) -> usize
    where
        S: AbiSource + ?Sized,
    {
        let registry = AbiRegistry::load(source, &self.config).await;
        let loaded = registry.len();
        *self.abis.borrow_mut() = registry;
        loaded
    }

    pub fn set_abis(&self, registry: AbiRegistry) {
        *self.abis.borrow_mut() = registry;
    }

    /// Bind handles to the signer behind `transport`. Returns true only when
    /// every critical contract is available.
    pub fn init(&self, transport: Rc<T>) -> bool {
        self.reset();

        let signer = transport.signer();
        if signer.is_zero() {
            warn!("contracts init skipped: no signer");
            return false;
        }

        let mut handles = BTreeMap::new();
        {
            let abis = self.abis.borrow();
            for name in ContractName::ALL {
                let Some(abi) = abis.get(name) else {
                    continue;
                };
                let Some(address) = self.config.contract_address(name) else {
                    warn!("{name} has an ABI but no configured address");
                    continue;
                };
                handles.insert(name, Rc::new(ContractHandle::new(name, address, abi.clone())));
            }
        }

        let missing: Vec<&str> = ContractName::CRITICAL
            .iter()
            .filter(|name| !handles.contains_key(*name))
            .map(ContractName::as_str)
            .collect();

        info!("bound {} contracts for {signer}", handles.len());
        *self.handles.borrow_mut() = handles;
        *self.transport.borrow_mut() = Some(transport);

        if missing.is_empty() {
            true
        } else {
            warn!("critical contracts unavailable: {}", missing.join(", "));
            false
        }
    }

    /// Drop all handles, e.g. on disconnect.
    pub fn reset(&self) {
        self.handles.borrow_mut().clear();
        self.transport.borrow_mut().take();
        self.id_cache.borrow_mut().clear();
    }

    pub fn is_ready(&self) -> bool {
        let handles = self.handles.borrow();
        ContractName::CRITICAL.iter().all(|name| handles.contains_key(name))
    }

    pub fn has(&self, name: ContractName) -> bool {
        self.handles.borrow().contains_key(&name)
    }

    pub fn is_purchase_pending(&self) -> bool {
        self.purchase.is_busy()
    }

    fn bound(&self, name: ContractName) -> Result<(Rc<ContractHandle>, Rc<T>)> {
        let handle = self
            .handles
            .borrow()
            .get(&name)
            .cloned()
            .ok_or(ContractError::NotInitialized(name))?;
        let transport = self
            .transport
            .borrow()
            .clone()
            .ok_or(ContractError::NotInitialized(name))?;
        Ok((handle, transport))
    }

    fn signer(&self) -> Option<Address> {
        self.transport.borrow().as_ref().map(|t| t.signer())
    }

    async fn read(
        &self,
        name: ContractName,
        function: &'static str,
        args: Vec<DynSolValue>,
    ) -> Result<Outputs> {
        let (handle, transport) = self.bound(name)?;
        let data = handle.encode(function, &args)?;
        let raw = transport.call(handle.address, data).await?;
        let values = handle.decode(function, args.len(), &raw)?;
        Ok(Outputs { function, values })
    }

    async fn write(
        &self,
        name: ContractName,
        function: &'static str,
        args: Vec<DynSolValue>,
        value: U256,
    ) -> Result<TxHash> {
        let (handle, transport) = self.bound(name)?;
        let data = handle.encode(function, &args)?;
        info!("{name}.{function}: submitting (value {} BNB)", units::from_wei(value));
        let tx_hash = transport
            .send_transaction(TxRequest {
                to: handle.address,
                data,
                value,
            })
            .await?;
        let receipt = transport.wait_for_receipt(tx_hash).await?;
        info!("{name}.{function}: confirmed in block {}", receipt.block_number);
        Ok(receipt.tx_hash)
    }

    // ── Read paths ──

    pub async fn is_registered(&self, user: Address) -> bool {
        match self
            .read(ContractName::GlobalWay, "isUserRegistered", vec![DynSolValue::Address(user)])
            .await
            .and_then(|out| out.bool(0))
        {
            Ok(registered) => registered,
            Err(err) => {
                warn!("isUserRegistered({user}) failed: {err}");
                false
            }
        }
    }

    /// Registration, profile, active levels and referrals in one view model.
    /// Any failed read yields `UserInfo::default()`; never partially filled.
    pub async fn get_user_full_info(&self, user: Address) -> UserInfo {
        match self.try_user_full_info(user).await {
            Ok(info) => info,
            Err(err) => {
                warn!("user info for {user} unavailable: {err}");
                UserInfo::default()
            }
        }
    }

    async fn try_user_full_info(&self, user: Address) -> Result<UserInfo> {
        let registered = self
            .read(ContractName::GlobalWay, "isUserRegistered", vec![DynSolValue::Address(user)])
            .await?
            .bool(0)?;
        if !registered {
            return Ok(UserInfo::default());
        }

        let profile = self
            .read(ContractName::GlobalWay, "getUserInfo", vec![DynSolValue::Address(user)])
            .await?;

        let mut active_levels = LevelSet::default();
        for level in Level::all() {
            let active = self
                .read(
                    ContractName::GlobalWay,
                    "isLevelActive",
                    vec![DynSolValue::Address(user), uint8(level.get())],
                )
                .await?
                .bool(0)?;
            if active {
                active_levels.insert(level);
            }
        }

        let referrals = self
            .read(ContractName::GlobalWay, "getUserReferrals", vec![DynSolValue::Address(user)])
            .await?
            .addresses(0)?;

        Ok(UserInfo {
            is_registered: true,
            sponsor: profile.address(0)?,
            user_id: profile.u64(1)?,
            registration_time: profile.u64(2)?,
            last_activity: profile.u64(3)?,
            personal_invites: profile.u64(4)?,
            total_earned: profile.uint(5)?,
            leader_rank: profile.u64(6)?.min(u64::from(u8::MAX)) as u8,
            active_levels,
            referrals,
        })
    }

    pub async fn get_user_stats(&self, user: Address) -> UserStats {
        let result = async {
            let out = self
                .read(ContractName::Stats, "getUserStats", vec![DynSolValue::Address(user)])
                .await?;
            Ok::<_, ContractError>(UserStats {
                total_earned: out.uint(0)?,
                referral_earnings: out.uint(1)?,
                matrix_earnings: out.uint(2)?,
                leader_earnings: out.uint(3)?,
                team_size: out.u64(4)?,
            })
        }
        .await;

        result.unwrap_or_else(|err| {
            warn!("stats for {user} unavailable: {err}");
            UserStats::default()
        })
    }

    /// Global matrix index of `user` on `level`; `0` when unplaced or unreadable.
    pub async fn get_matrix_position(&self, user: Address, level: Level) -> u64 {
        match self
            .read(
                ContractName::GlobalWay,
                "getMatrixPosition",
                vec![DynSolValue::Address(user), uint8(level.get())],
            )
            .await
            .and_then(|out| out.u64(0))
        {
            Ok(position) => position,
            Err(err) => {
                warn!("matrix position of {user} on level {level} unavailable: {err}");
                0
            }
        }
    }

    pub async fn get_matrix_occupant(&self, level: Level, global_index: u64) -> Option<Address> {
        match self
            .read(
                ContractName::GlobalWay,
                "getMatrixOccupant",
                vec![uint8(level.get()), uint256(U256::from(global_index))],
            )
            .await
            .and_then(|out| out.address(0))
        {
            Ok(occupant) if occupant.is_zero() => None,
            Ok(occupant) => Some(occupant),
            Err(err) => {
                debug!("matrix slot {global_index} on level {level} unreadable: {err}");
                None
            }
        }
    }

    pub async fn token_info(&self, user: Address) -> TokenInfo {
        let result = async {
            let price = self.read(ContractName::Token, "getCurrentPrice", vec![]).await?.uint(0)?;
            let total_supply = self.read(ContractName::Token, "totalSupply", vec![]).await?.uint(0)?;
            let user_balance = self
                .read(ContractName::Token, "balanceOf", vec![DynSolValue::Address(user)])
                .await?
                .uint(0)?;
            Ok::<_, ContractError>(TokenInfo {
                price,
                total_supply,
                user_balance,
            })
        }
        .await;

        result.unwrap_or_else(|err| {
            warn!("token info unavailable: {err}");
            TokenInfo::default()
        })
    }

    /// GWT balance as a decimal string; `"0"` when unreadable.
    pub async fn token_balance(&self, user: Address) -> String {
        match self
            .read(ContractName::Token, "balanceOf", vec![DynSolValue::Address(user)])
            .await
            .and_then(|out| out.uint(0))
        {
            Ok(balance) => units::from_wei(balance),
            Err(err) => {
                warn!("token balance of {user} unavailable: {err}");
                "0".to_string()
            }
        }
    }

    pub async fn is_paused(&self) -> bool {
        match self
            .read(ContractName::GlobalWay, "paused", vec![])
            .await
            .and_then(|out| out.bool(0))
        {
            Ok(paused) => paused,
            Err(err) => {
                warn!("paused() unavailable: {err}");
                false
            }
        }
    }

    pub async fn pending_pool_rewards(&self, pool: RewardPool, user: Address) -> String {
        match self
            .read(pool.contract(), "pendingRewards", vec![DynSolValue::Address(user)])
            .await
            .and_then(|out| out.uint(0))
        {
            Ok(amount) => units::from_wei(amount),
            Err(err) => {
                warn!("pending rewards in {:?} pool unavailable: {err}", pool);
                "0".to_string()
            }
        }
    }

    /// Unix time the next quarterly payment is due; `0` when unknown.
    pub async fn next_quarterly_payment(&self, user: Address) -> u64 {
        match self
            .read(ContractName::Quarterly, "getNextPaymentTime", vec![DynSolValue::Address(user)])
            .await
            .and_then(|out| out.u64(0))
        {
            Ok(timestamp) => timestamp,
            Err(err) => {
                warn!("quarterly schedule of {user} unavailable: {err}");
                0
            }
        }
    }

    pub async fn proposal_count(&self) -> u64 {
        match self
            .read(ContractName::Governance, "proposalCount", vec![])
            .await
            .and_then(|out| out.u64(0))
        {
            Ok(count) => count,
            Err(err) => {
                warn!("proposalCount() unavailable: {err}");
                0
            }
        }
    }

    pub async fn proposal(&self, id: u64) -> Option<Proposal> {
        let result = async {
            let out = self
                .read(ContractName::Governance, "getProposal", vec![uint256(U256::from(id))])
                .await?;
            Ok::<_, ContractError>(Proposal {
                id,
                proposer: out.address(0)?,
                recipient: out.address(1)?,
                amount: out.uint(2)?,
                description: out.string(3)?,
                votes_for: out.u64(4)?,
                votes_against: out.u64(5)?,
                votes_required: out.u64(6)?,
                executed: out.bool(7)?,
                deadline: out.u64(8)?,
            })
        }
        .await;

        match result {
            Ok(proposal) => Some(proposal),
            Err(err) => {
                warn!("proposal {id} unavailable: {err}");
                None
            }
        }
    }

    /// Resolve a numeric user ID to its address.
    ///
    /// Uses the direct `getAddressById` lookup when the ABI has it; otherwise
    /// scans the user array, which is linear in the number of registered
    /// users. Hits are cached until the next `init`/`reset`.
    pub async fn address_for_id(&self, id: u64) -> Result<Option<Address>> {
        if id == 0 {
            return Ok(None);
        }
        if let Some(address) = self.id_cache.borrow().get(&id).copied() {
            return Ok(Some(address));
        }

        let (handle, _) = self.bound(ContractName::GlobalWay)?;
        let resolved = if handle.has_function("getAddressById") {
            let address = self
                .read(ContractName::GlobalWay, "getAddressById", vec![uint256(U256::from(id))])
                .await?
                .address(0)?;
            (!address.is_zero()).then_some(address)
        } else {
            self.scan_for_id(id).await?
        };

        if let Some(address) = resolved {
            self.id_cache.borrow_mut().insert(id, address);
        }
        Ok(resolved)
    }

    async fn scan_for_id(&self, id: u64) -> Result<Option<Address>> {
        let total = self
            .read(ContractName::GlobalWay, "getTotalUsers", vec![])
            .await?
            .u64(0)?;
        debug!("scanning {total} users for ID {id}");

        for index in 0..total {
            let candidate = self
                .read(ContractName::GlobalWay, "allUsers", vec![uint256(U256::from(index))])
                .await?
                .address(0)?;
            if candidate.is_zero() {
                continue;
            }
            let candidate_id = self
                .read(ContractName::GlobalWay, "getUserInfo", vec![DynSolValue::Address(candidate)])
                .await?
                .u64(1)?;
            self.id_cache.borrow_mut().insert(candidate_id, candidate);
            if candidate_id == id {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    // ── Write paths ──

    pub async fn register(&self, sponsor: Address) -> Result<TxHash> {
        self.bound(ContractName::GlobalWay)?;
        if sponsor.is_zero() {
            return Err(ContractError::InvalidInput("sponsor address is required".into()));
        }
        if self.signer() == Some(sponsor) {
            return Err(ContractError::InvalidInput("you cannot sponsor yourself".into()));
        }
        let fee = units::to_wei(&self.config.registration_fee)?;
        self.write(ContractName::GlobalWay, "register", vec![DynSolValue::Address(sponsor)], fee)
            .await
    }

    /// Activate `level`, paying its configured price. Returns `Ok(None)` and
    /// submits nothing while another purchase is still pending.
    pub async fn buy_level(&self, level: u8) -> Result<Option<TxHash>> {
        self.bound(ContractName::GlobalWay)?;
        let level = Level::new(level).ok_or(ContractError::InvalidLevel(level))?;
        let tier = self
            .config
            .level_tier(level)
            .ok_or(ContractError::InvalidLevel(level.get()))?;
        let price = units::to_wei(&tier.price)?;

        let Some(_guard) = self.purchase.try_begin() else {
            debug!("purchase already in progress; ignoring level {level}");
            return Ok(None);
        };

        let tx_hash = self
            .write(ContractName::GlobalWay, "activateLevel", vec![uint8(level.get())], price)
            .await?;
        Ok(Some(tx_hash))
    }

    pub async fn batch_activate(&self, users: &[Address], max_level: u8) -> Result<TxHash> {
        self.bound(ContractName::GlobalWay)?;
        let level = Level::new(max_level).ok_or(ContractError::InvalidLevel(max_level))?;
        if users.is_empty() {
            return Err(ContractError::InvalidInput("no users to activate".into()));
        }
        let users = users.iter().copied().map(DynSolValue::Address).collect();
        self.write(
            ContractName::GlobalWay,
            "batchActivateLevels",
            vec![DynSolValue::Array(users), uint8(level.get())],
            U256::ZERO,
        )
        .await
    }

    pub async fn pause(&self) -> Result<TxHash> {
        self.write(ContractName::GlobalWay, "pause", vec![], U256::ZERO).await
    }

    pub async fn unpause(&self) -> Result<TxHash> {
        self.write(ContractName::GlobalWay, "unpause", vec![], U256::ZERO).await
    }

    pub async fn set_project_authorization(&self, project: Address, authorized: bool) -> Result<TxHash> {
        self.write(
            ContractName::GlobalWay,
            "setProjectAuthorization",
            vec![DynSolValue::Address(project), DynSolValue::Bool(authorized)],
            U256::ZERO,
        )
        .await
    }

    pub async fn emergency_withdraw(&self) -> Result<TxHash> {
        self.write(ContractName::GlobalWay, "emergencyWithdraw", vec![], U256::ZERO)
            .await
    }

    pub async fn pay_quarterly(&self) -> Result<TxHash> {
        self.bound(ContractName::Quarterly)?;
        let fee = units::to_wei(&self.config.quarterly_fee)?;
        self.write(ContractName::Quarterly, "payQuarterlyActivity", vec![], fee)
            .await
    }

    pub async fn claim_pool_rewards(&self, pool: RewardPool) -> Result<TxHash> {
        self.write(pool.contract(), "claimRewards", vec![], U256::ZERO).await
    }

    pub async fn transfer_tokens(&self, to: Address, amount: &str) -> Result<TxHash> {
        self.bound(ContractName::Token)?;
        let amount = units::to_wei(amount)?;
        self.write(
            ContractName::Token,
            "transfer",
            vec![DynSolValue::Address(to), uint256(amount)],
            U256::ZERO,
        )
        .await
    }

    /// Buy `amount` GWT, paying the BNB cost quoted by the token contract.
    pub async fn buy_tokens(&self, amount: &str) -> Result<TxHash> {
        self.bound(ContractName::Token)?;
        let amount = units::to_wei(amount)?;
        let cost = self
            .read(ContractName::Token, "calculatePurchaseCost", vec![uint256(amount)])
            .await?
            .uint(0)?;
        self.write(ContractName::Token, "buyTokens", vec![uint256(amount)], cost)
            .await
    }

    pub async fn sell_tokens(&self, amount: &str) -> Result<TxHash> {
        self.bound(ContractName::Token)?;
        let amount = units::to_wei(amount)?;
        self.write(ContractName::Token, "sellTokens", vec![uint256(amount)], U256::ZERO)
            .await
    }

    pub async fn add_board_member(&self, member: Address) -> Result<TxHash> {
        self.write(
            ContractName::Governance,
            "addBoardMember",
            vec![DynSolValue::Address(member)],
            U256::ZERO,
        )
        .await
    }

    pub async fn remove_board_member(&self, member: Address) -> Result<TxHash> {
        self.write(
            ContractName::Governance,
            "removeBoardMember",
            vec![DynSolValue::Address(member)],
            U256::ZERO,
        )
        .await
    }

    pub async fn block_user(&self, user: Address, reason: &str) -> Result<TxHash> {
        self.bound(ContractName::Governance)?;
        let reason = reason.trim();
        let min = self.config.block_reason_min_len;
        if reason.chars().count() < min {
            return Err(ContractError::InvalidInput(format!(
                "reason must be at least {min} characters"
            )));
        }
        self.write(
            ContractName::Governance,
            "blockUser",
            vec![DynSolValue::Address(user), DynSolValue::String(reason.to_string())],
            U256::ZERO,
        )
        .await
    }

    pub async fn unblock_user(&self, user: Address) -> Result<TxHash> {
        self.write(
            ContractName::Governance,
            "unblockUser",
            vec![DynSolValue::Address(user)],
            U256::ZERO,
        )
        .await
    }

    pub async fn create_withdrawal_proposal(
        &self,
        recipient: Address,
        amount: &str,
        description: &str,
    ) -> Result<TxHash> {
        self.bound(ContractName::Governance)?;
        let amount = units::to_wei(amount)?;
        if amount.is_zero() {
            return Err(ContractError::InvalidAmount("amount must be greater than zero".into()));
        }
        if recipient.is_zero() {
            return Err(ContractError::InvalidInput("recipient address is required".into()));
        }
        self.write(
            ContractName::Governance,
            "createWithdrawalProposal",
            vec![
                DynSolValue::Address(recipient),
                uint256(amount),
                DynSolValue::String(description.trim().to_string()),
            ],
            U256::ZERO,
        )
        .await
    }

    pub async fn vote(&self, proposal_id: u64, support: bool) -> Result<TxHash> {
        self.write(
            ContractName::Governance,
            "vote",
            vec![uint256(U256::from(proposal_id)), DynSolValue::Bool(support)],
            U256::ZERO,
        )
        .await
    }

    pub async fn execute_proposal(&self, proposal_id: u64) -> Result<TxHash> {
        self.write(
            ContractName::Governance,
            "executeProposal",
            vec![uint256(U256::from(proposal_id))],
            U256::ZERO,
        )
        .await
    }
}

#[async_trait(?Send)]
impl<T: ChainTransport> OccupantSource for ContractsManager<T> {
    async fn occupant(&self, level: Level, global_index: u64) -> Option<Address> {
        self.get_matrix_occupant(level, global_index).await
    }
}
