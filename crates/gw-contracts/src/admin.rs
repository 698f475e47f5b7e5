//! Role-gated administrative commands.

use alloy_primitives::{Address, U256};
use gw_api_types::{Role, RoleSet, TxHash};
use gw_chain_client::ChainTransport;
use std::rc::Rc;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ContractError;
use crate::manager::ContractsManager;
use crate::units;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Pause,
    Unpause,
    EmergencyWithdraw,
    AuthorizeProject { project: Address, authorized: bool },
    AddBoardMember(Address),
    RemoveBoardMember(Address),
    BatchActivate { users: Vec<Address>, max_level: u8 },
    BlockUser { user: Address, reason: String },
    UnblockUser(Address),
    CreateWithdrawal {
        recipient: Address,
        amount: String,
        description: String,
    },
    Vote { proposal_id: u64, support: bool },
    ExecuteProposal(u64),
}

impl AdminCommand {
    pub fn required_role(&self) -> Role {
        match self {
            AdminCommand::Pause
            | AdminCommand::Unpause
            | AdminCommand::EmergencyWithdraw
            | AdminCommand::AuthorizeProject { .. }
            | AdminCommand::AddBoardMember(_)
            | AdminCommand::RemoveBoardMember(_) => Role::Owner,
            AdminCommand::BatchActivate { .. } => Role::Founder,
            AdminCommand::BlockUser { .. }
            | AdminCommand::UnblockUser(_)
            | AdminCommand::CreateWithdrawal { .. }
            | AdminCommand::Vote { .. }
            | AdminCommand::ExecuteProposal(_) => Role::Board,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminCommand::Pause => "pause contract",
            AdminCommand::Unpause => "unpause contract",
            AdminCommand::EmergencyWithdraw => "emergency withdraw",
            AdminCommand::AuthorizeProject { .. } => "project authorization",
            AdminCommand::AddBoardMember(_) => "add board member",
            AdminCommand::RemoveBoardMember(_) => "remove board member",
            AdminCommand::BatchActivate { .. } => "batch level activation",
            AdminCommand::BlockUser { .. } => "block user",
            AdminCommand::UnblockUser(_) => "unblock user",
            AdminCommand::CreateWithdrawal { .. } => "withdrawal proposal",
            AdminCommand::Vote { .. } => "vote",
            AdminCommand::ExecuteProposal(_) => "execute proposal",
        }
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0} requires the {1:?} role")]
    Forbidden(&'static str, Role),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl AdminError {
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, AdminError::Contract(err) if err.is_user_rejected())
    }
}

/// Votes a withdrawal of `amount` (wei) needs, as shown before submitting.
pub fn required_votes(amount: U256) -> u32 {
    let one_bnb = U256::from(10u64).pow(U256::from(units::DECIMALS));
    if amount < one_bnb {
        3
    } else if amount < one_bnb * U256::from(10u8) {
        5
    } else {
        7
    }
}

/// Checks the caller's roles before forwarding a command to the contracts.
pub struct AdminManager<T> {
    contracts: Rc<ContractsManager<T>>,
    roles: RoleSet,
}

impl<T: ChainTransport> AdminManager<T> {
    pub fn new(contracts: Rc<ContractsManager<T>>, roles: RoleSet) -> Self {
        Self { contracts, roles }
    }

    pub fn roles(&self) -> RoleSet {
        self.roles
    }

    pub fn can(&self, command: &AdminCommand) -> bool {
        self.roles.satisfies(command.required_role())
    }

    pub async fn dispatch(&self, command: AdminCommand) -> Result<TxHash, AdminError> {
        let required = command.required_role();
        if !self.roles.satisfies(required) {
            warn!("admin command {} refused: missing {:?} role", command.label(), required);
            return Err(AdminError::Forbidden(command.label(), required));
        }
        let label = command.label();

        let contracts = &self.contracts;
        let tx_hash = match command {
            AdminCommand::Pause => contracts.pause().await?,
            AdminCommand::Unpause => contracts.unpause().await?,
            AdminCommand::EmergencyWithdraw => contracts.emergency_withdraw().await?,
            AdminCommand::AuthorizeProject { project, authorized } => {
                contracts.set_project_authorization(project, authorized).await?
            }
            AdminCommand::AddBoardMember(member) => contracts.add_board_member(member).await?,
            AdminCommand::RemoveBoardMember(member) => contracts.remove_board_member(member).await?,
            AdminCommand::BatchActivate { users, max_level } => {
                contracts.batch_activate(&users, max_level).await?
            }
            AdminCommand::BlockUser { user, reason } => {
                let min = contracts.config().block_reason_min_len;
                if reason.trim().chars().count() < min {
                    return Err(AdminError::InvalidInput(format!(
                        "Reason must be at least {min} characters"
                    )));
                }
                contracts.block_user(user, &reason).await?
            }
            AdminCommand::UnblockUser(user) => contracts.unblock_user(user).await?,
            AdminCommand::CreateWithdrawal {
                recipient,
                amount,
                description,
            } => {
                contracts
                    .create_withdrawal_proposal(recipient, &amount, &description)
                    .await?
            }
            AdminCommand::Vote { proposal_id, support } => contracts.vote(proposal_id, support).await?,
            AdminCommand::ExecuteProposal(id) => contracts.execute_proposal(id).await?,
        };

        info!("admin command {label} confirmed: {tx_hash}");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{MockChain, manager_with, user};

    fn admin(roles: RoleSet) -> (AdminManager<MockChain>, Rc<MockChain>) {
        let (manager, chain) = manager_with(MockChain::default());
        manager.init(chain.clone());
        (AdminManager::new(Rc::new(manager), roles), chain)
    }

    #[test]
    fn vote_thresholds_follow_amount() {
        assert_eq!(required_votes(units::to_wei("0.5").unwrap()), 3);
        assert_eq!(required_votes(units::to_wei("1").unwrap()), 5);
        assert_eq!(required_votes(units::to_wei("9.99").unwrap()), 5);
        assert_eq!(required_votes(units::to_wei("10").unwrap()), 7);
    }

    #[test]
    fn roles_gate_commands() {
        assert_eq!(AdminCommand::Pause.required_role(), Role::Owner);
        assert_eq!(
            AdminCommand::BatchActivate { users: vec![], max_level: 1 }.required_role(),
            Role::Founder
        );
        assert_eq!(AdminCommand::ExecuteProposal(1).required_role(), Role::Board);
    }

    #[tokio::test]
    async fn board_member_cannot_pause() {
        let (admin, chain) = admin(RoleSet { board: true, ..Default::default() });
        assert!(!admin.can(&AdminCommand::Pause));

        let err = admin.dispatch(AdminCommand::Pause).await.unwrap_err();
        assert!(matches!(err, AdminError::Forbidden(_, Role::Owner)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn short_block_reason_never_reaches_chain() {
        let (admin, chain) = admin(RoleSet { board: true, ..Default::default() });
        let err = admin
            .dispatch(AdminCommand::BlockUser {
                user: user(5),
                reason: "  spam  ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::InvalidInput(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn owner_dispatches_every_tier() -> anyhow::Result<()> {
        let (admin, chain) = admin(RoleSet { owner: true, ..Default::default() });

        admin.dispatch(AdminCommand::Pause).await?;
        admin
            .dispatch(AdminCommand::BatchActivate {
                users: vec![user(5), user(6)],
                max_level: 4,
            })
            .await?;
        admin
            .dispatch(AdminCommand::Vote {
                proposal_id: 2,
                support: true,
            })
            .await?;

        let functions: Vec<String> = chain.sent().into_iter().map(|tx| tx.function).collect();
        assert_eq!(functions, ["pause", "batchActivateLevels", "vote"]);
        Ok(())
    }

    #[tokio::test]
    async fn rejection_is_reported_as_such() {
        let chain = MockChain::default();
        chain.reject_sends();
        let (manager, chain) = manager_with(chain);
        manager.init(chain);
        let admin = AdminManager::new(Rc::new(manager), RoleSet { owner: true, ..Default::default() });

        let err = admin.dispatch(AdminCommand::Unpause).await.unwrap_err();
        assert!(err.is_user_rejected());
    }
}
