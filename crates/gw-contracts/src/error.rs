use gw_api_types::ContractName;
use gw_chain_client::ChainError;
use thiserror::Error;

/// Longest revert text shown to the user before truncation.
const MAX_REVERT_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("{0} contract is not initialized")]
    NotInitialized(ContractName),

    #[error("{contract} ABI has no function {function}")]
    MissingFunction {
        contract: ContractName,
        function: String,
    },

    #[error("failed to encode {function}: {detail}")]
    Encode { function: String, detail: String },

    #[error("failed to decode {function}: {detail}")]
    Decode { function: String, detail: String },

    #[error("request rejected in wallet")]
    UserRejected,

    #[error("{0}")]
    Reverted(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid level: {0}")]
    InvalidLevel(u8),

    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ContractError>;

impl ContractError {
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, ContractError::UserRejected)
    }
}

impl From<ChainError> for ContractError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Provider(provider) if provider.is_user_rejected() => ContractError::UserRejected,
            ChainError::Provider(provider) => {
                let raw = provider
                    .data
                    .as_ref()
                    .and_then(|data| data.get("message"))
                    .and_then(|message| message.as_str())
                    .map(str::to_owned)
                    .unwrap_or(provider.message);
                ContractError::Reverted(friendly_revert(&raw))
            }
            ChainError::Decode { what, detail } => ContractError::Decode {
                function: what.to_string(),
                detail,
            },
            ChainError::Reverted(tx_hash) => {
                ContractError::Reverted(format!("Transaction {tx_hash} reverted"))
            }
        }
    }
}

/// Map raw revert text to a user-facing label; unknown messages pass
/// through without the `execution reverted:` prefix, truncated.
pub fn friendly_revert(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let known: [(&[&str], &str); 7] = [
        (&["insufficient funds", "insufficient balance"], "Insufficient funds for this transaction"),
        (&["already registered"], "This wallet is already registered"),
        (&["sponsor not registered", "invalid sponsor"], "Sponsor is not registered"),
        (
            &["unauthorized", "not authorized", "caller is not the owner", "only owner", "not board"],
            "You are not authorized to perform this action",
        ),
        (
            &["is paused", "contract paused", "pausable: paused", "enforcedpause"],
            "Contract is paused",
        ),
        (&["level already active"], "This level is already active"),
        (&["previous level"], "Activate the previous level first"),
    ];

    for (needles, label) in known {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return label.to_string();
        }
    }

    let stripped = raw
        .trim()
        .trim_start_matches("execution reverted:")
        .trim_start_matches("execution reverted")
        .trim();
    let stripped = if stripped.is_empty() { "Transaction failed" } else { stripped };

    if stripped.chars().count() > MAX_REVERT_CHARS {
        let cut: String = stripped.chars().take(MAX_REVERT_CHARS).collect();
        format!("{cut}\u{2026}")
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_chain_client::ProviderError;
    use serde_json::json;

    #[test]
    fn maps_known_reverts() {
        assert_eq!(
            friendly_revert("execution reverted: User already registered"),
            "This wallet is already registered"
        );
        assert_eq!(
            friendly_revert("err: insufficient funds for gas * price + value"),
            "Insufficient funds for this transaction"
        );
        assert_eq!(
            friendly_revert("execution reverted: Ownable: caller is not the owner"),
            "You are not authorized to perform this action"
        );
    }

    #[test]
    fn pause_label_ignores_negated_states() {
        assert_eq!(friendly_revert("execution reverted: Pausable: paused"), "Contract is paused");
        assert_eq!(friendly_revert("execution reverted: GlobalWay is paused"), "Contract is paused");
        assert_eq!(friendly_revert("execution reverted: EnforcedPause()"), "Contract is paused");
        assert_eq!(friendly_revert("execution reverted: Pausable: not paused"), "Pausable: not paused");
        assert_eq!(friendly_revert("execution reverted: already unpaused"), "already unpaused");
    }

    #[test]
    fn passes_unknown_reverts_truncated() {
        assert_eq!(friendly_revert("execution reverted: Too early"), "Too early");
        assert_eq!(friendly_revert("execution reverted"), "Transaction failed");
        let long = "x".repeat(300);
        let shown = friendly_revert(&long);
        assert_eq!(shown.chars().count(), MAX_REVERT_CHARS + 1);
    }

    #[test]
    fn prefers_nested_revert_message() {
        let err = ChainError::Provider(ProviderError {
            code: -32603,
            message: "Internal JSON-RPC error.".into(),
            data: Some(json!({ "message": "execution reverted: Contract paused" })),
        });
        assert_eq!(ContractError::from(err).to_string(), "Contract is paused");

        let rejected = ChainError::Provider(ProviderError::new(4001, "User denied"));
        assert!(ContractError::from(rejected).is_user_rejected());
    }
}
