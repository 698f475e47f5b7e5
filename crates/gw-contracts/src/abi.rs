//! Runtime ABI loading and dynamic call encoding.

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use gw_api_types::ContractName;
use gw_config::AppConfig;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{ContractError, Result};

/// Fetches ABI documents by path (HTTP in the browser).
#[async_trait(?Send)]
pub trait AbiSource {
    async fn fetch(&self, path: &str) -> anyhow::Result<String>;
}

/// Parse an ABI file: either `{ "abi": [...] }` or a bare entry array.
/// An empty list is rejected.
pub fn parse_abi_document(raw: &str) -> anyhow::Result<JsonAbi> {
    let document: Value = serde_json::from_str(raw)?;
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("abi") {
            Some(Value::Array(entries)) => entries,
            _ => anyhow::bail!("document has no abi array"),
        },
        _ => anyhow::bail!("document is neither an object nor an array"),
    };
    if entries.is_empty() {
        anyhow::bail!("abi array is empty");
    }
    Ok(serde_json::from_value(Value::Array(entries))?)
}

/// ABIs that loaded successfully, keyed by contract.
#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    abis: BTreeMap<ContractName, JsonAbi>,
}

impl AbiRegistry {
    pub fn insert(&mut self, name: ContractName, abi: JsonAbi) {
        self.abis.insert(name, abi);
    }

    pub fn get(&self, name: ContractName) -> Option<&JsonAbi> {
        self.abis.get(&name)
    }

    pub fn len(&self) -> usize {
        self.abis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abis.is_empty()
    }

    /// Try each configured candidate path per contract, first success wins.
    /// Missing or malformed files leave that contract without an ABI.
    pub async fn load<S>(source: &S, config: &AppConfig) -> Self
    where
        S: AbiSource + ?Sized,
    {
        let mut registry = AbiRegistry::default();
        for name in ContractName::ALL {
            let mut loaded = false;
            for path in config.abi_candidates(name) {
                match source.fetch(&path).await {
                    Ok(raw) => match parse_abi_document(&raw) {
                        Ok(abi) => {
                            debug!("loaded {name} ABI from {path}");
                            registry.insert(name, abi);
                            loaded = true;
                            break;
                        }
                        Err(err) => warn!("malformed {name} ABI at {path}: {err}"),
                    },
                    Err(err) => debug!("no {name} ABI at {path}: {err}"),
                }
            }
            if !loaded {
                warn!("{name} ABI not found; contract disabled");
            }
        }
        info!("loaded {}/{} contract ABIs", registry.len(), ContractName::ALL.len());
        registry
    }
}

/// A contract bound to its deployed address and loaded ABI.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub name: ContractName,
    pub address: Address,
    abi: JsonAbi,
}

impl ContractHandle {
    pub fn new(name: ContractName, address: Address, abi: JsonAbi) -> Self {
        Self { name, address, abi }
    }

    pub fn has_function(&self, function: &str) -> bool {
        self.abi.function(function).is_some_and(|overloads| !overloads.is_empty())
    }

    /// Resolve `function`, picking the overload whose arity matches.
    fn function(&self, function: &str, arity: usize) -> Result<&Function> {
        self.abi
            .function(function)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
            .ok_or_else(|| ContractError::MissingFunction {
                contract: self.name,
                function: function.to_string(),
            })
    }

    pub fn encode(&self, function: &str, args: &[DynSolValue]) -> Result<Bytes> {
        let func = self.function(function, args.len())?;
        func.abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|err| ContractError::Encode {
                function: function.to_string(),
                detail: err.to_string(),
            })
    }

    pub fn decode(&self, function: &str, arity: usize, data: &[u8]) -> Result<Vec<DynSolValue>> {
        let func = self.function(function, arity)?;
        func.abi_decode_output(data).map_err(|err| ContractError::Decode {
            function: function.to_string(),
            detail: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use std::collections::HashMap;

    struct Files(HashMap<String, String>);

    #[async_trait(?Send)]
    impl AbiSource for Files {
        async fn fetch(&self, path: &str) -> anyhow::Result<String> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 {path}"))
        }
    }

    fn token_abi_json() -> String {
        let abi = JsonAbi::parse(["function balanceOf(address owner) view returns (uint256)"]).unwrap();
        serde_json::to_string(&abi).unwrap()
    }

    #[test]
    fn accepts_wrapped_and_bare_documents() {
        let bare = token_abi_json();
        let wrapped = format!(r#"{{"contractName":"Token","abi":{bare}}}"#);
        assert!(parse_abi_document(&bare).is_ok());
        assert!(parse_abi_document(&wrapped).is_ok());
        assert!(parse_abi_document("[]").is_err());
        assert!(parse_abi_document(r#"{"abi":{}}"#).is_err());
        assert!(parse_abi_document("not json").is_err());
    }

    #[tokio::test]
    async fn falls_back_through_candidate_paths() {
        let config = AppConfig::opbnb();
        let files = Files(HashMap::from([
            ("./contracts/Token.json".to_string(), "[]".to_string()),
            ("./abi/Token.json".to_string(), token_abi_json()),
            ("/contracts/Stats.json".to_string(), token_abi_json()),
        ]));

        let registry = AbiRegistry::load(&files, &config).await;
        assert_eq!(registry.len(), 2);
        assert!(registry.get(ContractName::Token).is_some());
        assert!(registry.get(ContractName::Stats).is_some());
        assert!(registry.get(ContractName::GlobalWay).is_none());
    }

    #[test]
    fn encodes_and_decodes_calls() {
        let abi = JsonAbi::parse(["function balanceOf(address owner) view returns (uint256)"]).unwrap();
        let handle = ContractHandle::new(ContractName::Token, Address::repeat_byte(1), abi);

        let data = handle
            .encode("balanceOf", &[DynSolValue::Address(Address::repeat_byte(2))])
            .unwrap();
        assert_eq!(data.len(), 4 + 32);

        let output = U256::from(42u8).to_be_bytes::<32>();
        let decoded = handle.decode("balanceOf", 1, &output).unwrap();
        assert_eq!(decoded[0].as_uint().map(|(v, _)| v), Some(U256::from(42u8)));

        assert!(matches!(
            handle.encode("transfer", &[]),
            Err(ContractError::MissingFunction { .. })
        ));
    }
}
