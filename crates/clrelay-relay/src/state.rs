use std::sync::OnceLock;

use clrelay_schema::CompiledValidator;

use crate::error::{RelayError, Result};
use crate::executor::FetchExecutor;

/// The compiled request and receipt contracts.
#[derive(Debug)]
pub struct ContractValidators {
    pub request: CompiledValidator,
    pub receipt: CompiledValidator,
}

/// Shared state for every relay request.
///
/// Validators are installed once, after both schemas compile; until then the
/// relay is not ready.
#[derive(Debug)]
pub struct RelayState {
    contracts: OnceLock<ContractValidators>,
    executor: FetchExecutor,
}

impl RelayState {
    pub fn new(executor: FetchExecutor) -> Self {
        Self {
            contracts: OnceLock::new(),
            executor,
        }
    }

    /// Install validators. Fails if they were already installed.
    pub fn install(&self, contracts: ContractValidators) -> Result<()> {
        self.contracts
            .set(contracts)
            .map_err(|_| RelayError::AlreadyInstalled)
    }

    pub fn contracts(&self) -> Option<&ContractValidators> {
        self.contracts.get()
    }

    pub fn is_ready(&self) -> bool {
        self.contracts.get().is_some()
    }

    pub fn executor(&self) -> &FetchExecutor {
        &self.executor
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clrelay_schema::{DocumentFetcher, FetcherConfig, SchemaCompiler};
    use serde_json::json;

    use super::*;

    async fn contracts() -> ContractValidators {
        let fetcher = Arc::new(DocumentFetcher::new(FetcherConfig::default()).expect("fetcher"));
        let compiler = SchemaCompiler::new(fetcher);
        ContractValidators {
            request: compiler.compile(&json!({ "type": "object" })).await.expect("request"),
            receipt: compiler.compile(&json!({ "type": "object" })).await.expect("receipt"),
        }
    }

    #[tokio::test]
    async fn ready_only_after_install() {
        let state = RelayState::new(FetchExecutor::new().expect("executor"));
        assert!(!state.is_ready());
        assert!(state.contracts().is_none());

        state.install(contracts().await).expect("install");
        assert!(state.is_ready());
        assert!(state.contracts().is_some());
    }

    #[tokio::test]
    async fn second_install_is_rejected() {
        let state = RelayState::new(FetchExecutor::new().expect("executor"));
        state.install(contracts().await).expect("first install");

        let err = state.install(contracts().await).unwrap_err();
        assert!(matches!(err, RelayError::AlreadyInstalled));
    }
}
