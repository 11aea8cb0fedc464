use clrelay_naming::{resolve_locations, LocationConfig, NameResolver, SchemaLocationPair};
use clrelay_schema::SchemaCompiler;
use tracing::info;

use crate::error::Result;
use crate::state::{ContractValidators, RelayState};

/// Fetch and compile both contract schemas concurrently.
pub async fn load_contracts(
    locations: &SchemaLocationPair,
    compiler: &SchemaCompiler,
) -> Result<ContractValidators> {
    let (request, receipt) = tokio::try_join!(
        compiler.compile_url(&locations.request_schema_url),
        compiler.compile_url(&locations.receipt_schema_url),
    )?;
    Ok(ContractValidators { request, receipt })
}

/// Locate, compile and install the contract schemas.
///
/// The state only becomes ready when every step succeeds.
pub async fn bootstrap(
    config: &LocationConfig,
    resolver: &NameResolver,
    compiler: &SchemaCompiler,
    state: &RelayState,
) -> Result<SchemaLocationPair> {
    let locations = resolve_locations(config, resolver).await?;
    let contracts = load_contracts(&locations, compiler).await?;
    state.install(contracts)?;

    info!(
        request = %locations.request_schema_url,
        receipt = %locations.receipt_schema_url,
        "contract schemas loaded"
    );
    Ok(locations)
}
