//! MCP server module.
//!
//! Contains the MCP server implementation with tool handlers.

pub mod server;

pub use server::ExchangeBalancesServer;
pub use server::{
    AssetInput, LocationInput, LocationTotalsInput, QuerySavingsInput, RefreshBalancesInput,
    RemoveExchangeInput, SetupExchangeInput, UpdatePricesInput,
};
