//! Exchange Balances MCP Server Library
//!
//! A Model Context Protocol server tracking the balances of exchange accounts
//! configured on a portfolio backend.
//!
//! # Features
//!
//! - **Account Management**: Add, edit and remove exchange accounts
//! - **Balance Sync**: Refresh balances through backend tasks, one location at a time
//! - **Aggregation**: Totals per exchange, per asset, and per asset across exchanges
//! - **Savings Interest**: Cached and live savings-interest history for Binance exchanges
//!
//! # Example
//!
//! ```rust,ignore
//! use exchange_balances_mcp::{Config, ExchangeBalancesServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = ExchangeBalancesServer::new(config)?;
//!     server.load_accounts().await?;
//!     // Run server...
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod mcp;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use mcp::ExchangeBalancesServer;
pub use services::{ExchangeBalanceRegistry, FetchOutcome};
