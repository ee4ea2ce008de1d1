//! MCP server implementation.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::{
    backend::BackendClient,
    config::Config,
    error::AppError,
    services::{
        AssetRegistry, ExchangeBalanceRegistry, NotificationLog, PriceCache, StatusStore,
        TaskRegistry,
    },
    types::{
        ExchangeAccount, ExchangeSettings, ExchangeSetupPayload, KrakenAccountType, Location,
        SavingsFilter,
    },
};

/// Default page size of savings queries.
const DEFAULT_SAVINGS_PAGE: u64 = 50;

/// Exchange Balances MCP Server.
///
/// Provides tools for managing exchange accounts and inspecting their balances.
#[derive(Clone)]
pub struct ExchangeBalancesServer {
    registry: ExchangeBalanceRegistry,
    prices: Arc<PriceCache>,
    notifications: Arc<NotificationLog>,
    tool_router: ToolRouter<Self>,
}

impl ExchangeBalancesServer {
    /// Create a new Exchange Balances MCP Server.
    ///
    /// Note: No network calls are made here; configured exchanges are loaded
    /// by [`ExchangeBalancesServer::load_accounts`].
    pub fn new(config: Config) -> Result<Self, AppError> {
        tracing::info!("Initializing Exchange Balances MCP Server");

        let client = Arc::new(BackendClient::new(&config.backend_url, config.http_timeout)?);
        let tasks = Arc::new(TaskRegistry::new(client.clone(), config.task_poll_interval));
        let assets = Arc::new(AssetRegistry::with_ignored(config.ignored_assets));
        let prices = Arc::new(PriceCache::new());
        let notifications = Arc::new(NotificationLog::default());

        let registry = ExchangeBalanceRegistry::new(
            client,
            tasks,
            assets,
            prices.clone(),
            Arc::new(StatusStore::new()),
            notifications.clone(),
        );

        tracing::info!("Exchange Balances MCP Server initialized successfully");

        Ok(Self::from_parts(registry, prices, notifications))
    }

    /// Assemble a server around an existing registry.
    pub fn from_parts(
        registry: ExchangeBalanceRegistry,
        prices: Arc<PriceCache>,
        notifications: Arc<NotificationLog>,
    ) -> Self {
        Self { registry, prices, notifications, tool_router: Self::tool_router() }
    }

    pub fn registry(&self) -> &ExchangeBalanceRegistry {
        &self.registry
    }

    /// Load the exchanges configured on the backend.
    pub async fn load_accounts(&self) -> Result<usize, AppError> {
        self.registry.load_accounts().await
    }
}

/// Input parameters for tools scoped to one exchange location.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct LocationInput {
    /// Exchange location (e.g., "kraken", "binance").
    pub location: String,
}

/// Input parameters for the get_asset_breakdown tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct AssetInput {
    /// Asset identifier (e.g., "BTC").
    pub asset: String,
}

/// Input parameters for the get_location_totals tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct LocationTotalsInput {
    /// Multiplier applied to every value (e.g., a fiat exchange rate). Default: "1".
    #[serde(default)]
    pub rate: Option<String>,
}

/// Input parameters for the setup_exchange tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct SetupExchangeInput {
    /// Account label.
    pub name: String,
    /// Exchange location (e.g., "kraken").
    pub location: String,
    /// New label when editing.
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Kraken only: "starter", "intermediate" or "pro".
    #[serde(default)]
    pub kraken_account_type: Option<String>,
    /// Binance family only: markets to query.
    #[serde(default)]
    pub binance_markets: Option<Vec<String>>,
    /// OKX only: regional endpoint.
    #[serde(default)]
    pub okx_location: Option<String>,
    /// Edit an existing account instead of adding one.
    #[serde(default)]
    pub edit: bool,
}

/// Input parameters for the remove_exchange tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct RemoveExchangeInput {
    /// Account label.
    pub name: String,
    /// Exchange location.
    pub location: String,
}

/// Input parameters for the refresh_exchange_balances tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct RefreshBalancesInput {
    /// Location to refresh. Refreshes every configured account if omitted.
    #[serde(default)]
    pub location: Option<String>,
    /// Bypass the backend cache.
    #[serde(default)]
    pub ignore_cache: bool,
}

/// Input parameters for the update_prices tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct UpdatePricesInput {
    /// Asset identifier to unit price (decimal string).
    pub prices: HashMap<String, String>,
}

/// Input parameters for the query_savings tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct QuerySavingsInput {
    /// Binance-family location ("binance" or "binanceus").
    pub location: String,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Parse an exchange location.
fn parse_location(s: &str) -> Result<Location, McpError> {
    Location::from_str(s).map_err(|e| McpError::invalid_params(e, None))
}

/// Parse a decimal parameter.
fn parse_decimal(field: &str, s: &str) -> Result<Decimal, McpError> {
    Decimal::from_str(s.trim())
        .map_err(|e| McpError::invalid_params(format!("Invalid {} '{}': {}", field, s, e), None))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

impl SetupExchangeInput {
    fn into_payload(self) -> Result<ExchangeSetupPayload, McpError> {
        let location = parse_location(&self.location)?;
        let kraken_account_type = self
            .kraken_account_type
            .as_deref()
            .map(|s| s.parse::<KrakenAccountType>().map_err(|e| McpError::invalid_params(e, None)))
            .transpose()?;

        let mut payload = ExchangeSetupPayload::new(self.name, location);
        payload.new_name = self.new_name;
        payload.api_key = self.api_key;
        payload.api_secret = self.api_secret;
        payload.passphrase = self.passphrase;
        payload.settings = ExchangeSettings {
            kraken_account_type,
            binance_markets: self.binance_markets,
            okx_location: self.okx_location,
        };
        Ok(payload)
    }
}

#[tool_router]
impl ExchangeBalancesServer {
    /// List configured exchange accounts.
    #[tool(description = "List the configured exchange accounts")]
    pub async fn list_exchanges(&self) -> Result<String, McpError> {
        tracing::info!("list_exchanges called");
        to_json(&self.registry.accounts().await)
    }

    /// Total value held on each exchange, highest first.
    #[tool(description = "Get the total value held on each exchange, sorted by value descending")]
    pub async fn get_exchange_totals(&self) -> Result<String, McpError> {
        tracing::info!("get_exchange_totals called");
        to_json(&self.registry.exchange_totals().await)
    }

    /// Asset balances of one exchange.
    #[tool(description = "Get the asset balances of one exchange, sorted by value descending")]
    pub async fn get_exchange_balances(
        &self,
        Parameters(input): Parameters<LocationInput>,
    ) -> Result<String, McpError> {
        tracing::info!(location = %input.location, "get_exchange_balances called");

        let location = parse_location(&input.location)?;
        to_json(&self.registry.location_balances(location).await)
    }

    /// Holdings per asset summed across every exchange.
    #[tool(description = "Get the balance of every asset summed across all exchanges")]
    pub async fn get_aggregated_balances(&self) -> Result<String, McpError> {
        tracing::info!("get_aggregated_balances called");
        to_json(&self.registry.aggregated_balances().await)
    }

    /// Exchanges holding an asset.
    #[tool(description = "Get the exchanges holding an asset and the balance held on each")]
    pub async fn get_asset_breakdown(
        &self,
        Parameters(input): Parameters<AssetInput>,
    ) -> Result<String, McpError> {
        tracing::info!(asset = %input.asset, "get_asset_breakdown called");
        to_json(&self.registry.asset_breakdown(&input.asset).await)
    }

    /// Total per exchange after multiplying every value by a rate.
    #[tool(description = "Get the total value per exchange converted with a rate (e.g., USD to EUR)")]
    pub async fn get_location_totals(
        &self,
        Parameters(input): Parameters<LocationTotalsInput>,
    ) -> Result<String, McpError> {
        tracing::info!(rate = ?input.rate, "get_location_totals called");

        let rate = input
            .rate
            .as_deref()
            .map(|s| parse_decimal("rate", s))
            .transpose()?
            .unwrap_or(Decimal::ONE);

        to_json(&self.registry.converted_totals(|value| value * rate).await)
    }

    /// Suggested label for a new account.
    #[tool(description = "Get the suggested name for a new account on an exchange")]
    pub async fn get_exchange_nonce(
        &self,
        Parameters(input): Parameters<LocationInput>,
    ) -> Result<String, McpError> {
        tracing::info!(location = %input.location, "get_exchange_nonce called");

        let location = parse_location(&input.location)?;
        let nonce = self.registry.exchange_nonce(location).await;
        let name = self.registry.suggested_account_name(location).await;
        to_json(&json!({ "nonce": nonce, "suggested_name": name }))
    }

    /// Add or edit an exchange account.
    #[tool(description = "Add an exchange account, or edit one when `edit` is true")]
    pub async fn setup_exchange(
        &self,
        Parameters(input): Parameters<SetupExchangeInput>,
    ) -> Result<String, McpError> {
        tracing::info!(
            name = %input.name,
            location = %input.location,
            edit = input.edit,
            "setup_exchange called"
        );

        let edit = input.edit;
        let payload = input.into_payload()?;
        let success = self.registry.setup_account(payload, edit).await?;
        to_json(&json!({ "success": success }))
    }

    /// Remove an exchange account.
    #[tool(description = "Remove an exchange account and its balances")]
    pub async fn remove_exchange(
        &self,
        Parameters(input): Parameters<RemoveExchangeInput>,
    ) -> Result<String, McpError> {
        tracing::info!(name = %input.name, location = %input.location, "remove_exchange called");

        let location = parse_location(&input.location)?;
        let account = self
            .registry
            .accounts()
            .await
            .into_iter()
            .find(|account| account.matches(&input.name, location))
            .unwrap_or_else(|| ExchangeAccount::new(input.name.clone(), location));

        let success = self.registry.remove_account(&account).await?;
        to_json(&json!({ "success": success }))
    }

    /// Refresh balances from the exchanges.
    #[tool(description = "Refresh the balances of one exchange, or of every configured account")]
    pub async fn refresh_exchange_balances(
        &self,
        Parameters(input): Parameters<RefreshBalancesInput>,
    ) -> Result<String, McpError> {
        tracing::info!(
            location = ?input.location,
            ignore_cache = input.ignore_cache,
            "refresh_exchange_balances called"
        );

        match input.location {
            Some(location) => {
                let location = parse_location(&location)?;
                let outcome = self.registry.fetch_balances(location, input.ignore_cache).await;
                to_json(&json!({ "outcome": outcome }))
            }
            None => {
                self.registry.fetch_all_configured_balances(input.ignore_cache).await;
                to_json(&self.registry.exchange_totals().await)
            }
        }
    }

    /// Update asset prices and re-value every balance.
    #[tool(description = "Set current asset prices and re-value all exchange balances")]
    pub async fn update_prices(
        &self,
        Parameters(input): Parameters<UpdatePricesInput>,
    ) -> Result<String, McpError> {
        tracing::info!(count = input.prices.len(), "update_prices called");

        let prices = input
            .prices
            .iter()
            .map(|(asset, price)| Ok((asset.clone(), parse_decimal("price", price)?)))
            .collect::<Result<HashMap<String, Decimal>, McpError>>()?;

        if prices.values().any(|price| price.is_sign_negative()) {
            return Err(McpError::invalid_params("Prices cannot be negative", None));
        }

        self.prices.update(&prices);
        self.registry.apply_price_update(&prices).await;
        to_json(&self.registry.exchange_totals().await)
    }

    /// Cached savings-interest records.
    #[tool(description = "Query cached savings interest records of a Binance-family exchange")]
    pub async fn query_savings(
        &self,
        Parameters(input): Parameters<QuerySavingsInput>,
    ) -> Result<String, McpError> {
        tracing::info!(location = %input.location, "query_savings called");

        let location = parse_location(&input.location)?;
        let filter = SavingsFilter::cached_page(
            location,
            input.limit.unwrap_or(DEFAULT_SAVINGS_PAGE),
            input.offset.unwrap_or(0),
        );

        let page = self.registry.fetch_savings_page(filter).await?;
        to_json(&page)
    }

    /// Refresh savings interest of every Binance-family exchange.
    #[tool(description = "Refresh savings interest records of all Binance-family exchanges")]
    pub async fn refresh_savings(&self) -> Result<String, McpError> {
        tracing::info!("refresh_savings called");

        self.registry.refresh_all_savings(true).await;
        to_json(&json!({ "status": self.registry.savings_status() }))
    }

    /// Recent user-facing notifications and messages.
    #[tool(description = "List recent errors and notifications raised while syncing exchanges")]
    pub async fn recent_notifications(&self) -> Result<String, McpError> {
        to_json(&self.notifications.recent())
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for ExchangeBalancesServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "exchange-balances-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Exchange Balances MCP Server. Provides tools for managing exchange accounts, \
                 refreshing their balances and inspecting aggregated holdings."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        assert_eq!(parse_location("kraken").unwrap(), Location::Kraken);
        assert!(parse_location("nowhere").is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("rate", " 0.92 ").unwrap(), Decimal::new(92, 2));
        let err = parse_decimal("rate", "abc").unwrap_err();
        assert!(err.message.contains("Invalid rate"));
    }

    #[test]
    fn test_setup_input_into_payload() {
        let input = SetupExchangeInput {
            name: "main".to_string(),
            location: "Kraken".to_string(),
            new_name: None,
            api_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            passphrase: None,
            kraken_account_type: Some("pro".to_string()),
            binance_markets: None,
            okx_location: None,
            edit: false,
        };

        let payload = input.into_payload().unwrap();
        assert_eq!(payload.location, Location::Kraken);
        assert_eq!(payload.settings.kraken_account_type, Some(KrakenAccountType::Pro));
        assert_eq!(payload.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_setup_input_rejects_bad_account_type() {
        let input = SetupExchangeInput {
            name: "main".to_string(),
            location: "kraken".to_string(),
            new_name: None,
            api_key: None,
            api_secret: None,
            passphrase: None,
            kraken_account_type: Some("platinum".to_string()),
            binance_markets: None,
            okx_location: None,
            edit: false,
        };

        assert!(input.into_payload().is_err());
    }
}
