//! Exchange account types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported exchange venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Binance,
    BinanceUs,
    Bitcoinde,
    Bitfinex,
    Bitmex,
    Bitpanda,
    Bitstamp,
    Bybit,
    Coinbase,
    CoinbasePrime,
    Gemini,
    Htx,
    Iconomi,
    IndependentReserve,
    Kraken,
    Kucoin,
    Okx,
    Poloniex,
    Woo,
}

impl Location {
    /// Every supported location, in declaration order.
    pub const ALL: [Location; 19] = [
        Location::Binance,
        Location::BinanceUs,
        Location::Bitcoinde,
        Location::Bitfinex,
        Location::Bitmex,
        Location::Bitpanda,
        Location::Bitstamp,
        Location::Bybit,
        Location::Coinbase,
        Location::CoinbasePrime,
        Location::Gemini,
        Location::Htx,
        Location::Iconomi,
        Location::IndependentReserve,
        Location::Kraken,
        Location::Kucoin,
        Location::Okx,
        Location::Poloniex,
        Location::Woo,
    ];

    /// Identifier used on the wire and in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Binance => "binance",
            Location::BinanceUs => "binanceus",
            Location::Bitcoinde => "bitcoinde",
            Location::Bitfinex => "bitfinex",
            Location::Bitmex => "bitmex",
            Location::Bitpanda => "bitpanda",
            Location::Bitstamp => "bitstamp",
            Location::Bybit => "bybit",
            Location::Coinbase => "coinbase",
            Location::CoinbasePrime => "coinbaseprime",
            Location::Gemini => "gemini",
            Location::Htx => "htx",
            Location::Iconomi => "iconomi",
            Location::IndependentReserve => "independentreserve",
            Location::Kraken => "kraken",
            Location::Kucoin => "kucoin",
            Location::Okx => "okx",
            Location::Poloniex => "poloniex",
            Location::Woo => "woo",
        }
    }

    /// Human-readable name of the venue.
    pub fn label(&self) -> &'static str {
        match self {
            Location::Binance => "Binance",
            Location::BinanceUs => "Binance US",
            Location::Bitcoinde => "Bitcoin.de",
            Location::Bitfinex => "Bitfinex",
            Location::Bitmex => "BitMEX",
            Location::Bitpanda => "Bitpanda",
            Location::Bitstamp => "Bitstamp",
            Location::Bybit => "Bybit",
            Location::Coinbase => "Coinbase",
            Location::CoinbasePrime => "Coinbase Prime",
            Location::Gemini => "Gemini",
            Location::Htx => "HTX",
            Location::Iconomi => "ICONOMI",
            Location::IndependentReserve => "Independent Reserve",
            Location::Kraken => "Kraken",
            Location::Kucoin => "KuCoin",
            Location::Okx => "OKX",
            Location::Poloniex => "Poloniex",
            Location::Woo => "WOO X",
        }
    }

    /// Binance and Binance US share the savings-interest endpoints.
    pub fn is_binance_family(&self) -> bool {
        matches!(self, Location::Binance | Location::BinanceUs)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Location::ALL
            .iter()
            .find(|location| location.as_str() == wanted)
            .copied()
            .ok_or_else(|| format!("Unsupported exchange location: {}", s))
    }
}

/// Kraken account tier, which determines the API rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KrakenAccountType {
    Starter,
    Intermediate,
    Pro,
}

impl std::str::FromStr for KrakenAccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starter" => Ok(KrakenAccountType::Starter),
            "intermediate" => Ok(KrakenAccountType::Intermediate),
            "pro" => Ok(KrakenAccountType::Pro),
            _ => Err(format!("Invalid Kraken account type: {}", s)),
        }
    }
}

/// Exchange-specific account settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kraken_account_type: Option<KrakenAccountType>,
    /// Markets queried for Binance-family trades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binance_markets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub okx_location: Option<String>,
}

/// One configured exchange connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeAccount {
    /// User label, unique together with `location`.
    pub name: String,
    pub location: Location,
    #[serde(flatten)]
    pub settings: ExchangeSettings,
}

impl ExchangeAccount {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self { name: name.into(), location, settings: ExchangeSettings::default() }
    }

    /// Whether this is the account identified by `name` on `location`.
    pub fn matches(&self, name: &str, location: Location) -> bool {
        self.name == name && self.location == location
    }
}

/// Payload sent to the backend when adding or editing an exchange.
///
/// Credentials are only ever forwarded to the backend; they never reach the
/// in-memory account list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSetupPayload {
    pub name: String,
    /// Replacement name, only meaningful when editing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(flatten)]
    pub settings: ExchangeSettings,
}

impl ExchangeSetupPayload {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            new_name: None,
            location,
            api_key: None,
            api_secret: None,
            passphrase: None,
            settings: ExchangeSettings::default(),
        }
    }
}
