//! Business logic services module.

pub mod aggregation;
pub mod assets;
pub mod exchange_balances;
pub mod notifications;
pub mod prices;
pub mod savings;
pub mod status;
pub mod tasks;

pub use assets::{AssetRegistry, AssetResolver};
pub use exchange_balances::{ExchangeBalanceRegistry, FetchOutcome};
pub use notifications::{Message, Notice, Notification, NotificationLog, Notifier};
pub use prices::{PriceCache, PriceFeed};
pub use status::{Section, Status, StatusStore};
pub use tasks::{PendingTask, TaskRegistry};
