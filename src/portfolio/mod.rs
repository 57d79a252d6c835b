//! Portfolio assembly
//!
//! - `price.rs` - Price feed collaborators
//! - `aggregator.rs` - Symbol grouping and valuation
//! - `refresh.rs` - Refresh state machine and cycle

mod aggregator;
mod price;
mod refresh;

pub use aggregator::{Aggregation, AggregationWarning, Asset, NetworkHolding, WalletAggregator};
pub use price::{CoinGeckoPriceFeed, PriceFeed, PriceQuote, StaticPriceFeed};
pub use refresh::{
    PortfolioRefresh, PortfolioSnapshot, RefreshMachine, RefreshState, UnrefreshedBalance,
};
