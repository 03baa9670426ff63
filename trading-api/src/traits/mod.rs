pub mod executor;
pub mod ledger;
pub mod market_data;
pub mod report;
