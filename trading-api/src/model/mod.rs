pub mod execution;
pub mod ids;
pub mod instrument;
pub mod ledger;
pub mod order;
pub mod portfolio;
pub mod report;
pub mod score;
pub mod settings;
pub mod weekly;
