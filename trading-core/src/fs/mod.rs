pub mod ledger;
pub mod paths;
pub mod persistence;

pub use ledger::JsonLedgerStore;
pub use paths::PathManager;
pub use persistence::{load_state, load_state_if_exists, save_state};
