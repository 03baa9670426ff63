//! Order executors that never leave the process.
//!
//! - `paper`: fills at the reference price and charges the fee schedule, with
//!   optional partial fills, rejections and outages for rehearsals.
//! - `dry_run`: logs every order and fills none of them.

pub mod dry_run;
pub mod paper;

pub use dry_run::DryRunExecutor;
pub use paper::PaperExecutor;
