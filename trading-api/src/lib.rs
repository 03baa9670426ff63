//! # Trading API
//!
//! Domain model and collaborator interfaces shared by every crate of the
//! weekly momentum trader.
//!
//! ## Modules
//! - `model`: Instruments, portfolio ledger, order plans, weekly targets and settings.
//! - `traits`: Narrow interfaces to the market data provider, order executor,
//!   ledger store and report sink.
//! - `error`: The error taxonomy shared across the decision engine.

pub mod error;
pub mod model;
pub mod traits;

pub use error::{ExecutionRejected, ExecutorError, LedgerError, ProviderError, ReportError, RiskError};
pub use model::execution::{Fill, OrderOutcome};
pub use model::ids::InstrumentId;
pub use model::instrument::{Instrument, MarketSnapshot};
pub use model::ledger::{LedgerHistory, TradeLedgerEntry};
pub use model::order::{OrderPlan, OrderRationale, PlannedOrder, Side};
pub use model::portfolio::{Portfolio, Position};
pub use model::report::CycleSummary;
pub use model::score::CandidateScore;
pub use model::settings::{FeeSchedule, RiskLimits, ScoringModelKind, StrategyParams};
pub use model::weekly::{WeeklySchedule, WeeklyTarget};
pub use traits::executor::OrderExecutor;
pub use traits::ledger::LedgerStore;
pub use traits::market_data::MarketDataProvider;
pub use traits::report::ReportSink;
