//! Market data providers that need no vendor connection.
//!
//! - `file`: serves a `MarketSnapshot` stored as JSON in the data directory.
//! - `random_walk`: generates seeded random-walk histories for demos and dry runs.

pub mod file;
pub mod random_walk;

pub use file::FileFeed;
pub use random_walk::RandomWalkFeed;
