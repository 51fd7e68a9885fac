//! Trade execution and portfolio position engine: append-only trade ledger,
//! per-(user, ticker) positions with moving-average cost, P&L against live
//! market quotes.

pub mod api;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod pnl;
pub mod portfolio;
pub mod quotes;
pub mod types;
