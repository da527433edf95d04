//! Type definitions module.
//!
//! Contains shared types used across the application.

pub mod ledger;
pub mod units;

pub use ledger::*;
pub use units::*;
