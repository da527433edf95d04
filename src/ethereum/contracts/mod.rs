//! Smart contract bindings.

pub mod ledger;

pub use ledger::{AlloyLedger, LedgerContract, LedgerTarget};
