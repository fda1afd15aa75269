pub mod core;
pub mod ledger;
