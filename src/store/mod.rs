pub mod accounts;
pub mod ledger;
pub mod tiers;

pub use accounts::AccountStore;
pub use ledger::LedgerStore;
pub use tiers::TierStore;
