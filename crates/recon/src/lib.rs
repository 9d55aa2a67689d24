//! `tokenmend-recon`: rule-driven rewriting of TokenTax ledger exports.
//!
//! Records sharing an exchange id hash form a group. Each group is matched
//! against an ordered rule set; the first matching rule's actions rewrite the
//! group into trades, migrations, staking income or net transfers. Pure
//! engine crate apart from CSV text handling: callers do the file IO.

pub mod actions;
pub mod config;
pub mod convert;
pub mod currency;
pub mod engine;
pub mod error;
pub mod group;
pub mod ledger;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod resolver;

pub use config::{Action, Alteration, AlterationPattern, AlterationsMapping};
pub use currency::CurrencyFormat;
pub use engine::run;
pub use error::ReconError;
pub use model::{ReconOutput, ReconSummary, TransactionRecord, TransactionType};
