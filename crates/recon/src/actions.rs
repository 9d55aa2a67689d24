//! Action dispatch plus the filtering and renaming actions.
//!
//! Every action takes a group's records and returns a new sequence; inputs are
//! never modified. The recombining actions live in [`crate::convert`] and
//! [`crate::merge`].

use crate::config::Action;
use crate::convert;
use crate::error::ReconError;
use crate::merge;
use crate::model::{Leg, TransactionRecord, TransactionType};

impl Action {
    /// Apply this action to one group's records.
    pub fn apply(&self, records: &[TransactionRecord]) -> Result<Vec<TransactionRecord>, ReconError> {
        match self {
            Action::DoNothing => Ok(records.to_vec()),
            Action::ConvertToTrades => convert::convert_to_trades(records),
            Action::ConvertToSingleStakeTrades { unstaked_token, staked_token } => Ok(
                convert::convert_to_single_stake_trades(records, unstaked_token, staked_token),
            ),
            Action::ConvertToMigrations { rewards } => {
                convert::convert_to_migrations(records, rewards.as_deref())
            }
            Action::ConvertToStaking => convert::convert_to_staking(records),
            Action::ConvertToStakeMigration { unstaked_token, staked_token, rewards } => {
                Ok(convert::convert_to_stake_migration(
                    records,
                    unstaked_token,
                    staked_token,
                    rewards.as_deref(),
                ))
            }
            Action::KeepOnlyTypes { keeps } => Ok(keep_only_types(records, keeps)),
            Action::RenameToken { token_name, rename_to } => {
                Ok(rename_token(records, token_name, rename_to))
            }
            Action::RemoveContaining { removes } => Ok(remove_containing(records, removes)),
            Action::MergeSameCurrency { merge_currency } => {
                merge::merge_same_currency(records, merge_currency)
            }
        }
    }
}

pub fn keep_only_types(records: &[TransactionRecord], keeps: &[TransactionType]) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|r| keeps.contains(&r.transaction_type))
        .cloned()
        .collect()
}

/// Rename `from` to `to` in buy and sell legs. Fee legs keep their currency.
pub fn rename_token(records: &[TransactionRecord], from: &str, to: &str) -> Vec<TransactionRecord> {
    let rename = |leg: &Option<Leg>| -> Option<Leg> {
        leg.as_ref().map(|l| {
            if l.currency == from {
                Leg::new(l.amount, to)
            } else {
                l.clone()
            }
        })
    };
    records
        .iter()
        .map(|r| TransactionRecord {
            buy: rename(&r.buy),
            sell: rename(&r.sell),
            ..r.clone()
        })
        .collect()
}

pub fn remove_containing(records: &[TransactionRecord], removes: &[String]) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|r| !r.touches_any(removes))
        .cloned()
        .collect()
}
