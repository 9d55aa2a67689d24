//! Actions that recombine a group's legs into trades, migrations and staking
//! entries.

use rust_decimal::Decimal;

use crate::error::ReconError;
use crate::group::{
    ensure_consistent, find_fee, find_usd_equivalent, group_hash, partition_containing,
    split_buy_sell,
};
use crate::model::{Leg, LegShape, TransactionRecord, TransactionType};

/// Combine buy-only and sell-only records into trades.
///
/// 1 buy + 1 sell → one trade. 1 buy + n sells → n trades, the buy amount,
/// fee and USD equivalent divided evenly. n buys + 1 sell → n trades, the sell
/// amount and fee divided evenly; each trade keeps its buy record's USD
/// equivalent.
pub fn convert_to_trades(records: &[TransactionRecord]) -> Result<Vec<TransactionRecord>, ReconError> {
    const ACTION: &str = "convert_to_trades";
    let all: Vec<&TransactionRecord> = records.iter().collect();

    let fee = find_fee(&all)?;
    let usd_equivalent = find_usd_equivalent(&all)?;
    ensure_consistent(&all)?;
    let (buys, sells) = split_buy_sell(&all, ACTION)?;

    match (buys.as_slice(), sells.as_slice()) {
        ([buy], [sell]) => Ok(vec![buy.rebuilt(
            TransactionType::Trade,
            buy.buy.clone(),
            sell.sell.clone(),
            fee,
            usd_equivalent,
        )]),
        ([buy], sells) if sells.len() > 1 => {
            let n = Decimal::from(sells.len());
            let split_buy = buy.buy.as_ref().map(|leg| divide(leg, n));
            let split_fee = fee.as_ref().map(|leg| divide(leg, n));
            let split_usd = usd_equivalent / n;
            Ok(sells
                .iter()
                .map(|sell| {
                    buy.rebuilt(
                        TransactionType::Trade,
                        split_buy.clone(),
                        sell.sell.clone(),
                        split_fee.clone(),
                        split_usd,
                    )
                })
                .collect())
        }
        (buys, [sell]) if buys.len() > 1 => {
            let n = Decimal::from(buys.len());
            let split_sell = sell.sell.as_ref().map(|leg| divide(leg, n));
            let split_fee = fee.as_ref().map(|leg| divide(leg, n));
            Ok(buys
                .iter()
                .map(|buy| {
                    sell.rebuilt(
                        TransactionType::Trade,
                        buy.buy.clone(),
                        split_sell.clone(),
                        split_fee.clone(),
                        buy.usd_equivalent,
                    )
                })
                .collect())
        }
        (buys, sells) => Err(ReconError::UnsupportedShape {
            hash: group_hash(records),
            action: ACTION,
            detail: format!("{} buy-only and {} sell-only records", buys.len(), sells.len()),
        }),
    }
}

/// Rewrite legs in `unstaked` as trades against a synthetic `staked` leg of
/// the same amount.
pub fn convert_to_single_stake_trades(
    records: &[TransactionRecord],
    unstaked: &str,
    staked: &str,
) -> Vec<TransactionRecord> {
    records
        .iter()
        .map(|r| stake_swap(r, unstaked, staked, TransactionType::Trade))
        .collect()
}

/// Merge one buy-only and one sell-only record into a migration, relabel
/// existing trades as migrations. With `rewards`, records touching a reward
/// token become staking income and are emitted first.
pub fn convert_to_migrations(
    records: &[TransactionRecord],
    rewards: Option<&[String]>,
) -> Result<Vec<TransactionRecord>, ReconError> {
    let (mut out, rest) = carve_out_rewards(records, rewards);
    out.extend(merge_migration(&rest)?);
    Ok(out)
}

/// Relabel an all-deposit group as staking.
pub fn convert_to_staking(records: &[TransactionRecord]) -> Result<Vec<TransactionRecord>, ReconError> {
    if let Some(other) = records
        .iter()
        .find(|r| r.transaction_type != TransactionType::Deposit)
    {
        return Err(ReconError::TypeConstraint {
            hash: other.hash().to_string(),
            action: "convert_to_staking",
            found: other.transaction_type.to_string(),
        });
    }
    Ok(records
        .iter()
        .map(|r| r.with_type(TransactionType::Staking))
        .collect())
}

/// Like [`convert_to_single_stake_trades`] but producing migrations, with the
/// same reward carve-out as [`convert_to_migrations`].
pub fn convert_to_stake_migration(
    records: &[TransactionRecord],
    unstaked: &str,
    staked: &str,
    rewards: Option<&[String]>,
) -> Vec<TransactionRecord> {
    let (mut out, rest) = carve_out_rewards(records, rewards);
    out.extend(
        rest.into_iter()
            .map(|r| stake_swap(r, unstaked, staked, TransactionType::Migration)),
    );
    out
}

fn merge_migration(records: &[&TransactionRecord]) -> Result<Vec<TransactionRecord>, ReconError> {
    const ACTION: &str = "convert_to_migrations";

    let fee = find_fee(records)?;
    let usd_equivalent = find_usd_equivalent(records)?;
    ensure_consistent(records)?;

    let mut trades = Vec::new();
    let mut buys = Vec::new();
    let mut sells = Vec::new();
    for record in records {
        if record.transaction_type == TransactionType::Trade {
            trades.push(*record);
            continue;
        }
        match record.shape() {
            LegShape::BuyOnly => buys.push(*record),
            LegShape::SellOnly => sells.push(*record),
            shape => log::debug!(
                "hash {}: {ACTION} drops {shape} {} record",
                record.hash(),
                record.transaction_type
            ),
        }
    }

    let mut out = Vec::with_capacity(1 + trades.len());
    match (buys.as_slice(), sells.as_slice()) {
        ([buy], [sell]) => out.push(buy.rebuilt(
            TransactionType::Migration,
            buy.buy.clone(),
            sell.sell.clone(),
            fee,
            usd_equivalent,
        )),
        (buys, sells) if !buys.is_empty() && !sells.is_empty() => {
            return Err(ReconError::UnsupportedShape {
                hash: buys[0].hash().to_string(),
                action: ACTION,
                detail: format!("{} buy-only and {} sell-only records", buys.len(), sells.len()),
            });
        }
        (buys, sells) => {
            for lone in buys.iter().chain(sells) {
                log::debug!("hash {}: {ACTION} drops unpaired {} leg", lone.hash(), lone.shape());
            }
        }
    }

    out.extend(trades.into_iter().map(|t| t.with_type(TransactionType::Migration)));
    Ok(out)
}

/// Split off records touching a reward token, relabelled as staking.
fn carve_out_rewards<'a>(
    records: &'a [TransactionRecord],
    rewards: Option<&[String]>,
) -> (Vec<TransactionRecord>, Vec<&'a TransactionRecord>) {
    match rewards {
        Some(tokens) => {
            let (reward_records, rest) = partition_containing(records, tokens);
            let staking = reward_records
                .into_iter()
                .map(|r| r.with_type(TransactionType::Staking))
                .collect();
            (staking, rest)
        }
        None => (Vec::new(), records.iter().collect()),
    }
}

fn stake_swap(
    record: &TransactionRecord,
    unstaked: &str,
    staked: &str,
    transaction_type: TransactionType,
) -> TransactionRecord {
    if let Some(buy) = record.buy.as_ref().filter(|l| l.currency == unstaked) {
        let mut out = record.with_type(transaction_type);
        out.sell = Some(Leg::new(buy.amount, staked));
        out
    } else if let Some(sell) = record.sell.as_ref().filter(|l| l.currency == unstaked) {
        let mut out = record.with_type(transaction_type);
        out.buy = Some(Leg::new(sell.amount, staked));
        out
    } else {
        record.clone()
    }
}

fn divide(leg: &Leg, n: Decimal) -> Leg {
    Leg::new(leg.amount / n, leg.currency.clone())
}
