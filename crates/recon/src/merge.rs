use rust_decimal::Decimal;

use crate::error::ReconError;
use crate::group::{
    ensure_consistent, find_fee, find_usd_equivalent, group_hash, partition_containing,
    split_buy_sell,
};
use crate::model::{Leg, TransactionRecord, TransactionType};

/// Net every record touching `currency` into a single deposit or withdrawal.
///
/// Records not touching the currency pass through first, in order; the merged
/// record is appended and takes its shared fields from the first mergeable
/// record. A net of exactly zero is an error, not an empty result.
pub fn merge_same_currency(
    records: &[TransactionRecord],
    currency: &str,
) -> Result<Vec<TransactionRecord>, ReconError> {
    let tokens = [currency.to_string()];
    let (mergeable, others) = partition_containing(records, &tokens);

    let fee = find_fee(&mergeable)?;
    let usd_equivalent = find_usd_equivalent(&mergeable)?;
    ensure_consistent(&mergeable)?;
    let (buys, sells) = split_buy_sell(&mergeable, "merge_same_currency")?;

    let bought: Decimal = buys.iter().filter_map(|r| r.buy.as_ref()).map(|l| l.amount).sum();
    let sold: Decimal = sells.iter().filter_map(|r| r.sell.as_ref()).map(|l| l.amount).sum();
    let net = bought - sold;

    let Some(first) = mergeable.first().filter(|_| !net.is_zero()) else {
        return Err(ReconError::EmptyMerge {
            hash: group_hash(records),
            currency: currency.to_string(),
        });
    };

    let merged = if net > Decimal::ZERO {
        first.rebuilt(
            TransactionType::Deposit,
            Some(Leg::new(net, currency)),
            None,
            fee,
            usd_equivalent,
        )
    } else {
        first.rebuilt(
            TransactionType::Withdrawal,
            None,
            Some(Leg::new(-net, currency)),
            fee,
            usd_equivalent,
        )
    };
    log::debug!(
        "hash {}: merged {} {currency} records into {}",
        first.hash(),
        mergeable.len(),
        merged.transaction_type
    );

    let mut out: Vec<TransactionRecord> = others.into_iter().cloned().collect();
    out.push(merged);
    Ok(out)
}
