//! Checks shared by the combining actions: where a group's fee and USD
//! equivalent come from, which fields must agree, and how legs split.

use std::borrow::Borrow;

use rust_decimal::Decimal;

use crate::error::ReconError;
use crate::model::{Leg, LegShape, TransactionRecord};

/// Hash of the group the records belong to, for error messages.
pub fn group_hash<R: Borrow<TransactionRecord>>(records: &[R]) -> String {
    records
        .first()
        .map(|r| <R as Borrow<TransactionRecord>>::borrow(r).hash().to_string())
        .unwrap_or_default()
}

/// The group's single fee, if any record carries one.
pub fn find_fee(records: &[&TransactionRecord]) -> Result<Option<Leg>, ReconError> {
    let sources: Vec<&Leg> = records.iter().filter_map(|r| r.fee_source()).collect();
    match sources.as_slice() {
        [] => Ok(None),
        [fee] => Ok(Some((*fee).clone())),
        _ => Err(ReconError::AmbiguousSource {
            hash: group_hash(records),
            source: "fee",
            count: sources.len(),
        }),
    }
}

/// The group's single USD equivalent, zero when no record carries one.
pub fn find_usd_equivalent(records: &[&TransactionRecord]) -> Result<Decimal, ReconError> {
    let sources: Vec<Decimal> = records
        .iter()
        .filter(|r| r.has_usd_equivalent())
        .map(|r| r.usd_equivalent)
        .collect();
    match sources.as_slice() {
        [] => Ok(Decimal::ZERO),
        [usd] => Ok(*usd),
        _ => Err(ReconError::AmbiguousSource {
            hash: group_hash(records),
            source: "USD equivalent",
            count: sources.len(),
        }),
    }
}

/// Every record must agree on exchange, hash, group, import, comment and
/// both timestamps (to the second).
pub fn ensure_consistent(records: &[&TransactionRecord]) -> Result<(), ReconError> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    let checks: [(&'static str, fn(&TransactionRecord, &TransactionRecord) -> bool); 7] = [
        ("exchange", |a, b| a.exchange == b.exchange),
        ("exchange id hash", |a, b| a.hash() == b.hash()),
        ("group", |a, b| a.group == b.group),
        ("import", |a, b| a.import_source == b.import_source),
        ("comment", |a, b| a.comment == b.comment),
        ("date", |a, b| a.date_to_second() == b.date_to_second()),
        ("updated at", |a, b| a.updated_at_to_second() == b.updated_at_to_second()),
    ];

    for (field, same) in checks {
        if !records.iter().all(|r| same(first, r)) {
            return Err(ReconError::InconsistentGroup {
                hash: first.hash().to_string(),
                field,
            });
        }
    }
    Ok(())
}

/// Split into (buy-only, sell-only). Any other shape is rejected.
pub fn split_buy_sell<'a>(
    records: &[&'a TransactionRecord],
    action: &'static str,
) -> Result<(Vec<&'a TransactionRecord>, Vec<&'a TransactionRecord>), ReconError> {
    let mut buys = Vec::new();
    let mut sells = Vec::new();
    for record in records {
        match record.shape() {
            LegShape::BuyOnly => buys.push(*record),
            LegShape::SellOnly => sells.push(*record),
            shape => {
                return Err(ReconError::UnsupportedShape {
                    hash: record.hash().to_string(),
                    action,
                    detail: format!("a {shape} {} record", record.transaction_type),
                })
            }
        }
    }
    Ok((buys, sells))
}

/// Split into (records touching any of `tokens`, the rest), keeping order.
pub fn partition_containing<'a>(
    records: &'a [TransactionRecord],
    tokens: &[String],
) -> (Vec<&'a TransactionRecord>, Vec<&'a TransactionRecord>) {
    records.iter().partition(|r| r.touches_any(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExchangeId, TransactionType};
    use chrono::{Duration, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn base() -> TransactionRecord {
        let ts = NaiveDateTime::parse_from_str("2022-06-01T12:00:00.100Z", "%Y-%m-%dT%H:%M:%S%.fZ").unwrap();
        TransactionRecord {
            transaction_type: TransactionType::Deposit,
            buy: Some(Leg::new(dec!(1), "BTC")),
            sell: None,
            fee: None,
            exchange: "Coinbase".into(),
            exchange_id: ExchangeId::parse("H1-0"),
            group: "g".into(),
            import_source: "csv".into(),
            comment: String::new(),
            date: ts,
            usd_equivalent: Decimal::ZERO,
            updated_at: ts,
        }
    }

    #[test]
    fn single_fee_found() {
        let a = base();
        let mut b = base();
        b.fee = Some(Leg::new(dec!(0.5), "USD"));
        let fee = find_fee(&[&a, &b]).unwrap();
        assert_eq!(fee, Some(Leg::new(dec!(0.5), "USD")));
        assert_eq!(find_fee(&[&a]).unwrap(), None);
    }

    #[test]
    fn two_fees_are_ambiguous() {
        let mut a = base();
        a.fee = Some(Leg::new(dec!(1), "USD"));
        let b = a.clone();
        let err = find_fee(&[&a, &b]).unwrap_err();
        assert!(matches!(err, ReconError::AmbiguousSource { source: "fee", count: 2, .. }));
    }

    #[test]
    fn zero_amount_fees_still_count() {
        let mut a = base();
        a.fee = Some(Leg::new(dec!(0), "ETH"));
        assert_eq!(find_fee(&[&a, &base()]).unwrap(), Some(Leg::new(dec!(0), "ETH")));

        let mut b = base();
        b.fee = Some(Leg::new(dec!(0), "USD"));
        let err = find_fee(&[&a, &b]).unwrap_err();
        assert!(matches!(err, ReconError::AmbiguousSource { source: "fee", count: 2, .. }));
    }

    #[test]
    fn group_hash_over_owned_and_borrowed() {
        let records = vec![base(), base()];
        let refs: Vec<&TransactionRecord> = records.iter().collect();
        assert_eq!(group_hash(&records), "H1");
        assert_eq!(group_hash(&refs), "H1");
        assert_eq!(group_hash::<TransactionRecord>(&[]), "");
    }

    #[test]
    fn usd_equivalent_sources() {
        let a = base();
        let mut b = base();
        b.usd_equivalent = dec!(250);
        assert_eq!(find_usd_equivalent(&[&a, &b]).unwrap(), dec!(250));
        assert_eq!(find_usd_equivalent(&[&a]).unwrap(), Decimal::ZERO);

        let c = b.clone();
        let err = find_usd_equivalent(&[&b, &c]).unwrap_err();
        assert!(matches!(err, ReconError::AmbiguousSource { source: "USD equivalent", .. }));
    }

    #[test]
    fn sub_second_differences_are_consistent() {
        let a = base();
        let mut b = base();
        b.date += Duration::milliseconds(500);
        b.exchange_id = ExchangeId::parse("H1-1");
        assert!(ensure_consistent(&[&a, &b]).is_ok());
    }

    #[test]
    fn differing_fields_are_inconsistent() {
        let a = base();
        let mut b = base();
        b.date += Duration::seconds(1);
        let err = ensure_consistent(&[&a, &b]).unwrap_err();
        assert!(matches!(err, ReconError::InconsistentGroup { field: "date", .. }));

        let mut c = base();
        c.comment = "note".into();
        let err = ensure_consistent(&[&a, &c]).unwrap_err();
        assert!(matches!(err, ReconError::InconsistentGroup { field: "comment", .. }));
    }

    #[test]
    fn split_rejects_two_legged_records() {
        let buy = base();
        let mut sell = base();
        sell.buy = None;
        sell.sell = Some(Leg::new(dec!(2), "USD"));
        let (buys, sells) = split_buy_sell(&[&buy, &sell], "convert_to_trades").unwrap();
        assert_eq!(buys.len(), 1);
        assert_eq!(sells.len(), 1);

        let mut both = base();
        both.sell = Some(Leg::new(dec!(2), "USD"));
        let err = split_buy_sell(&[&both], "convert_to_trades").unwrap_err();
        assert!(err.to_string().contains("buy-and-sell"));
    }

    #[test]
    fn partition_keeps_order() {
        let a = base();
        let mut b = base();
        b.buy = Some(Leg::new(dec!(3), "CRV"));
        let c = base();
        let records = vec![a, b, c];
        let (containing, rest) = partition_containing(&records, &["CRV".to_string()]);
        assert_eq!(containing.len(), 1);
        assert_eq!(containing[0].buy_currency(), "CRV");
        assert_eq!(rest.len(), 2);
    }
}
