use crate::config::AlterationPattern;
use crate::model::TransactionRecord;

/// True iff every non-wildcard field of `pattern` equals the record's field.
pub fn matches(record: &TransactionRecord, pattern: &AlterationPattern) -> bool {
    pattern
        .transaction_type
        .map_or(true, |t| t == record.transaction_type)
        && pattern
            .buy_currency
            .as_deref()
            .map_or(true, |c| c == record.buy_currency())
        && pattern
            .sell_currency
            .as_deref()
            .map_or(true, |c| c == record.sell_currency())
        && pattern
            .exchange
            .as_deref()
            .map_or(true, |e| e == record.exchange)
}

/// Match a whole group against a pattern multiset.
///
/// Greedy first-fit: records are taken in input order and each consumes the
/// first remaining pattern it matches. This is not a full bipartite matching;
/// when patterns overlap, a group can be rejected even though some other
/// assignment would have matched.
pub fn matches_group(records: &[TransactionRecord], patterns: &[AlterationPattern]) -> bool {
    if records.len() != patterns.len() {
        return false;
    }

    let mut remaining: Vec<&AlterationPattern> = patterns.iter().collect();
    for record in records {
        match remaining.iter().position(|p| matches(record, p)) {
            Some(i) => {
                remaining.remove(i);
            }
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExchangeId, Leg, TransactionType};
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(kind: TransactionType, buy: Option<&str>, sell: Option<&str>, exchange: &str) -> TransactionRecord {
        let ts = NaiveDateTime::parse_from_str("2022-01-01T00:00:00.000Z", "%Y-%m-%dT%H:%M:%S%.fZ").unwrap();
        TransactionRecord {
            transaction_type: kind,
            buy: buy.map(|c| Leg::new(dec!(1), c)),
            sell: sell.map(|c| Leg::new(dec!(1), c)),
            fee: None,
            exchange: exchange.into(),
            exchange_id: ExchangeId::parse("H1"),
            group: String::new(),
            import_source: String::new(),
            comment: String::new(),
            date: ts,
            usd_equivalent: Decimal::ZERO,
            updated_at: ts,
        }
    }

    fn pattern(kind: Option<TransactionType>, buy: Option<&str>, sell: Option<&str>) -> AlterationPattern {
        AlterationPattern {
            transaction_type: kind,
            buy_currency: buy.map(Into::into),
            sell_currency: sell.map(Into::into),
            exchange: None,
        }
    }

    #[test]
    fn wildcard_matches_anything() {
        let any = AlterationPattern::default();
        assert!(matches(&record(TransactionType::Trade, Some("BTC"), Some("USD"), "Coinbase"), &any));
        assert!(matches(&record(TransactionType::Lost, None, None, ""), &any));
    }

    #[test]
    fn each_field_must_agree() {
        let r = record(TransactionType::Deposit, Some("BTC"), None, "Kraken");
        assert!(matches(&r, &pattern(Some(TransactionType::Deposit), Some("BTC"), None)));
        assert!(!matches(&r, &pattern(Some(TransactionType::Withdrawal), Some("BTC"), None)));
        assert!(!matches(&r, &pattern(Some(TransactionType::Deposit), Some("ETH"), None)));
        assert!(!matches(&r, &pattern(None, None, Some("BTC"))));

        let mut on_exchange = AlterationPattern::default();
        on_exchange.exchange = Some("Kraken".into());
        assert!(matches(&r, &on_exchange));
        on_exchange.exchange = Some("Binance".into());
        assert!(!matches(&r, &on_exchange));
    }

    #[test]
    fn empty_currency_pattern_matches_missing_leg() {
        let r = record(TransactionType::Deposit, Some("BTC"), None, "");
        assert!(matches(&r, &pattern(None, None, Some(""))));
    }

    #[test]
    fn group_size_must_equal_pattern_count() {
        let records = vec![
            record(TransactionType::Deposit, Some("BTC"), None, ""),
            record(TransactionType::Deposit, Some("BTC"), None, ""),
        ];
        assert!(!matches_group(&records, &[AlterationPattern::default()]));
        assert!(matches_group(&records, &[AlterationPattern::default(), AlterationPattern::default()]));
    }

    #[test]
    fn group_matches_in_any_order() {
        let records = vec![
            record(TransactionType::Deposit, Some("BTC"), None, ""),
            record(TransactionType::Withdrawal, None, Some("USD"), ""),
        ];
        let patterns = vec![
            pattern(Some(TransactionType::Withdrawal), None, Some("USD")),
            pattern(Some(TransactionType::Deposit), Some("BTC"), None),
        ];
        assert!(matches_group(&records, &patterns));
    }

    #[test]
    fn each_pattern_consumed_once() {
        let records = vec![
            record(TransactionType::Deposit, Some("BTC"), None, ""),
            record(TransactionType::Deposit, Some("BTC"), None, ""),
        ];
        let patterns = vec![
            pattern(Some(TransactionType::Deposit), Some("BTC"), None),
            pattern(Some(TransactionType::Withdrawal), None, None),
        ];
        assert!(!matches_group(&records, &patterns));
    }

    #[test]
    fn greedy_first_fit_can_miss_a_valid_assignment() {
        // BTC deposit grabs the wildcard-currency pattern first, leaving the
        // BTC-only pattern for the ETH deposit.
        let records = vec![
            record(TransactionType::Deposit, Some("BTC"), None, ""),
            record(TransactionType::Deposit, Some("ETH"), None, ""),
        ];
        let patterns = vec![
            pattern(Some(TransactionType::Deposit), None, None),
            pattern(Some(TransactionType::Deposit), Some("BTC"), None),
        ];
        assert!(!matches_group(&records, &patterns));

        let reordered = vec![patterns[1].clone(), patterns[0].clone()];
        assert!(matches_group(&records, &reordered));
    }
}
