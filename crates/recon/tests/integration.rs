use std::path::PathBuf;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tokenmend_recon::config::AlterationsMapping;
use tokenmend_recon::engine::run;
use tokenmend_recon::ledger::{load_csv_records, write_csv_records};
use tokenmend_recon::model::{Leg, ReconOutput, TransactionType, UnmatchedGroup};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_mapping() -> AlterationsMapping {
    let toml = std::fs::read_to_string(fixtures_dir().join("rules.toml")).unwrap();
    AlterationsMapping::from_toml(&toml).unwrap()
}

fn load_and_run() -> (AlterationsMapping, ReconOutput) {
    let mapping = load_mapping();
    let csv_path = fixtures_dir().join("ledger.csv");
    let csv_data = std::fs::read_to_string(&csv_path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", csv_path.display()));
    let records = load_csv_records(&csv_data, b',', &mapping.currency_format).unwrap();
    let output = run(&mapping, records).unwrap();
    (mapping, output)
}

// -------------------------------------------------------------------------
// Full pipeline
// -------------------------------------------------------------------------

#[test]
fn fixture_histograms() {
    let (_, output) = load_and_run();
    let summary = &output.summary;

    assert_eq!(summary.input_records, 13);
    assert_eq!(summary.output_records, 8);
    assert_eq!(summary.meta.rule_count, 5);

    assert_eq!(summary.input_groups.to_string(), "{1: 2, 2: 4, 3: 1}");
    assert_eq!(summary.unmatched_groups.to_string(), "{2: 1}");
    assert_eq!(summary.output_groups.to_string(), "{1: 2, 2: 3, 3: 1}");
    assert_eq!(
        summary.unmatched,
        vec![UnmatchedGroup { hash: "0xfff".into(), size: 2 }]
    );
}

#[test]
fn fixture_output_records() {
    let (_, output) = load_and_run();
    let records = &output.records;
    let kinds: Vec<TransactionType> = records.iter().map(|r| r.transaction_type).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionType::Trade,
            TransactionType::Trade,
            TransactionType::Trade,
            TransactionType::Staking,
            TransactionType::Staking,
            TransactionType::Deposit,
            TransactionType::Income,
            TransactionType::Staking,
        ]
    );

    // USD → BTC
    let btc = &records[0];
    assert_eq!(btc.buy, Some(Leg::new(dec!(0.01), "BTC")));
    assert_eq!(btc.sell, Some(Leg::new(dec!(100), "USD")));
    assert_eq!(btc.fee, Some(Leg::new(dec!(1.5), "USD")));
    assert_eq!(btc.usd_equivalent, dec!(100));

    // One USD buy split across two token sells
    for (trade, token) in records[1..3].iter().zip(["TOK1", "TOK2"]) {
        assert_eq!(trade.buy, Some(Leg::new(dec!(4.5), "USD")));
        assert_eq!(trade.sell, Some(Leg::new(dec!(3), token)));
        assert_eq!(trade.usd_equivalent, dec!(4.5));
        assert_eq!(trade.exchange, "Uniswap");
    }

    // Staked deposits keep amounts
    assert_eq!(records[3].buy, Some(Leg::new(dec!(0.05), "ETH")));
    assert_eq!(records[3].usd_equivalent, dec!(140.25));
    assert_eq!(records[4].buy, Some(Leg::new(dec!(0.07), "ETH")));

    // Netted XYZ
    assert_eq!(records[5].buy, Some(Leg::new(dec!(6), "XYZ")));
    assert_eq!(records[5].sell, None);

    // Single records: untouched unless pinned
    assert_eq!(records[6].comment, "interest");
    assert_eq!(records[6].usd_equivalent, dec!(25));
    assert_eq!(records[7].buy, Some(Leg::new(dec!(32), "ETH2")));
    assert_eq!(records[7].hash(), "0x111");
}

#[test]
fn fixture_fan_out_preserves_totals() {
    let (_, output) = load_and_run();
    let usd: Decimal = output
        .records
        .iter()
        .filter(|r| r.hash() == "0xbbb")
        .filter_map(|r| r.buy.as_ref())
        .map(|l| l.amount)
        .sum();
    assert_eq!(usd, dec!(9));
}

// -------------------------------------------------------------------------
// Write-back
// -------------------------------------------------------------------------

#[test]
fn written_output_reloads() {
    let (mapping, output) = load_and_run();
    let written = write_csv_records(&output.records, b',', &mapping.currency_format).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("altered.csv");
    std::fs::write(&path, &written).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Trade,0.01,BTC,100,USD,1.5,USD,Coinbase,0xaaa-1,,api,,2021-11-02T08:30:00.250Z,$100.00,"));
    assert!(text.contains("Staking,32,ETH2,"));

    let reloaded = load_csv_records(&text, b',', &mapping.currency_format).unwrap();
    assert_eq!(reloaded.len(), output.records.len());
    assert_eq!(reloaded[0].buy, output.records[0].buy);
    assert_eq!(reloaded[5].transaction_type, TransactionType::Deposit);
}

#[test]
fn summary_serializes_to_json() {
    let (_, output) = load_and_run();
    let json: serde_json::Value = serde_json::from_str(&output.summary.to_json().unwrap()).unwrap();
    assert_eq!(json["input_records"], 13);
    assert_eq!(json["unmatched_groups"]["2"], 1);
    assert_eq!(json["unmatched"][0]["hash"], "0xfff");
}

// -------------------------------------------------------------------------
// Failure modes
// -------------------------------------------------------------------------

#[test]
fn inconsistent_group_aborts_run() {
    let mapping = load_mapping();
    let csv = std::fs::read_to_string(fixtures_dir().join("ledger.csv"))
        .unwrap()
        .replace("Coinbase,0xaaa-1", "Kraken,0xaaa-1");
    let records = load_csv_records(&csv, b',', &mapping.currency_format).unwrap();
    let err = run(&mapping, records).unwrap_err();
    assert!(err.to_string().contains("0xaaa"));
    assert!(err.to_string().contains("exchange"));
}
