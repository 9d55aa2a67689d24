use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, SubsecRound};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyFormat;
use crate::error::ReconError;

/// TokenTax CSV column names, in export order.
pub const COLUMNS: [&str; 15] = [
    "Type",
    "BuyAmount",
    "BuyCurrency",
    "SellAmount",
    "SellCurrency",
    "FeeAmount",
    "FeeCurrency",
    "Exchange",
    "ExchangeId",
    "Group",
    "Import",
    "Comment",
    "Date",
    "USDEquivalent",
    "UpdatedAt",
];

/// Timestamp layout used by `Date` and `UpdatedAt` (fractional seconds, literal `Z`).
pub const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
pub const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// ---------------------------------------------------------------------------
// Transaction type
// ---------------------------------------------------------------------------

/// Transaction types accepted by TokenTax. Serialized by their canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Trade,
    Income,
    Airdrop,
    Borrow,
    Deposit,
    Fork,
    Gift,
    Lost,
    Migration,
    Mining,
    Repay,
    Spend,
    Staking,
    Stolen,
    Withdrawal,
}

impl TransactionType {
    pub const ALL: [TransactionType; 15] = [
        Self::Trade,
        Self::Income,
        Self::Airdrop,
        Self::Borrow,
        Self::Deposit,
        Self::Fork,
        Self::Gift,
        Self::Lost,
        Self::Migration,
        Self::Mining,
        Self::Repay,
        Self::Spend,
        Self::Staking,
        Self::Stolen,
        Self::Withdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "Trade",
            Self::Income => "Income",
            Self::Airdrop => "Airdrop",
            Self::Borrow => "Borrow",
            Self::Deposit => "Deposit",
            Self::Fork => "Fork",
            Self::Gift => "Gift",
            Self::Lost => "Lost",
            Self::Migration => "Migration",
            Self::Mining => "Mining",
            Self::Repay => "Repay",
            Self::Spend => "Spend",
            Self::Staking => "Staking",
            Self::Stolen => "Stolen",
            Self::Withdrawal => "Withdrawal",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown transaction type '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Exchange ID
// ---------------------------------------------------------------------------

/// `ExchangeId` column split into the grouping hash and its descriptive suffixes.
///
/// `0xabc-1-fee` → hash `0xabc`, suffixes `["1", "fee"]`. Only the hash takes
/// part in grouping and matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExchangeId {
    pub hash: String,
    pub suffixes: Vec<String>,
}

impl ExchangeId {
    pub fn parse(combined: &str) -> Self {
        let mut parts = combined.split('-');
        let hash = parts.next().unwrap_or("").to_string();
        Self {
            hash,
            suffixes: parts.map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)?;
        for suffix in &self.suffixes {
            write!(f, "-{suffix}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One side of a record: an amount of a currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub amount: Decimal,
    pub currency: String,
}

impl Leg {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// Which legs a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegShape {
    BuyOnly,
    SellOnly,
    Both,
    Neither,
}

impl fmt::Display for LegShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuyOnly => write!(f, "buy-only"),
            Self::SellOnly => write!(f, "sell-only"),
            Self::Both => write!(f, "buy-and-sell"),
            Self::Neither => write!(f, "leg-less"),
        }
    }
}

/// A single TokenTax ledger row.
///
/// A leg exists iff its currency column is non-empty. Records are built once
/// and never mutated by actions; rewrites go through [`TransactionRecord::rebuilt`]
/// or a clone.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_type: TransactionType,
    pub buy: Option<Leg>,
    pub sell: Option<Leg>,
    pub fee: Option<Leg>,
    pub exchange: String,
    pub exchange_id: ExchangeId,
    pub group: String,
    pub import_source: String,
    pub comment: String,
    pub date: NaiveDateTime,
    pub usd_equivalent: Decimal,
    pub updated_at: NaiveDateTime,
}

impl TransactionRecord {
    /// Build a record from one CSV row keyed by column name. `row` is the
    /// 1-based data row number used in error messages.
    pub fn from_fields(
        row: usize,
        fields: &HashMap<String, String>,
        currency_format: &CurrencyFormat,
    ) -> Result<Self, ReconError> {
        let field = |name: &str| field_value(fields, row, name);

        let type_str = field("Type")?;
        let transaction_type: TransactionType =
            type_str.parse().map_err(|_| ReconError::MalformedRecord {
                row,
                field: "Type".into(),
                value: type_str.to_string(),
            })?;

        let leg = |amount_col: &str, currency_col: &str| -> Result<Option<Leg>, ReconError> {
            let amount = parse_amount(row, amount_col, &field(amount_col)?)?;
            let currency = field(currency_col)?;
            if currency.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Leg::new(amount, currency)))
            }
        };

        let usd_str = field("USDEquivalent")?;
        let usd_equivalent =
            currency_format
                .parse(&usd_str)
                .ok_or_else(|| ReconError::MalformedRecord {
                    row,
                    field: "USDEquivalent".into(),
                    value: usd_str.clone(),
                })?;

        Ok(Self {
            transaction_type,
            buy: leg("BuyAmount", "BuyCurrency")?,
            sell: leg("SellAmount", "SellCurrency")?,
            fee: leg("FeeAmount", "FeeCurrency")?,
            exchange: field("Exchange")?,
            exchange_id: ExchangeId::parse(&field("ExchangeId")?),
            group: field("Group")?,
            import_source: field("Import")?,
            comment: field("Comment")?,
            date: parse_timestamp(row, "Date", &field("Date")?)?,
            usd_equivalent,
            updated_at: parse_timestamp(row, "UpdatedAt", &field("UpdatedAt")?)?,
        })
    }

    /// Render the record as CSV cells in [`COLUMNS`] order.
    pub fn to_fields(&self, currency_format: &CurrencyFormat) -> Vec<String> {
        let amount = |leg: &Option<Leg>| leg.as_ref().map(|l| l.amount.to_string()).unwrap_or_default();
        let currency = |leg: &Option<Leg>| leg.as_ref().map(|l| l.currency.clone()).unwrap_or_default();
        vec![
            self.transaction_type.to_string(),
            amount(&self.buy),
            currency(&self.buy),
            amount(&self.sell),
            currency(&self.sell),
            amount(&self.fee),
            currency(&self.fee),
            self.exchange.clone(),
            self.exchange_id.to_string(),
            self.group.clone(),
            self.import_source.clone(),
            self.comment.clone(),
            self.date.format(TIMESTAMP_WRITE_FORMAT).to_string(),
            currency_format.format(self.usd_equivalent),
            self.updated_at.format(TIMESTAMP_WRITE_FORMAT).to_string(),
        ]
    }

    pub fn hash(&self) -> &str {
        &self.exchange_id.hash
    }

    /// Buy currency, or `""` when there is no buy leg.
    pub fn buy_currency(&self) -> &str {
        self.buy.as_ref().map(|l| l.currency.as_str()).unwrap_or("")
    }

    /// Sell currency, or `""` when there is no sell leg.
    pub fn sell_currency(&self) -> &str {
        self.sell.as_ref().map(|l| l.currency.as_str()).unwrap_or("")
    }

    pub fn shape(&self) -> LegShape {
        match (&self.buy, &self.sell) {
            (Some(_), None) => LegShape::BuyOnly,
            (None, Some(_)) => LegShape::SellOnly,
            (Some(_), Some(_)) => LegShape::Both,
            (None, None) => LegShape::Neither,
        }
    }

    /// True when either leg is in `currency`.
    pub fn touches(&self, currency: &str) -> bool {
        self.buy_currency() == currency || self.sell_currency() == currency
    }

    pub fn touches_any(&self, currencies: &[String]) -> bool {
        currencies.iter().any(|c| self.touches(c))
    }

    /// The fee leg, whenever a fee currency is named (zero amounts included).
    pub fn fee_source(&self) -> Option<&Leg> {
        self.fee.as_ref()
    }

    pub fn has_usd_equivalent(&self) -> bool {
        !self.usd_equivalent.is_zero()
    }

    /// Copy with a different type, legs and amounts otherwise untouched.
    pub fn with_type(&self, transaction_type: TransactionType) -> Self {
        Self {
            transaction_type,
            ..self.clone()
        }
    }

    /// New record sharing this record's exchange, id, group, import, comment
    /// and timestamps, with the given type, legs, fee and USD equivalent.
    pub fn rebuilt(
        &self,
        transaction_type: TransactionType,
        buy: Option<Leg>,
        sell: Option<Leg>,
        fee: Option<Leg>,
        usd_equivalent: Decimal,
    ) -> Self {
        Self {
            transaction_type,
            buy,
            sell,
            fee,
            usd_equivalent,
            ..self.clone()
        }
    }

    /// Timestamps truncated to whole seconds, for group consistency checks.
    pub fn date_to_second(&self) -> NaiveDateTime {
        self.date.trunc_subsecs(0)
    }

    pub fn updated_at_to_second(&self) -> NaiveDateTime {
        self.updated_at.trunc_subsecs(0)
    }
}

fn field_value(fields: &HashMap<String, String>, row: usize, name: &str) -> Result<String, ReconError> {
    fields.get(name).cloned().ok_or_else(|| ReconError::MalformedRecord {
        row,
        field: name.into(),
        value: "<missing>".into(),
    })
}

fn parse_amount(row: usize, field: &str, value: &str) -> Result<Decimal, ReconError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ReconError::MalformedRecord {
            row,
            field: field.into(),
            value: value.into(),
        })
}

fn parse_timestamp(row: usize, field: &str, value: &str) -> Result<NaiveDateTime, ReconError> {
    let malformed = || ReconError::MalformedRecord {
        row,
        field: field.into(),
        value: value.into(),
    };
    // chrono treats `%.f` as optional; the fraction is required here.
    if !value.contains('.') {
        return Err(malformed());
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).map_err(|_| malformed())
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// All records sharing one exchange id hash, in input order.
#[derive(Debug, Clone)]
pub struct TransactionGroup {
    pub hash: String,
    pub records: Vec<TransactionRecord>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Histogram of group size → number of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupSizeCounts(BTreeMap<usize, usize>);

impl GroupSizeCounts {
    pub fn record(&mut self, size: usize) {
        *self.0.entry(size).or_insert(0) += 1;
    }

    pub fn get(&self, size: usize) -> usize {
        self.0.get(&size).copied().unwrap_or(0)
    }

    /// Number of groups across all sizes.
    pub fn groups(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(size, count)| (*size, *count))
    }
}

impl fmt::Display for GroupSizeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (size, count)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{size}: {count}")?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedGroup {
    pub hash: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub rule_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub meta: ReconMeta,
    pub input_records: usize,
    pub output_records: usize,
    pub input_groups: GroupSizeCounts,
    pub unmatched_groups: GroupSizeCounts,
    pub output_groups: GroupSizeCounts,
    pub unmatched: Vec<UnmatchedGroup>,
}

impl ReconSummary {
    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Io(e.to_string()))
    }
}

/// Records to write back plus run diagnostics.
#[derive(Debug, Clone)]
pub struct ReconOutput {
    pub records: Vec<TransactionRecord>,
    pub summary: ReconSummary,
}
