//! Currency-string handling for the `USDEquivalent` column.
//!
//! The format is passed in explicitly instead of being read from process
//! locale state, so the same binary can read exports from any locale.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

/// How a locale renders currency amounts, e.g. `$1,234.56` or `1.234,56 €`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub decimal_separator: char,
    pub group_separator: char,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "$".into(),
            decimal_separator: '.',
            group_separator: ',',
        }
    }
}

impl CurrencyFormat {
    /// Parse a currency string. Empty input is zero; negatives may use a
    /// leading `-` or surrounding parentheses. Returns `None` when the
    /// remainder is not a decimal number.
    pub fn parse(&self, value: &str) -> Option<Decimal> {
        let mut text = value.trim().to_string();
        if !self.symbol.is_empty() {
            text = text.replace(self.symbol.as_str(), "");
        }
        let mut text = text.trim().trim_matches('\u{a0}').trim();
        if text.is_empty() {
            return Some(Decimal::ZERO);
        }

        let mut negative = false;
        if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            negative = true;
            text = inner.trim();
        } else if let Some(rest) = text.strip_prefix('-') {
            negative = true;
            text = rest.trim();
        }

        let normalized: String = text
            .chars()
            .filter(|c| *c != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();
        if normalized.is_empty() || normalized.starts_with('-') || normalized.starts_with('+') {
            return None;
        }

        let amount = Decimal::from_str(&normalized).ok()?;
        Some(if negative { -amount } else { amount })
    }

    /// Render an amount with the symbol, two decimals and group separators.
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp(2);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let digits = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, c) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(self.group_separator);
            }
            grouped.push(c);
        }

        format!(
            "{}{}{}{}{}",
            if negative { "-" } else { "" },
            self.symbol,
            grouped,
            self.decimal_separator,
            frac_part,
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.decimal_separator == self.group_separator {
            return Err(format!(
                "currency_format: decimal and group separators are both '{}'",
                self.decimal_separator
            ));
        }
        if self.decimal_separator.is_ascii_digit() || self.group_separator.is_ascii_digit() {
            return Err("currency_format: separators cannot be digits".into());
        }
        Ok(())
    }
}
