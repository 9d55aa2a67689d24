//! TokenTax ledger CSV in and out.

use std::collections::HashMap;

use crate::currency::CurrencyFormat;
use crate::error::ReconError;
use crate::model::{TransactionRecord, COLUMNS};

/// Parse a ledger export into records, in file order.
pub fn load_csv_records(
    csv_data: &str,
    delimiter: u8,
    currency_format: &CurrencyFormat,
) -> Result<Vec<TransactionRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for column in COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ReconError::MissingColumn {
                column: column.into(),
            });
        }
    }

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| ReconError::Io(format!("row {}: {e}", i + 1)))?;
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        records.push(TransactionRecord::from_fields(i + 1, &fields, currency_format)?);
    }

    Ok(records)
}

/// Render records as a ledger export with the standard header.
pub fn write_csv_records(
    records: &[TransactionRecord],
    delimiter: u8,
    currency_format: &CurrencyFormat,
) -> Result<String, ReconError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(COLUMNS)
        .map_err(|e| ReconError::Io(e.to_string()))?;
    for record in records {
        writer
            .write_record(record.to_fields(currency_format))
            .map_err(|e| ReconError::Io(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReconError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReconError::Io(e.to_string()))
}
