//! `tokenmend run` / `tokenmend validate`.

use std::path::{Path, PathBuf};

use tokenmend_recon::ledger::{load_csv_records, write_csv_records};
use tokenmend_recon::model::ReconSummary;
use tokenmend_recon::{AlterationsMapping, ReconError};

use crate::exit_codes::{
    EXIT_ALTERATION_FAILED, EXIT_INPUT_MALFORMED, EXIT_INPUT_MISSING, EXIT_OUTPUT_DIR_MISSING,
    EXIT_RULES_MISSING, EXIT_WRITE_FAILED,
};
use crate::CliError;

pub struct RunArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rules: PathBuf,
    pub delimiter: char,
    pub json: bool,
    pub summary: Option<PathBuf>,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let delimiter = delimiter_byte(args.delimiter)?;

    if !args.input.is_file() {
        return Err(CliError::new(
            EXIT_INPUT_MISSING,
            format!("input ledger not found: {}", args.input.display()),
        ));
    }
    let output_dir = args
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !output_dir.is_dir() {
        return Err(CliError::new(
            EXIT_OUTPUT_DIR_MISSING,
            format!("output directory not found: {}", output_dir.display()),
        ));
    }

    let mapping = load_rules(&args.rules)?;

    let csv_data = std::fs::read_to_string(&args.input).map_err(|e| {
        CliError::new(EXIT_INPUT_MALFORMED, format!("cannot read {}: {e}", args.input.display()))
    })?;
    let records = load_csv_records(&csv_data, delimiter, &mapping.currency_format).map_err(|e| {
        let err = match e {
            ReconError::Io(msg) => CliError::new(EXIT_INPUT_MALFORMED, msg),
            other => CliError::recon(other),
        };
        err.with_hint(format!("while reading {}", args.input.display()))
    })?;
    log::debug!("loaded {} records from {}", records.len(), args.input.display());

    let output = tokenmend_recon::run(&mapping, records).map_err(|e| {
        CliError::new(EXIT_ALTERATION_FAILED, e.to_string())
            .with_hint("no output was written; fix the rule or the ledger rows for this hash")
    })?;

    let written = write_csv_records(&output.records, delimiter, &mapping.currency_format)
        .map_err(|e| CliError::new(EXIT_WRITE_FAILED, e.to_string()))?;
    std::fs::write(&args.output, written).map_err(|e| {
        CliError::new(EXIT_WRITE_FAILED, format!("cannot write {}: {e}", args.output.display()))
    })?;

    let summary = &output.summary;
    if args.json || args.summary.is_some() {
        let json_str = summary.to_json().map_err(CliError::recon)?;
        if let Some(ref path) = args.summary {
            std::fs::write(path, &json_str).map_err(|e| {
                CliError::new(EXIT_WRITE_FAILED, format!("cannot write summary: {e}"))
            })?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    print_summary(summary, &args.output);
    Ok(())
}

pub fn cmd_validate(rules: PathBuf) -> Result<(), CliError> {
    let mapping = load_rules(&rules)?;
    eprintln!(
        "{}: {} alterations ({} hash-pinned), ok",
        rules.display(),
        mapping.alterations.len(),
        mapping.pinned_count(),
    );
    Ok(())
}

fn load_rules(path: &Path) -> Result<AlterationsMapping, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_RULES_MISSING, format!("cannot read rules {}: {e}", path.display()))
    })?;
    AlterationsMapping::from_toml(&text)
        .map_err(|e| CliError::recon(e).with_hint(format!("in {}", path.display())))
}

fn delimiter_byte(delimiter: char) -> Result<u8, CliError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(CliError::args(format!("delimiter must be a single ASCII character, got '{delimiter}'")))
    }
}

// Human summary to stderr
fn print_summary(summary: &ReconSummary, output: &Path) {
    eprintln!(
        "{} records in {} groups -> {} records in {} ({} groups unmatched)",
        summary.input_records,
        summary.input_groups.groups(),
        summary.output_records,
        output.display(),
        summary.unmatched_groups.groups(),
    );
    eprintln!("input group sizes:     {}", summary.input_groups);
    eprintln!("unmatched group sizes: {}", summary.unmatched_groups);
    eprintln!("output group sizes:    {}", summary.output_groups);
    for group in &summary.unmatched {
        eprintln!("  unmatched: {} ({} records)", group.hash, group.size);
    }
}
