// tokenmend CLI - rewrite TokenTax ledger exports with an alteration rule file

mod alter;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tokenmend")]
#[command(about = "Regroup split TokenTax ledger rows into trades, migrations and staking income")]
#[command(version)]
struct Cli {
    /// More logging (-v debug, -vv trace). Ignored when --log-level is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive)
    #[arg(long, global = true, env = "TOKENMEND_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply alteration rules to a ledger export and write the result
    #[command(after_help = "\
Examples:
  tokenmend run tokentax.csv altered.csv rules.toml
  tokenmend run tokentax.csv altered.csv rules.toml --json
  tokenmend run export.csv out.csv rules.toml --delimiter ';' --summary summary.json
  tokenmend run tokentax.csv altered.csv rules.toml -v")]
    Run {
        /// Ledger CSV exported from TokenTax
        input: PathBuf,

        /// Where to write the altered ledger CSV
        output: PathBuf,

        /// Alteration rules (TOML)
        rules: PathBuf,

        /// CSV delimiter, for both input and output
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the run summary as JSON to a file
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,
    },

    /// Check that a rules file parses and validates
    #[command(after_help = "\
Examples:
  tokenmend validate rules.toml")]
    Validate {
        /// Alteration rules (TOML)
        rules: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Run { input, output, rules, delimiter, json, summary } => {
            alter::cmd_run(alter::RunArgs { input, output, rules, delimiter, json, summary })
        }
        Commands::Validate { rules } => alter::cmd_validate(rules),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Install a stderr subscriber. The library logs through `log`; the
/// subscriber's log bridge picks those records up.
fn init_logging(verbose: u8, log_level: Option<&str>) {
    let directive = match (log_level, verbose) {
        (Some(level), _) => level.to_string(),
        (None, 0) => "warn".to_string(),
        (None, 1) => "debug".to_string(),
        (None, _) => "trace".to_string(),
    };
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Create error from a recon error with the matching exit code.
    pub fn recon(err: tokenmend_recon::ReconError) -> Self {
        Self::new(recon_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
