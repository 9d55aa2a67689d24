//! CLI Exit Code Registry
//!
//! Single source of truth for `tokenmend` exit codes. Scripts rely on them,
//! so existing values never change meaning.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments)                          |
//! | 3    | Input ledger file missing                            |
//! | 4    | Output directory missing                             |
//! | 5    | Rules file missing                                   |
//! | 6    | Rules file failed to parse or validate               |
//! | 7    | Input ledger malformed                               |
//! | 8    | An alteration failed (run aborted, nothing written)  |
//! | 9    | Output could not be written                          |
//!
//! Codes 3-9 follow the order `tokenmend run` checks things in. A new failure
//! gets the next free number and a row in the table, and
//! `recon_exit_code` picks it up when it comes from the engine.

use tokenmend_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Anything without its own code, such as a summary that fails to serialize.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Files (3-5)
// =============================================================================

pub const EXIT_INPUT_MISSING: u8 = 3;

/// Parent directory of the output CSV does not exist.
pub const EXIT_OUTPUT_DIR_MISSING: u8 = 4;

pub const EXIT_RULES_MISSING: u8 = 5;

// =============================================================================
// Run (6-9)
// =============================================================================

/// Rules TOML is not valid syntax, has unknown fields or actions, or fails
/// validation.
pub const EXIT_RULES_INVALID: u8 = 6;

/// Ledger CSV is missing a column or has a row that cannot be parsed.
pub const EXIT_INPUT_MALFORMED: u8 = 7;

/// An action rejected its group. The whole run is aborted.
pub const EXIT_ALTERATION_FAILED: u8 = 8;

pub const EXIT_WRITE_FAILED: u8 = 9;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RULES_INVALID,
        ReconError::MissingColumn { .. } | ReconError::MalformedRecord { .. } => EXIT_INPUT_MALFORMED,
        ReconError::InconsistentGroup { .. }
        | ReconError::AmbiguousSource { .. }
        | ReconError::UnsupportedShape { .. }
        | ReconError::TypeConstraint { .. }
        | ReconError::EmptyMerge { .. } => EXIT_ALTERATION_FAILED,
        ReconError::Io(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INPUT_MISSING,
            EXIT_OUTPUT_DIR_MISSING,
            EXIT_RULES_MISSING,
            EXIT_RULES_INVALID,
            EXIT_INPUT_MALFORMED,
            EXIT_ALTERATION_FAILED,
            EXIT_WRITE_FAILED,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn recon_errors_map_by_stage() {
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_RULES_INVALID);
        assert_eq!(
            recon_exit_code(&ReconError::MissingColumn { column: "Type".into() }),
            EXIT_INPUT_MALFORMED
        );
        assert_eq!(
            recon_exit_code(&ReconError::EmptyMerge { hash: "h".into(), currency: "ETH".into() }),
            EXIT_ALTERATION_FAILED
        );
        assert_eq!(recon_exit_code(&ReconError::Io("x".into())), EXIT_ERROR);
    }
}
