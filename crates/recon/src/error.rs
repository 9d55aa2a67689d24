use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error in the rule document.
    ConfigParse(String),
    /// Rule document validation error (empty pattern list, bad token pair, etc.).
    ConfigValidation(String),
    /// Missing required column in the ledger CSV header.
    MissingColumn { column: String },
    /// A ledger row could not be turned into a record.
    MalformedRecord { row: usize, field: String, value: String },
    /// A field that must be shared by a whole group differs between records.
    InconsistentGroup { hash: String, field: &'static str },
    /// More than one record in a group supplies a fee or USD equivalent.
    AmbiguousSource { hash: String, source: &'static str, count: usize },
    /// Buy/sell leg arity the action cannot handle.
    UnsupportedShape { hash: String, action: &'static str, detail: String },
    /// A record's type violates the action's precondition.
    TypeConstraint { hash: String, action: &'static str, found: String },
    /// A currency merge netted to exactly zero.
    EmptyMerge { hash: String, currency: String },
    /// IO error (file read, CSV write, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "rules parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "rules validation error: {msg}"),
            Self::MissingColumn { column } => write!(f, "missing column '{column}'"),
            Self::MalformedRecord { row, field, value } => {
                write!(f, "row {row}: cannot parse {field} '{value}'")
            }
            Self::InconsistentGroup { hash, field } => {
                write!(f, "hash '{hash}': records disagree on {field}")
            }
            Self::AmbiguousSource { hash, source, count } => {
                write!(f, "hash '{hash}': {count} records supply a {source}, expected at most one")
            }
            Self::UnsupportedShape { hash, action, detail } => {
                write!(f, "hash '{hash}': {action} cannot handle {detail}")
            }
            Self::TypeConstraint { hash, action, found } => {
                write!(f, "hash '{hash}': {action} found unexpected type {found}")
            }
            Self::EmptyMerge { hash, currency } => {
                write!(f, "hash '{hash}': merge of {currency} cancelled out completely")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
