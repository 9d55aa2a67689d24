use serde::Deserialize;

use crate::currency::CurrencyFormat;
use crate::error::ReconError;
use crate::model::TransactionType;

// ---------------------------------------------------------------------------
// Top-level rule document
// ---------------------------------------------------------------------------

/// Ordered rule set. Evaluated top to bottom; the first full match wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlterationsMapping {
    /// How `USDEquivalent` strings are written in the ledger export.
    #[serde(default)]
    pub currency_format: CurrencyFormat,
    pub alterations: Vec<Alteration>,
}

// ---------------------------------------------------------------------------
// Alteration
// ---------------------------------------------------------------------------

/// One rule: optional hash pin, the pattern multiset a group must satisfy,
/// and the actions applied in order when it does.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Alteration {
    #[serde(default, alias = "tx_hash")]
    pub hash: Option<String>,
    #[serde(alias = "tx_patterns")]
    pub patterns: Vec<AlterationPattern>,
    pub actions: Vec<Action>,
}

/// Partial matcher over one record. `None` fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlterationPattern {
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub buy_currency: Option<String>,
    #[serde(default)]
    pub sell_currency: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Group transform, selected by its `name` discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Action {
    DoNothing,
    ConvertToTrades,
    ConvertToSingleStakeTrades {
        unstaked_token: String,
        staked_token: String,
    },
    ConvertToMigrations {
        #[serde(default)]
        rewards: Option<Vec<String>>,
    },
    ConvertToStaking,
    ConvertToStakeMigration {
        unstaked_token: String,
        staked_token: String,
        #[serde(default)]
        rewards: Option<Vec<String>>,
    },
    KeepOnlyTypes {
        keeps: Vec<TransactionType>,
    },
    #[serde(rename = "rename_to")]
    RenameToken {
        token_name: String,
        rename_to: String,
    },
    RemoveContaining {
        removes: Vec<String>,
    },
    MergeSameCurrency {
        merge_currency: String,
    },
}

impl Action {
    /// The discriminant as written in the rule document.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DoNothing => "do_nothing",
            Self::ConvertToTrades => "convert_to_trades",
            Self::ConvertToSingleStakeTrades { .. } => "convert_to_single_stake_trades",
            Self::ConvertToMigrations { .. } => "convert_to_migrations",
            Self::ConvertToStaking => "convert_to_staking",
            Self::ConvertToStakeMigration { .. } => "convert_to_stake_migration",
            Self::KeepOnlyTypes { .. } => "keep_only_types",
            Self::RenameToken { .. } => "rename_to",
            Self::RemoveContaining { .. } => "remove_containing",
            Self::MergeSameCurrency { .. } => "merge_same_currency",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::ConvertToSingleStakeTrades { unstaked_token, staked_token }
            | Self::ConvertToStakeMigration { unstaked_token, staked_token, .. } => {
                if unstaked_token.is_empty() || staked_token.is_empty() {
                    return Err(format!("{}: token names cannot be empty", self.name()));
                }
                if unstaked_token == staked_token {
                    return Err(format!(
                        "{}: unstaked and staked token are both '{unstaked_token}'",
                        self.name()
                    ));
                }
            }
            Self::KeepOnlyTypes { keeps } if keeps.is_empty() => {
                return Err("keep_only_types: keeps cannot be empty".into());
            }
            Self::RemoveContaining { removes } if removes.is_empty() => {
                return Err("remove_containing: removes cannot be empty".into());
            }
            Self::RenameToken { token_name, rename_to } => {
                if token_name.is_empty() || rename_to.is_empty() {
                    return Err("rename_to: token names cannot be empty".into());
                }
                if token_name == rename_to {
                    return Err(format!("rename_to: '{token_name}' renamed to itself"));
                }
            }
            Self::MergeSameCurrency { merge_currency } if merge_currency.is_empty() => {
                return Err("merge_same_currency: merge_currency cannot be empty".into());
            }
            _ => {}
        }
        Ok(())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AlterationsMapping {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let mapping: AlterationsMapping =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.alterations.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one alteration is required".into(),
            ));
        }

        self.currency_format
            .validate()
            .map_err(ReconError::ConfigValidation)?;

        for (i, alteration) in self.alterations.iter().enumerate() {
            let label = alteration
                .hash
                .as_ref()
                .map(|h| format!("alteration #{} (hash '{h}')", i + 1))
                .unwrap_or_else(|| format!("alteration #{}", i + 1));

            if alteration.hash.as_deref() == Some("") {
                return Err(ReconError::ConfigValidation(format!("{label}: hash cannot be empty")));
            }
            if alteration.patterns.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{label}: at least one pattern is required"
                )));
            }
            if alteration.actions.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{label}: at least one action is required"
                )));
            }
            for action in &alteration.actions {
                action
                    .validate()
                    .map_err(|msg| ReconError::ConfigValidation(format!("{label}: {msg}")))?;
            }
        }

        Ok(())
    }

    /// Number of rules pinned to a specific hash.
    pub fn pinned_count(&self) -> usize {
        self.alterations.iter().filter(|a| a.hash.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
