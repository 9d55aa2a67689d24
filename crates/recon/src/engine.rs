use std::collections::HashMap;

use crate::config::{Action, AlterationsMapping};
use crate::error::ReconError;
use crate::model::{
    GroupSizeCounts, ReconMeta, ReconOutput, ReconSummary, TransactionGroup, TransactionRecord,
    UnmatchedGroup,
};
use crate::resolver::{resolve, resolve_pinned};

/// Run the rule set over a full ledger. Returns the rewritten records plus
/// group-size diagnostics.
///
/// Single-record groups pass through unless a hash-pinned rule claims them.
/// Larger groups with no matching rule are dropped and reported as unmatched.
/// The first action error aborts the whole run.
pub fn run(mapping: &AlterationsMapping, records: Vec<TransactionRecord>) -> Result<ReconOutput, ReconError> {
    let input_records = records.len();
    let groups = group_by_hash(records);

    let mut input_groups = GroupSizeCounts::default();
    let mut unmatched_groups = GroupSizeCounts::default();
    let mut output_groups = GroupSizeCounts::default();
    let mut unmatched = Vec::new();
    let mut output = Vec::with_capacity(input_records);

    for group in groups {
        let size = group.records.len();
        input_groups.record(size);

        let alteration = if size == 1 {
            resolve_pinned(mapping, &group.hash, &group.records)
        } else {
            resolve(mapping, &group.hash, &group.records)
        };

        match alteration {
            Some(alteration) => {
                log_legs("before", &group.hash, &group.records);
                let altered = apply_actions(&alteration.actions, group.records)?;
                log_legs("after", &group.hash, &altered);
                output.extend(altered);
                output_groups.record(size);
            }
            None if size == 1 => {
                output.extend(group.records);
                output_groups.record(size);
            }
            None => {
                log::warn!("hash {}: no alteration matches group of {size} records", group.hash);
                unmatched_groups.record(size);
                unmatched.push(UnmatchedGroup { hash: group.hash, size });
            }
        }
    }

    log::info!("input group sizes: {input_groups}");
    log::info!("unmatched group sizes: {unmatched_groups}");
    log::info!("output group sizes: {output_groups}");

    Ok(ReconOutput {
        summary: ReconSummary {
            meta: ReconMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                rule_count: mapping.alterations.len(),
            },
            input_records,
            output_records: output.len(),
            input_groups,
            unmatched_groups,
            output_groups,
            unmatched,
        },
        records: output,
    })
}

/// Group records by exchange id hash, groups in first-seen order and records
/// in input order within each group.
pub fn group_by_hash(records: Vec<TransactionRecord>) -> Vec<TransactionGroup> {
    let mut groups: Vec<TransactionGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let hash = record.hash().to_string();
        match index.get(&hash) {
            Some(&i) => groups[i].records.push(record),
            None => {
                index.insert(hash.clone(), groups.len());
                groups.push(TransactionGroup {
                    hash,
                    records: vec![record],
                });
            }
        }
    }

    groups
}

/// Run actions in order, each over the previous action's output.
pub fn apply_actions(
    actions: &[Action],
    records: Vec<TransactionRecord>,
) -> Result<Vec<TransactionRecord>, ReconError> {
    actions
        .iter()
        .try_fold(records, |current, action| {
            log::trace!("{action} over {} records", current.len());
            action.apply(&current)
        })
}

fn log_legs(stage: &str, hash: &str, records: &[TransactionRecord]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for record in records {
        log::debug!(
            "hash {hash} {stage}: {} buy={} {} sell={} {}",
            record.transaction_type,
            record.buy.as_ref().map(|l| l.amount.to_string()).unwrap_or_default(),
            record.buy_currency(),
            record.sell.as_ref().map(|l| l.amount.to_string()).unwrap_or_default(),
            record.sell_currency(),
        );
    }
}
