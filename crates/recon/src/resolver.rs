use crate::config::{Alteration, AlterationsMapping};
use crate::matcher::matches_group;
use crate::model::TransactionRecord;

/// First alteration, in document order, whose hash pin (if any) equals
/// `group_hash` and whose patterns match `records`.
pub fn resolve<'a>(
    mapping: &'a AlterationsMapping,
    group_hash: &str,
    records: &[TransactionRecord],
) -> Option<&'a Alteration> {
    find(mapping, group_hash, records, |_| true)
}

/// Like [`resolve`], restricted to hash-pinned alterations. Used for
/// single-record groups, which otherwise pass through untouched.
pub fn resolve_pinned<'a>(
    mapping: &'a AlterationsMapping,
    group_hash: &str,
    records: &[TransactionRecord],
) -> Option<&'a Alteration> {
    find(mapping, group_hash, records, |a| a.hash.is_some())
}

fn find<'a>(
    mapping: &'a AlterationsMapping,
    group_hash: &str,
    records: &[TransactionRecord],
    eligible: impl Fn(&Alteration) -> bool,
) -> Option<&'a Alteration> {
    for (i, alteration) in mapping.alterations.iter().enumerate() {
        if !eligible(alteration) {
            continue;
        }
        if let Some(ref pin) = alteration.hash {
            if pin != group_hash {
                continue;
            }
        }
        if alteration.patterns.len() != records.len() {
            continue;
        }
        if matches_group(records, &alteration.patterns) {
            log::debug!("hash {group_hash}: alteration #{} matches", i + 1);
            return Some(alteration);
        }
    }
    None
}
