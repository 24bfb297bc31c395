use crate::types::{RawTable, RawValue};

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a section for the same key, recurse.
/// Otherwise, `overlay`'s value wins.
///
/// Keys match case-insensitively (`[db]` in one file overrides `[DB]` in the
/// other). Base keys keep their position; keys only in `overlay` are appended.
pub fn deep_merge(mut base: RawTable, overlay: RawTable) -> RawTable {
    for (key, overlay_val) in overlay {
        let existing = base
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(&key));

        let Some(idx) = existing else {
            base.push((key, overlay_val));
            continue;
        };

        let base_val = std::mem::replace(&mut base[idx].1, RawValue::Table(RawTable::new()));
        base[idx].1 = match (base_val, overlay_val) {
            (RawValue::Table(base_tbl), RawValue::Table(overlay_tbl)) => {
                RawValue::Table(deep_merge(base_tbl, overlay_tbl))
            }
            (_, overlay_val) => overlay_val,
        };
    }
    base
}
