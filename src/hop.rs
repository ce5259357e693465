//! C4: tag-hop detection for dual-indexed runs.
//!
//! Invoked only when the match engine returns [`crate::match_engine::Match::Unassigned`]
//! on a dual-indexed table. Looks for a candidate whose `idx1` half is an
//! exact match to one table entry and whose `idx2` half is an exact match
//! to a (possibly different) entry — a hop artefact, not a new sample.

use std::collections::HashMap;

use crate::barcode_table::{BarcodeEntry, BarcodeTable};
use crate::metrics::Counters;
use crate::seq::{join_index, mismatches, split_index};

const DUMMY_LIB: &str = "DUMMY_LIB";
const DUMMY_SAMPLE: &str = "DUMMY_SAMPLE";

/// Interning table of observed hop keys (`idx1-idx2`) to synthesized
/// [`BarcodeEntry`] rows, owned by the stream driver for the run's
/// duration.
#[derive(Debug, Default)]
pub struct HopTable {
    entries: Vec<BarcodeEntry>,
    index: HashMap<String, usize>,
}

impl HopTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[BarcodeEntry] {
        &self.entries
    }

    pub fn get_mut(&mut self, index: usize) -> &mut BarcodeEntry {
        &mut self.entries[index]
    }

    /// Record one template's observation against `entries[index]` (C5),
    /// mirroring [`crate::barcode_table::BarcodeTable::record_match`].
    pub fn record_match(&mut self, index: usize, candidate: &str, is_pf: bool) {
        let nm = mismatches(&self.entries[index].seq, candidate, 999);
        self.entries[index].counters.record(Some(nm), is_pf);
    }

    /// Intern (or look up) the hop entry for `(idx1, idx2)`, returning its
    /// index into this table.
    fn intern(&mut self, idx1: &str, idx2: &str) -> usize {
        let key = join_index(idx1, idx2);
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let entry = BarcodeEntry {
            idx1: idx1.to_string(),
            idx2: idx2.to_string(),
            seq: key.clone(),
            name: "0".to_string(),
            library: DUMMY_LIB.to_string(),
            sample: DUMMY_SAMPLE.to_string(),
            description: String::new(),
            counters: Counters::default(),
        };
        let i = self.entries.len();
        self.entries.push(entry);
        self.index.insert(key, i);
        i
    }
}

/// Try to identify a cross-pair hop for `candidate` against `table`.
/// Returns the index into `hops` for the interned hop entry, or `None`
/// if neither half matched exactly (no hop to report).
pub fn detect_hop(
    table: &BarcodeTable,
    hops: &mut HopTable,
    candidate: &str,
    dual_tag: usize,
) -> Option<usize> {
    let (c1, c2) = split_index(candidate, dual_tag);

    let mut best1: Option<&str> = None;
    let mut best1_nm = usize::MAX;
    let mut best2: Option<&str> = None;
    let mut best2_nm = usize::MAX;

    for (_, entry) in table.real_entries() {
        let nm1 = mismatches(&entry.idx1, &c1, best1_nm);
        if nm1 < best1_nm {
            best1_nm = nm1;
            best1 = Some(&entry.idx1);
        }
        let nm2 = mismatches(&entry.idx2, &c2, best2_nm);
        if nm2 < best2_nm {
            best2_nm = nm2;
            best2 = Some(&entry.idx2);
        }
    }

    if best1_nm == 0 && best2_nm == 0 {
        let (idx1, idx2) = (best1?, best2?);
        Some(hops.intern(idx1, idx2))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode_table::BarcodeTable;

    fn load_dual(contents: &str) -> BarcodeTable {
        let path = std::env::temp_dir().join(format!(
            "bcdecode-hop-test-{}-{:x}.tsv",
            std::process::id(),
            contents.len() as u64 * 2654435761
        ));
        std::fs::write(&path, contents).unwrap();
        let table = BarcodeTable::load(&path, 0).unwrap();
        let _ = std::fs::remove_file(&path);
        table
    }

    #[test]
    fn hop_is_detected_and_interned() {
        let table = load_dual(
            "seq\tname\tlib\tsample\tdesc\nAAAA-GGGG\ts1\tl1\ts1\td1\nCCCC-TTTT\ts2\tl2\ts2\td2\n",
        );
        let mut hops = HopTable::new();
        let i = detect_hop(&table, &mut hops, "AAAA-TTTT", 0).expect("hop expected");
        let e = &hops.entries()[i];
        assert_eq!(e.idx1, "AAAA");
        assert_eq!(e.idx2, "TTTT");
        assert_eq!(e.seq, "AAAA-TTTT");
        assert_eq!(e.name, "0");
        assert_eq!(e.library, DUMMY_LIB);
        assert_eq!(e.sample, DUMMY_SAMPLE);

        // Re-observing the same hop key interns to the same entry.
        let j = detect_hop(&table, &mut hops, "AAAA-TTTT", 0).unwrap();
        assert_eq!(i, j);
        assert_eq!(hops.entries().len(), 1);
    }

    #[test]
    fn no_hop_when_neither_half_is_exact() {
        let table = load_dual(
            "seq\tname\tlib\tsample\tdesc\nAAAA-GGGG\ts1\tl1\ts1\td1\nCCCC-TTTT\ts2\tl2\ts2\td2\n",
        );
        let mut hops = HopTable::new();
        assert!(detect_hop(&table, &mut hops, "AAAT-TTTA", 0).is_none());
    }
}
