//! C1: the expected-barcode table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{DecodeError, Result};
use crate::metrics::Counters;
use crate::seq::{join_index, mismatches, split_index};

/// One row of the expected-barcode table, or the sentinel entry `E0`.
#[derive(Debug, Clone)]
pub struct BarcodeEntry {
    pub seq: String,
    pub idx1: String,
    pub idx2: String,
    pub name: String,
    pub library: String,
    pub sample: String,
    pub description: String,
    pub counters: Counters,
}

/// Index of the sentinel "unassigned" entry, always the first row.
pub const SENTINEL: usize = 0;

/// Ordered barcode table plus an exact-match lookup, as loaded from the
/// barcode file. `entries[SENTINEL]` is always `E0`.
#[derive(Debug)]
pub struct BarcodeTable {
    pub entries: Vec<BarcodeEntry>,
    exact: HashMap<String, usize>,
    pub idx1_len: usize,
    pub idx2_len: usize,
}

impl BarcodeTable {
    /// Parse a tab-separated barcode file: one discarded header line, then
    /// rows of `seq\tname\tlibrary\tsample\tdescription`.
    pub fn load(path: &Path, dual_tag: usize) -> Result<BarcodeTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DecodeError::BarcodeTableIoError {
                path: path.to_path_buf(),
                source: csv_error_to_io(e),
            })?;

        let mut entries = Vec::new();
        let mut idx1_len = 0usize;
        let mut idx2_len = 0usize;

        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|e| DecodeError::BarcodeTableIoError {
                path: path.to_path_buf(),
                source: csv_error_to_io(e),
            })?;
            let seq = field(&record, 0, path)?;
            let name = field(&record, 1, path)?;
            let library = field(&record, 2, path)?;
            let sample = field(&record, 3, path)?;
            let description = field(&record, 4, path)?;

            let (idx1, idx2) = split_index(&seq, dual_tag);

            if entries.is_empty() {
                idx1_len = idx1.len();
                idx2_len = idx2.len();
            } else if idx1_len != idx1.len() && idx2_len != idx2.len() {
                // Laxness preserved deliberately: a row only fails when
                // *both* halves differ in length from the first row (see
                // SPEC_FULL.md §F.3 / spec.md §9).
                return Err(DecodeError::BarcodeShapeMismatch {
                    seq,
                    line: line + 2, // +1 for the discarded header, +1 for 1-based
                    expected_idx1: idx1_len,
                    expected_idx2: idx2_len,
                });
            }

            // Entries always carry the SEP-joined form of `seq`, even when
            // the file's own column is separator-less (dual_tag mode):
            // candidates built by `join_index` in the driver and the
            // sentinel below use the same convention, so exact lookup and
            // mismatch counting never see a spurious separator-column
            // mismatch (spec.md §3: seq = idx1 [SEP idx2]).
            let normalized_seq = join_index(&idx1, &idx2);
            entries.push(BarcodeEntry {
                seq: normalized_seq,
                idx1,
                idx2,
                name,
                library,
                sample,
                description,
                counters: Counters::default(),
            });
        }

        debug!(
            "loaded {} barcodes from {} (idx1_len={idx1_len}, idx2_len={idx2_len})",
            entries.len(),
            path.display()
        );

        let sentinel = BarcodeEntry {
            idx1: "N".repeat(idx1_len),
            idx2: "N".repeat(idx2_len),
            seq: join_index(&"N".repeat(idx1_len), &"N".repeat(idx2_len)),
            name: "0".to_string(),
            library: String::new(),
            sample: String::new(),
            description: String::new(),
            counters: Counters::default(),
        };
        entries.insert(SENTINEL, sentinel);

        let mut exact = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            exact.insert(e.seq.clone(), i);
        }

        Ok(BarcodeTable {
            entries,
            exact,
            idx1_len,
            idx2_len,
        })
    }

    pub fn is_dual_indexed(&self) -> bool {
        self.idx2_len > 0
    }

    /// Length of the raw, separator-less concatenated barcode column
    /// (`idx1_len + idx2_len`), used to validate `dual_tag` against
    /// `[2, seq_len-1]` once the table is loaded. `dual_tag` is a 1-based
    /// offset into the file's own `seq` column, which carries no
    /// separator in dual-tag mode — distinct from `BarcodeEntry::seq`,
    /// which is always normalized to the SEP-joined form (see `load`).
    pub fn seq_len(&self) -> usize {
        self.idx1_len + self.idx2_len
    }

    /// Real (non-sentinel) rows, in file order.
    pub fn real_entries(&self) -> impl Iterator<Item = (usize, &BarcodeEntry)> {
        self.entries.iter().enumerate().skip(1)
    }

    pub fn exact_lookup(&self, seq: &str) -> Option<usize> {
        self.exact.get(seq).copied()
    }

    pub fn get(&self, index: usize) -> &BarcodeEntry {
        &self.entries[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut BarcodeEntry {
        &mut self.entries[index]
    }

    /// Record one template's observation against `entries[index]` (C5).
    /// The only way counters are ever mutated, keeping them free of
    /// aliased writers (spec.md §9).
    pub fn record_match(&mut self, index: usize, candidate: &str, is_pf: bool) {
        let nm = mismatches(&self.entries[index].seq, candidate, 999);
        self.entries[index].counters.record(Some(nm), is_pf);
    }
}

fn field(record: &csv::StringRecord, index: usize, path: &Path) -> Result<String> {
    record
        .get(index)
        .map(|s| s.to_string())
        .ok_or_else(|| DecodeError::BarcodeTableIoError {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("row {} is missing a field", record.position().map(|p| p.line()).unwrap_or(0)),
            ),
        })
}

fn csv_error_to_io(e: csv::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}

/// Convenience used by callers that only have a metrics-file base path,
/// e.g. the `.hops` sibling (C8).
pub fn sibling_path(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Minimal stand-in for a temp file so the test module doesn't need an
    // extra dev-dependency: writes to a unique path under std::env::temp_dir.
    struct TempTsv {
        path: PathBuf,
    }

    impl TempTsv {
        fn new(contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "bcdecode-test-{}-{:x}.tsv",
                std::process::id(),
                contents.len() as u64 * 2654435761
            ));
            std::fs::write(&path, contents).unwrap();
            Self { path }
        }
    }

    impl Drop for TempTsv {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn write_table(contents: &str) -> TempTsv {
        TempTsv::new(contents)
    }

    #[test]
    fn loads_single_index_table_with_sentinel() {
        let t = write_table("seq\tname\tlib\tsample\tdesc\nAAAA\ts1\tlib1\tsamp1\td1\nCCCC\ts2\tlib2\tsamp2\td2\n");
        let table = BarcodeTable::load(&t.path, 0).unwrap();
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.get(SENTINEL).name, "0");
        assert_eq!(table.get(SENTINEL).idx1, "NNNN");
        assert_eq!(table.exact_lookup("AAAA"), Some(1));
        assert_eq!(table.exact_lookup("NNNN"), Some(0));
        assert!(!table.is_dual_indexed());
    }

    #[test]
    fn loads_dual_index_table() {
        let t = write_table(
            "seq\tname\tlib\tsample\tdesc\nAAAA-GGGG\ts1\tlib1\tsamp1\td1\nCCCC-TTTT\ts2\tlib2\tsamp2\td2\n",
        );
        let table = BarcodeTable::load(&t.path, 0).unwrap();
        assert!(table.is_dual_indexed());
        assert_eq!(table.get(1).idx1, "AAAA");
        assert_eq!(table.get(1).idx2, "GGGG");
        assert_eq!(table.get(SENTINEL).idx2, "NNNN");
    }

    #[test]
    fn dual_tag_seq_is_normalized_to_sep_joined_form() {
        // In dual-tag mode the file's own `seq` column carries no
        // separator ("AAAACGGGG" split at offset 5 into "AAAA"/"GGGG"),
        // but the stored entry and the sentinel must still agree with
        // candidates built by `join_index`, which always inserts SEP.
        let t = write_table(
            "seq\tname\tlib\tsample\tdesc\nAAAACGGGG\ts1\tlib1\tsamp1\td1\nCCCCCTTTT\ts2\tlib2\tsamp2\td2\n",
        );
        let table = BarcodeTable::load(&t.path, 5).unwrap();
        assert_eq!(table.get(1).seq, "AAAA-GGGG");
        assert_eq!(table.get(SENTINEL).seq, "NNNN-NNNN");
        assert_eq!(table.exact_lookup("AAAA-GGGG"), Some(1));
        assert_eq!(table.seq_len(), 8);
    }

    #[test]
    fn shape_mismatch_requires_both_halves_to_differ() {
        // idx1 differs (4 vs 5) but idx2 length matches (0 vs 0): passes,
        // per the preserved laxness.
        let t = write_table("seq\tname\tlib\tsample\tdesc\nAAAA\ts1\tl\ts\td\nAAAAA\ts2\tl\ts\td\n");
        assert!(BarcodeTable::load(&t.path, 0).is_ok());
    }

    #[test]
    fn shape_mismatch_rejects_when_both_halves_differ() {
        let t = write_table(
            "seq\tname\tlib\tsample\tdesc\nAAAA-GG\ts1\tl\ts\td\nAAAAA-GGGGG\ts2\tl\ts\td\n",
        );
        let err = BarcodeTable::load(&t.path, 0).unwrap_err();
        assert!(matches!(err, DecodeError::BarcodeShapeMismatch { .. }));
    }
}
