//! C5: per-entry match counters.
//!
//! Kept as a single struct with one mutator so counters are never updated
//! through an aliased reference to the owning [`crate::barcode_table::BarcodeEntry`]
//! (spec.md §9, "Counters on shared entities").

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub reads: u64,
    pub pf_reads: u64,
    pub perfect: u64,
    pub pf_perfect: u64,
    pub one_mismatch: u64,
    pub pf_one_mismatch: u64,
}

impl Counters {
    /// Record one template's worth of observations against this entry.
    ///
    /// `mismatch_count` is the Hamming distance (ignoring no-calls) between
    /// the entry's own `seq` and the observed barcode, or `None` if no
    /// barcode was available (counted the same as `decode.c`'s `n = 99`
    /// sentinel, i.e. neither perfect nor one-mismatch).
    pub fn record(&mut self, mismatch_count: Option<usize>, is_pf: bool) {
        self.reads += 1;
        if is_pf {
            self.pf_reads += 1;
        }
        match mismatch_count {
            Some(0) => {
                self.perfect += 1;
                if is_pf {
                    self.pf_perfect += 1;
                }
            }
            Some(1) => {
                self.one_mismatch += 1;
                if is_pf {
                    self.pf_one_mismatch += 1;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_and_pf_counters() {
        let mut c = Counters::default();
        c.record(Some(0), true);
        c.record(Some(0), false);
        c.record(Some(1), true);
        c.record(Some(2), true);
        assert_eq!(c.reads, 4);
        assert_eq!(c.pf_reads, 3);
        assert_eq!(c.perfect, 2);
        assert_eq!(c.pf_perfect, 1);
        assert_eq!(c.one_mismatch, 1);
        assert_eq!(c.pf_one_mismatch, 1);
    }

    #[test]
    fn counters_never_exceed_reads() {
        let mut c = Counters::default();
        for i in 0..10u64 {
            c.record(Some((i % 3) as usize), i % 2 == 0);
        }
        assert!(c.perfect <= c.reads);
        assert!(c.one_mismatch <= c.reads);
        assert!(c.pf_perfect <= c.perfect);
        assert!(c.pf_one_mismatch <= c.one_mismatch);
    }
}
