//! C3: match a candidate barcode against the expected-barcode table.

use crate::barcode_table::{BarcodeTable, SENTINEL};
use crate::seq::{count_no_calls, mismatches};

/// Outcome of matching one candidate barcode against the table. A tagged
/// variant rather than always returning the sentinel index keeps call
/// sites honest about whether a real match was found (spec.md §9
/// recommends this over aliasing index 0 implicitly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    Assigned(usize),
    Unassigned,
}

impl Match {
    pub fn index(&self) -> usize {
        match self {
            Match::Assigned(i) => *i,
            Match::Unassigned => SENTINEL,
        }
    }
}

pub struct MatchEngine {
    pub max_no_calls: usize,
    pub max_mismatches: usize,
    pub min_mismatch_delta: usize,
}

impl MatchEngine {
    /// Find the best matching table entry for `candidate`, or
    /// [`Match::Unassigned`] if none clears the no-call gate, the mismatch
    /// ceiling, or the delta requirement.
    pub fn best_match(&self, table: &BarcodeTable, candidate: &str) -> Match {
        if count_no_calls(candidate) > self.max_no_calls {
            return Match::Unassigned;
        }

        // Exact fast path: valid whenever a zero-mismatch hit is
        // guaranteed to satisfy the delta requirement, i.e. delta <= 1.
        if self.min_mismatch_delta <= 1 {
            if let Some(i) = table.exact_lookup(candidate) {
                return Match::Assigned(i);
            }
        }

        let mut best: Option<usize> = None;
        let mut best_nm = usize::MAX;
        let mut second_best_nm = usize::MAX;

        for (i, entry) in table.real_entries() {
            let nm = mismatches(&entry.seq, candidate, second_best_nm);
            if nm < best_nm {
                second_best_nm = best_nm;
                best_nm = nm;
                best = Some(i);
            } else if nm < second_best_nm {
                second_best_nm = nm;
            }
        }

        match best {
            Some(i)
                if best_nm <= self.max_mismatches
                    && second_best_nm.saturating_sub(best_nm) >= self.min_mismatch_delta =>
            {
                Match::Assigned(i)
            }
            _ => Match::Unassigned,
        }
    }
}
