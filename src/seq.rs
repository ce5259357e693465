//! Small sequence utilities shared by the barcode table, the match engine,
//! the tag-hop detector, and the metrics accounting: splitting a
//! concatenated dual index, counting no-calls, and Hamming distance with
//! the no-call exemption the match engine relies on.

/// Literal separator between `idx1` and `idx2` in a concatenated barcode.
pub const SEP: char = '-';

/// Phred+33 offset used to recover a numeric quality score from an ASCII
/// quality character.
pub const PHRED_OFFSET: u8 = 33;

/// True for the no-call alphabet used by the no-call gate (C3 step 1).
/// Mismatch counting (see [`mismatches`]) only exempts literal `'N'`,
/// matching the historical asymmetry in the original implementation.
pub fn is_no_call(b: u8) -> bool {
    matches!(b, b'N' | b'n' | b'.')
}

pub fn count_no_calls(s: &str) -> usize {
    s.bytes().filter(|&b| is_no_call(b)).count()
}

/// Split a concatenated barcode into `(idx1, idx2)`.
///
/// When `dual_tag > 0`, splits at the given 1-based offset: `idx1` is
/// everything before position `dual_tag`, `idx2` is everything from
/// position `dual_tag` onward (the character at 0-based index
/// `dual_tag - 1` is not part of either half — this mirrors the original
/// C implementation's pointer arithmetic exactly). Otherwise splits on
/// [`SEP`]; a barcode with no separator is treated as single-indexed.
pub fn split_index(seq: &str, dual_tag: usize) -> (String, String) {
    if dual_tag > 0 {
        let bytes = seq.as_bytes();
        let idx1_end = (dual_tag - 1).min(bytes.len());
        let idx2_start = dual_tag.min(bytes.len());
        let idx1 = String::from_utf8_lossy(&bytes[..idx1_end]).into_owned();
        let idx2 = String::from_utf8_lossy(&bytes[idx2_start..]).into_owned();
        (idx1, idx2)
    } else {
        match seq.split_once(SEP) {
            Some((a, b)) => (a.to_string(), b.to_string()),
            None => (seq.to_string(), String::new()),
        }
    }
}

/// Join `idx1`/`idx2` back into a concatenated sequence, omitting the
/// separator when there is no second index.
pub fn join_index(idx1: &str, idx2: &str) -> String {
    if idx2.is_empty() {
        idx1.to_string()
    } else {
        format!("{idx1}{SEP}{idx2}")
    }
}

/// Hamming distance between `reference` and `candidate`, iterating over
/// `reference`'s length. A literal `'N'` in `candidate` is never counted
/// as a mismatch (no-calls are free); a missing trailing character in
/// `candidate` counts as an `'N'`. Exits early once the running count
/// exceeds `cap`, returning whatever partial count triggered the exit.
pub fn mismatches(reference: &str, candidate: &str, cap: usize) -> usize {
    let cand: Vec<u8> = candidate.bytes().collect();
    let mut n = 0;
    for (i, r) in reference.bytes().enumerate() {
        let c = cand.get(i).copied().unwrap_or(b'N');
        if r != c && c != b'N' {
            n += 1;
            if n > cap {
                return n;
            }
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_separator() {
        assert_eq!(split_index("AAAA-GGGG", 0), ("AAAA".into(), "GGGG".into()));
        assert_eq!(split_index("AAAA", 0), ("AAAA".into(), "".into()));
    }

    #[test]
    fn split_on_dual_tag_offset() {
        // seq = "AAAACGGGG", dual_tag = 5 -> idx1 = seq[0..4] = "AAAA",
        // idx2 = seq[5..] = "GGGG" (the 5th char, 'C', is dropped).
        assert_eq!(split_index("AAAACGGGG", 5), ("AAAA".into(), "GGGG".into()));
    }

    #[test]
    fn no_call_counting_uses_full_alphabet() {
        assert_eq!(count_no_calls("ANNa.C"), 3);
    }

    #[test]
    fn mismatches_ignore_only_uppercase_n_in_candidate() {
        assert_eq!(mismatches("AAAA", "AANA", 99), 1);
        assert_eq!(mismatches("AAAA", "AAnA", 99), 1); // lowercase n is NOT exempt
        assert_eq!(mismatches("AAAA", "AACA", 99), 1);
        assert_eq!(mismatches("AAAA", "AAAA", 99), 0);
    }

    #[test]
    fn mismatches_short_circuits_past_cap() {
        // distance is 4 but cap is 1: function may return as soon as it
        // exceeds cap, never scanning past that point.
        let n = mismatches("AAAA", "TTTT", 1);
        assert!(n > 1);
    }
}
