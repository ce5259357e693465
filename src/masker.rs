//! C2: replace low-quality barcode bases with the ambiguous symbol `N`.

use crate::error::{DecodeError, Result};
use crate::seq::PHRED_OFFSET;

/// Mask bases of `barcode` whose quality is at or below
/// `max_low_quality_to_convert` to `'N'`.
///
/// `quality` is the aux quality string for the same barcode, one ASCII
/// Phred+33 character per base. When absent, `barcode` is returned
/// unchanged. Only ASCII letters are masked (matches `isalpha` in the
/// original implementation) — a pre-existing `'N'`/`'.'` is left alone.
pub fn mask_low_quality(
    barcode: &str,
    quality: Option<&str>,
    max_low_quality_to_convert: i32,
) -> Result<String> {
    let Some(quality) = quality else {
        return Ok(barcode.to_string());
    };
    if quality.len() != barcode.len() {
        return Err(DecodeError::BarcodeQualityLengthMismatch {
            barcode_len: barcode.len(),
            quality_len: quality.len(),
        });
    }

    let mut out = String::with_capacity(barcode.len());
    for (b, q) in barcode.bytes().zip(quality.bytes()) {
        let phred = i32::from(q) - i32::from(PHRED_OFFSET);
        if b.is_ascii_alphabetic() && phred <= max_low_quality_to_convert {
            out.push('N');
        } else {
            out.push(b as char);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_quality_passes_through() {
        assert_eq!(mask_low_quality("AACC", None, 15).unwrap(), "AACC");
    }

    #[test]
    fn masks_bases_at_or_below_ceiling() {
        // '0' - 33 = -18 (way below), '?' - 33 = 30 (above ceiling)
        let q = "0?0?";
        assert_eq!(mask_low_quality("AACC", Some(q), 15).unwrap(), "NANC");
    }

    #[test]
    fn zero_ceiling_is_propagated_verbatim() {
        // A zero max_low_quality_to_convert genuinely masks nothing above
        // quality 0; the historical "0 means default 15" quirk is not
        // reproduced here (see SPEC_FULL.md decision D3).
        let q = "!!!!"; // phred 0
        assert_eq!(mask_low_quality("AACC", Some(q), 0).unwrap(), "NNNN");
        let q2 = "\"\"\"\""; // phred 1
        assert_eq!(mask_low_quality("AACC", Some(q2), 0).unwrap(), "AACC");
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = mask_low_quality("AACC", Some("!!"), 15).unwrap_err();
        assert!(matches!(err, DecodeError::BarcodeQualityLengthMismatch { .. }));
    }
}
