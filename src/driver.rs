//! C7: groups records into templates and drives each one through masking,
//! matching, hop detection and metrics accounting, writing the rewritten
//! record stream as it goes.

use log::info;

use crate::barcode_table::{BarcodeTable, SENTINEL};
use crate::config::Config;
use crate::error::{DecodeError, Result};
use crate::hop::{detect_hop, HopTable};
use crate::header;
use crate::masker::mask_low_quality;
use crate::match_engine::{Match, MatchEngine};
use crate::record_io::{self, AlignedRecord};
use crate::report;
use crate::seq::{count_no_calls, join_index, split_index};

const RG_TAG: [u8; 2] = *b"RG";

/// Summary counts logged once the stream is fully drained (spec.md §5:
/// metrics are only reported after the stream has drained completely).
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub templates: u64,
    pub templates_with_barcode: u64,
    pub hops_detected: u64,
}

/// Runs the whole decode: load the barcode table, rewrite the header,
/// stream every template through the match engine, and (if configured)
/// write the metrics report(s).
pub fn run(config: &Config) -> Result<RunSummary> {
    let mut table = BarcodeTable::load(&config.barcode_file, config.dual_tag)?;
    config.validate_dual_tag(table.seq_len())?;
    let mut hops = HopTable::new();
    let engine = MatchEngine {
        max_no_calls: config.max_no_calls,
        max_mismatches: config.max_mismatches,
        min_mismatch_delta: config.min_mismatch_delta,
    };

    let (mut reader, mut out_header) = record_io::open_input(&config.input)?;

    header::rewrite_header(
        &mut out_header,
        &table,
        "bcdecode",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.invocation,
    );

    let mut writer = record_io::open_output(config.output.as_deref(), config.compression_level)?;
    record_io::write_header(&mut writer, &out_header)?;

    let mut summary = RunSummary::default();
    let mut pending = record_io::read_record(&mut reader, &out_header)?;

    while let Some(first) = pending.take() {
        let name = first.read_name();
        let mut template = vec![first];
        loop {
            match record_io::read_record(&mut reader, &out_header)? {
                Some(rec) if rec.read_name() == name => template.push(rec),
                next => {
                    pending = next;
                    break;
                }
            }
        }

        summary.templates += 1;
        process_template(&mut template, &mut table, &mut hops, &engine, config, &mut summary)?;

        for rec in &template {
            record_io::write_record(&mut writer, &out_header, rec)?;
        }
    }

    info!(
        "processed {} templates ({} carrying a barcode tag, {} tag hops detected)",
        summary.templates, summary.templates_with_barcode, summary.hops_detected
    );

    if let Some(metrics_path) = &config.metrics_file {
        report::write_reports(metrics_path, &table, &hops, config)?;
    }

    Ok(summary)
}

/// Process one template in place (C7 §4.7): extract and mask the barcode,
/// match it, rewrite every record's `RG` tag (and read name, if
/// configured). A template with no barcode tag is left untouched.
fn process_template(
    template: &mut [impl AlignedRecord],
    table: &mut BarcodeTable,
    hops: &mut HopTable,
    engine: &MatchEngine,
    config: &Config,
    summary: &mut RunSummary,
) -> Result<()> {
    let read_name = template[0].read_name().unwrap_or_default();

    let mut barcode: Option<String> = None;
    let mut quality: Option<String> = None;
    for rec in template.iter() {
        let Some(bc) = rec.get_string_tag(config.barcode_tag_name) else {
            continue;
        };
        match &barcode {
            Some(existing) if *existing != bc => {
                return Err(DecodeError::InconsistentTemplateBarcode {
                    read_name,
                    first: existing.clone(),
                    second: bc,
                });
            }
            Some(_) => {}
            None => {
                quality = rec.get_string_tag(config.quality_tag_name);
                barcode = Some(bc);
            }
        }
    }

    let Some(raw_barcode) = barcode else {
        return Ok(());
    };
    summary.templates_with_barcode += 1;

    let masked = if config.convert_low_quality {
        mask_low_quality(&raw_barcode, quality.as_deref(), config.max_low_quality_to_convert)?
    } else {
        raw_barcode
    };

    let (mut idx1, mut idx2) = split_index(&masked, config.dual_tag);
    idx1.truncate(table.idx1_len);
    idx2.truncate(table.idx2_len);
    let candidate = join_index(&idx1, &idx2);

    let is_pf = !template[0].is_qc_fail();

    let m = engine.best_match(table, &candidate);
    table.record_match(m.index(), &candidate, is_pf);

    // Only a scanned miss is eligible for hop detection, not a no-call-gate
    // reject: `decode.c`'s `findBarcodeName` calls `check_tag_hopping` only
    // in the branch where the barcode cleared the no-call gate (matches
    // spec.md §4.4, "invoked only when... the match engine returned E0"
    // via a real scan, not the gate).
    if m == Match::Unassigned
        && table.is_dual_indexed()
        && count_no_calls(&candidate) <= config.max_no_calls
    {
        if let Some(hop_idx) = detect_hop(table, hops, &candidate, config.dual_tag) {
            hops.record_match(hop_idx, &candidate, is_pf);
            summary.hops_detected += 1;
        }
    }

    let name = table.get(m.index()).name.clone();

    for rec in template.iter_mut() {
        let existing_rg = rec.get_string_tag(RG_TAG).unwrap_or_default();
        rec.set_string_tag(RG_TAG, &format!("{existing_rg}#{name}"));
        if config.change_read_name {
            if let Some(n) = rec.read_name() {
                rec.set_read_name(format!("{n}#{name}"));
            }
        }
    }

    Ok(())
}
