//! C8: writes the per-barcode metrics table, and (for dual-indexed runs)
//! the sibling `.hops` tag-hop metrics file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::barcode_table::{sibling_path, BarcodeEntry, BarcodeTable, SENTINEL};
use crate::config::Config;
use crate::error::{DecodeError, Result};
use crate::hop::HopTable;
use crate::seq::join_index;

/// Write the main metrics file, and — when the table is dual-indexed —
/// the `<metrics>.hops` sibling.
pub fn write_reports(metrics_path: &Path, table: &BarcodeTable, hops: &HopTable, config: &Config) -> Result<()> {
    write_main_metrics(metrics_path, table, config)?;
    if table.is_dual_indexed() {
        write_hop_metrics(&sibling_path(metrics_path, ".hops"), table, hops, config)?;
    }
    Ok(())
}

struct Totals {
    total_reads: u64,
    total_pf_reads: u64,
    total_pf_reads_assigned: u64,
    max_reads: u64,
    max_pf_reads: u64,
    n_reads: u64,
}

/// Totals over `table`: `total_reads`/`total_pf_reads` include the
/// sentinel, everything else excludes it, matching `writeMetrics` in the
/// original implementation.
fn table_totals(table: &BarcodeTable) -> Totals {
    let sentinel = table.get(SENTINEL).counters;
    let mut totals = Totals {
        total_reads: sentinel.reads,
        total_pf_reads: sentinel.pf_reads,
        total_pf_reads_assigned: 0,
        max_reads: 0,
        max_pf_reads: 0,
        n_reads: 0,
    };
    for (_, entry) in table.real_entries() {
        totals.total_reads += entry.counters.reads;
        totals.total_pf_reads += entry.counters.pf_reads;
        totals.total_pf_reads_assigned += entry.counters.pf_reads;
        totals.max_reads = totals.max_reads.max(entry.counters.reads);
        totals.max_pf_reads = totals.max_pf_reads.max(entry.counters.pf_reads);
        totals.n_reads += 1;
    }
    totals
}

fn open_metrics_file(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| DecodeError::MetricsIoError {
            path: path.to_path_buf(),
            source,
        })
}

fn io_to_metrics_err(path: &Path) -> impl Fn(std::io::Error) -> DecodeError + '_ {
    move |source| DecodeError::MetricsIoError {
        path: path.to_path_buf(),
        source,
    }
}

/// Shared config/tool-invocation preamble and column header, written
/// identically (bar the `metrics`-only columns) to both the main metrics
/// file and the `.hops` sibling.
fn write_preamble(f: &mut impl Write, path: &Path, config: &Config, metrics: bool) -> Result<()> {
    let err = io_to_metrics_err(path);
    writeln!(f, "##").map_err(&err)?;
    writeln!(
        f,
        "# BARCODE_TAG_NAME={} MAX_MISMATCHES={} MIN_MISMATCH_DELTA={} MAX_NO_CALLS={}",
        String::from_utf8_lossy(&config.barcode_tag_name),
        config.max_mismatches,
        config.min_mismatch_delta,
        config.max_no_calls,
    )
    .map_err(&err)?;
    writeln!(f, "##").map_err(&err)?;
    writeln!(
        f,
        "# ID:{} VN:{} CL:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.invocation,
    )
    .map_err(&err)?;
    writeln!(f).map_err(&err)?;
    writeln!(f, "##").map_err(&err)?;

    write!(f, "BARCODE\t").map_err(&err)?;
    if metrics {
        write!(f, "BARCODE_NAME\tLIBRARY_NAME\tSAMPLE_NAME\tDESCRIPTION\t").map_err(&err)?;
    }
    write!(f, "READS\t").map_err(&err)?;
    if !config.ignore_pf {
        write!(f, "PF_READS\t").map_err(&err)?;
    }
    write!(f, "PERFECT_MATCHES\t").map_err(&err)?;
    if !config.ignore_pf {
        write!(f, "PF_PERFECT_MATCHES\t").map_err(&err)?;
    }
    if metrics {
        write!(f, "ONE_MISMATCH_MATCHES\t").map_err(&err)?;
        if !config.ignore_pf {
            write!(f, "PF_ONE_MISMATCH_MATCHES\t").map_err(&err)?;
        }
    }
    write!(f, "PCT_MATCHES\tRATIO_THIS_BARCODE_TO_BEST_BARCODE_PCT").map_err(&err)?;
    if !config.ignore_pf {
        write!(f, "\tPF_PCT_MATCHES\tPF_RATIO_THIS_BARCODE_TO_BEST_BARCODE_PCT\tPF_NORMALIZED_MATCHES")
            .map_err(&err)?;
    }
    writeln!(f).map_err(&err)?;
    Ok(())
}

/// One row of either table. `total_pf_reads_assigned` is passed as `0`
/// for the sentinel row in the main table, matching the original's
/// special-cased call (the sentinel's `PF_NORMALIZED_MATCHES` is always
/// printed as `0.000`).
fn write_row(
    f: &mut impl Write,
    path: &Path,
    entry: &BarcodeEntry,
    config: &Config,
    totals: &Totals,
    total_pf_reads_assigned: u64,
    metrics: bool,
) -> Result<()> {
    let err = io_to_metrics_err(path);
    let c = &entry.counters;

    write!(f, "{}\t", join_index(&entry.idx1, &entry.idx2)).map_err(&err)?;
    if metrics {
        write!(f, "{}\t{}\t{}\t{}\t", entry.name, entry.library, entry.sample, entry.description).map_err(&err)?;
    }
    write!(f, "{}\t", c.reads).map_err(&err)?;
    if !config.ignore_pf {
        write!(f, "{}\t", c.pf_reads).map_err(&err)?;
    }
    write!(f, "{}\t", c.perfect).map_err(&err)?;
    if !config.ignore_pf {
        write!(f, "{}\t", c.pf_perfect).map_err(&err)?;
    }
    if metrics {
        write!(f, "{}\t", c.one_mismatch).map_err(&err)?;
        if !config.ignore_pf {
            write!(f, "{}\t", c.pf_one_mismatch).map_err(&err)?;
        }
    }

    let pct_matches = ratio(c.reads, totals.total_reads);
    let ratio_to_best = ratio(c.reads, totals.max_reads);
    write!(f, "{pct_matches:.3}\t{ratio_to_best:.3}").map_err(&err)?;
    if !config.ignore_pf {
        let pf_pct = ratio(c.pf_reads, totals.total_pf_reads);
        let pf_ratio_to_best = ratio(c.pf_reads, totals.max_pf_reads);
        let pf_normalized = if total_pf_reads_assigned == 0 {
            0.0
        } else {
            (c.pf_reads * totals.n_reads) as f64 / total_pf_reads_assigned as f64
        };
        write!(f, "\t{pf_pct:.3}\t{pf_ratio_to_best:.3}\t{pf_normalized:.3}").map_err(&err)?;
    }
    writeln!(f).map_err(&err)?;
    Ok(())
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn write_main_metrics(path: &Path, table: &BarcodeTable, config: &Config) -> Result<()> {
    let mut f = open_metrics_file(path)?;
    let totals = table_totals(table);

    write_preamble(&mut f, path, config, true)?;

    for (_, entry) in table.real_entries() {
        write_row(&mut f, path, entry, config, &totals, totals.total_pf_reads_assigned, true)?;
    }

    // Tag 0 is printed with its name/perfect counters zeroed (§4.8,
    // SPEC_FULL.md §F.4): the underlying entry is untouched, only the row.
    let sentinel = table.get(SENTINEL);
    let mut printed = sentinel.clone();
    printed.name.clear();
    printed.counters.perfect = 0;
    printed.counters.pf_perfect = 0;
    write_row(&mut f, path, &printed, config, &totals, 0, true)?;

    Ok(())
}

fn write_hop_metrics(path: &Path, table: &BarcodeTable, hops: &HopTable, config: &Config) -> Result<()> {
    let mut f = open_metrics_file(path)?;
    let err = io_to_metrics_err(path);
    let totals = table_totals(table);

    let mut sorted: Vec<&BarcodeEntry> = hops.entries().iter().collect();
    // Most reads first, ties broken by most perfect matches (sortTagHops).
    sorted.sort_by(|a, b| {
        b.counters
            .reads
            .cmp(&a.counters.reads)
            .then(b.counters.perfect.cmp(&a.counters.perfect))
    });

    let total_hop_reads: u64 = sorted.iter().map(|e| e.counters.reads).sum();
    let pct_hops = if totals.total_reads == 0 {
        0.0
    } else {
        total_hop_reads as f64 / totals.total_reads as f64 * 100.0
    };

    writeln!(f, "##").map_err(&err)?;
    writeln!(
        f,
        "# TOTAL_READS={}, TOTAL_ORIGINAL_TAG_READS={}, TOTAL_TAG_HOP_READS={}, MAX_READ_ON_A_TAG={}, TOTAL_TAG_HOPS={}, PCT_TAG_HOPS={:.6}",
        totals.total_reads,
        totals.total_reads - table.get(SENTINEL).counters.reads,
        total_hop_reads,
        totals.max_reads,
        sorted.len(),
        pct_hops,
    )
    .map_err(&err)?;

    write_preamble(&mut f, path, config, false)?;

    for entry in sorted {
        write_row(&mut f, path, entry, config, &totals, totals.total_pf_reads_assigned, false)?;
    }

    Ok(())
}
