use std::path::PathBuf;

use clap::Parser;
use log::debug;

use crate::error::{DecodeError, Result};

pub const DEFAULT_MAX_LOW_QUALITY_TO_CONVERT: i32 = 15;
pub const DEFAULT_MAX_NO_CALLS: usize = 2;
pub const DEFAULT_MAX_MISMATCHES: usize = 1;
pub const DEFAULT_MIN_MISMATCH_DELTA: usize = 1;
pub const DEFAULT_BARCODE_TAG: &str = "BC";
pub const DEFAULT_QUALITY_TAG: &str = "QT";

/// Command-line surface for the index-decoding core.
///
/// Flags mirror the configuration options of the decoder one-to-one; see
/// [`Config`] for the validated, run-ready form.
#[derive(Parser, Debug)]
#[command(author, version, about = "Decode sample indexes and rewrite read groups", long_about = None)]
pub struct Cli {
    /// Input alignment file (BAM/SAM/CRAM)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output alignment file, defaults to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tab-separated file of expected barcodes
    #[arg(short, long = "barcode-file")]
    pub barcode_file: PathBuf,

    /// Where to write the per-barcode metrics table
    #[arg(long = "metrics-file")]
    pub metrics_file: Option<PathBuf>,

    /// Phred ceiling below which a barcode base is masked to 'N'
    #[arg(long = "max-low-quality-to-convert", default_value_t = DEFAULT_MAX_LOW_QUALITY_TO_CONVERT)]
    pub max_low_quality_to_convert: i32,

    /// Enable quality-based masking of barcode bases
    #[arg(long = "convert-low-quality", default_value_t = false)]
    pub convert_low_quality: bool,

    /// Barcodes with more no-calls than this are never matched
    #[arg(long = "max-no-calls", default_value_t = DEFAULT_MAX_NO_CALLS)]
    pub max_no_calls: usize,

    /// Ceiling on the best Hamming distance accepted as a match
    #[arg(long = "max-mismatches", default_value_t = DEFAULT_MAX_MISMATCHES)]
    pub max_mismatches: usize,

    /// Required margin between the best and second-best Hamming distance
    #[arg(long = "min-mismatch-delta", default_value_t = DEFAULT_MIN_MISMATCH_DELTA)]
    pub min_mismatch_delta: usize,

    /// Append '#<barcode-name>' to each record's read name
    #[arg(long = "change-read-name", default_value_t = false)]
    pub change_read_name: bool,

    /// Two-character aux tag holding the barcode sequence
    #[arg(long = "barcode-tag-name", default_value = DEFAULT_BARCODE_TAG)]
    pub barcode_tag_name: String,

    /// Two-character aux tag holding the barcode base qualities
    #[arg(long = "quality-tag-name", default_value = DEFAULT_QUALITY_TAG)]
    pub quality_tag_name: String,

    /// Omit PF-related columns from the metrics report
    #[arg(long = "ignore-pf", default_value_t = false)]
    pub ignore_pf: bool,

    /// Split the barcode at this 1-based offset instead of on '-'
    #[arg(long = "dual-tag", default_value_t = 0)]
    pub dual_tag: usize,

    /// Output compression level, format-dependent
    #[arg(long = "compression-level")]
    pub compression_level: Option<u8>,

    /// Verbose (debug-level) logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Validated configuration the rest of the crate runs from.
///
/// Built from [`Cli`] via [`Config::from_cli`]; every field here has
/// already passed the checks `ConfigInvalid` exists to report, so
/// downstream code never needs to re-validate them.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub barcode_file: PathBuf,
    pub metrics_file: Option<PathBuf>,
    pub max_low_quality_to_convert: i32,
    pub convert_low_quality: bool,
    pub max_no_calls: usize,
    pub max_mismatches: usize,
    pub min_mismatch_delta: usize,
    pub change_read_name: bool,
    pub barcode_tag_name: [u8; 2],
    pub quality_tag_name: [u8; 2],
    pub ignore_pf: bool,
    pub dual_tag: usize,
    pub compression_level: Option<u8>,
    pub invocation: String,
}

impl Config {
    /// Validate a parsed [`Cli`] and fold in the `dual_tag` coupling (§9:
    /// a non-zero `dual_tag` forces `max_no_calls = 0`, preserved here as
    /// an explicit, logged rule rather than a hidden parser side effect).
    pub fn from_cli(cli: Cli) -> Result<Config> {
        if !cli.input.exists() {
            return Err(DecodeError::ConfigInvalid(format!(
                "input file {} does not exist",
                cli.input.display()
            )));
        }
        if !cli.barcode_file.exists() {
            return Err(DecodeError::ConfigInvalid(format!(
                "barcode file {} does not exist",
                cli.barcode_file.display()
            )));
        }
        let barcode_tag_name = tag_bytes(&cli.barcode_tag_name, "barcode-tag-name")?;
        let quality_tag_name = tag_bytes(&cli.quality_tag_name, "quality-tag-name")?;

        let mut max_no_calls = cli.max_no_calls;
        if cli.dual_tag > 0 {
            debug!(
                "dual-tag={} given: forcing max-no-calls from {} to 0",
                cli.dual_tag, max_no_calls
            );
            max_no_calls = 0;
        }

        let invocation = std::env::args().collect::<Vec<_>>().join(" ");

        Ok(Config {
            input: cli.input,
            output: cli.output,
            barcode_file: cli.barcode_file,
            metrics_file: cli.metrics_file,
            max_low_quality_to_convert: cli.max_low_quality_to_convert,
            convert_low_quality: cli.convert_low_quality,
            max_no_calls,
            max_mismatches: cli.max_mismatches,
            min_mismatch_delta: cli.min_mismatch_delta,
            change_read_name: cli.change_read_name,
            barcode_tag_name,
            quality_tag_name,
            ignore_pf: cli.ignore_pf,
            dual_tag: cli.dual_tag,
            compression_level: cli.compression_level,
            invocation,
        })
    }

    /// Validate `dual_tag` against the barcode table's concatenated-sequence
    /// length. Deferred until the table is loaded, since `seq_len` isn't
    /// known at CLI-parse time.
    pub fn validate_dual_tag(&self, seq_len: usize) -> Result<()> {
        if self.dual_tag == 0 {
            return Ok(());
        }
        if self.dual_tag < 2 || self.dual_tag > seq_len.saturating_sub(1) {
            return Err(DecodeError::ConfigInvalid(format!(
                "dual-tag={} is out of range [2, {}] for barcodes of length {}",
                self.dual_tag,
                seq_len.saturating_sub(1),
                seq_len
            )));
        }
        Ok(())
    }
}

fn tag_bytes(s: &str, flag: &str) -> Result<[u8; 2]> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(DecodeError::ConfigInvalid(format!(
            "--{flag} must be exactly two characters, got '{s}'"
        )));
    }
    Ok([bytes[0], bytes[1]])
}
