use camino::Utf8PathBuf;
use clap::Args;
use const_format::concatcp;
use simple_error::{SimpleResult, bail};

use super::utils::check_required_filename;

#[derive(Args)]
pub struct CountSupportSettings {
    /// Directory for all count-support command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_count_support_output"))]
    pub output_dir: Utf8PathBuf,

    /// Read alignments to breakpoint contigs in SAM, BAM or CRAM format
    ///
    /// Each read name must encode the original alignment of the read, and the header must include
    /// the reference sequences of these original alignments.
    ///
    /// If the file is indexed, reads aligned to each contig are counted in parallel.
    ///
    #[arg(long = "bam", value_name = "FILE")]
    pub bam_filename: String,

    /// Nominal read length. Only reads aligned over this full length to a contig are counted.
    #[arg(long, value_name = "LENGTH")]
    pub read_length: usize,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_count_support_settings(
    settings: CountSupportSettings,
) -> SimpleResult<CountSupportSettings> {
    check_required_filename(&settings.bam_filename, "contig alignment")?;

    if settings.read_length == 0 {
        bail!("--read-length argument must be greater than 0");
    }

    Ok(settings)
}
