use camino::Utf8PathBuf;
use clap::Args;
use const_format::concatcp;
use simple_error::{SimpleResult, bail};

use super::utils::check_required_filename;
use crate::combine_chimera::DEFAULT_MAX_INDEL_SIZE;

#[derive(Args)]
pub struct CombineSettings {
    /// Directory for all combine command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_combine_output"))]
    pub output_dir: Utf8PathBuf,

    /// Locally re-aligned reads in SAM, BAM or CRAM format
    ///
    /// All partial alignments of one read must be adjacent in the file, as in name-sorted or
    /// collated input.
    ///
    #[arg(long = "bam", value_name = "FILE")]
    pub bam_filename: String,

    /// Minimum length of the aligned match required on each side of a merged indel
    ///
    /// This setting is required.
    ///
    #[arg(long, value_name = "SIZE")]
    pub min_indel_buffer: Option<usize>,

    /// Largest indel that can be produced by merging partial alignments
    ///
    /// Alignments implying a larger indel are treated as distinct alignments and left unmerged.
    ///
    #[arg(long, value_name = "SIZE", default_value_t = DEFAULT_MAX_INDEL_SIZE)]
    pub max_indel_size: usize,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_combine_settings(settings: CombineSettings) -> SimpleResult<CombineSettings> {
    check_required_filename(&settings.bam_filename, "alignment")?;

    if settings.min_indel_buffer.is_none() {
        bail!("--min-indel-buffer must be specified for the combine command");
    }

    if settings.max_indel_size == 0 {
        bail!("--max-indel-size argument must be greater than 0");
    }

    Ok(settings)
}
