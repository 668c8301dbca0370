//! Codec for the original (pre-assembly) alignment of a read, carried in the read name of its
//! contig re-alignment
//!
//! The SAM text of the original alignment is stored as the read name, with every tab replaced by
//! `FIELD_DELIMITER`. Decoding happens once at the input boundary, after which only the structured
//! record is used.
//!

use rust_htslib::bam::{self, HeaderView};
use simple_error::{SimpleResult, bail};

use crate::alignment_record::AlignmentRecord;

/// Reserved substitute for the SAM field separator within an encoded read name
pub const FIELD_DELIMITER: &str = "~|";

/// Encode the original alignment as a read name
///
/// Contig re-alignments arrive with the read name already encoded by the assembler.
///
#[cfg(test)]
pub fn encode_original_alignment(record: &AlignmentRecord) -> String {
    record.to_sam_string().replace('\t', FIELD_DELIMITER)
}

/// Restore the SAM text of the original alignment from an encoded read name
pub fn get_original_sam_line(read_name: &str) -> String {
    read_name.replace(FIELD_DELIMITER, "\t")
}

/// Parse the original alignment from an encoded read name
///
/// `header` is used to resolve the reference name of the original alignment.
///
pub fn decode_original_alignment(
    read_name: &str,
    header: &HeaderView,
) -> SimpleResult<AlignmentRecord> {
    let sam_line = get_original_sam_line(read_name);
    let record = match bam::Record::from_sam(header, sam_line.as_bytes()) {
        Ok(x) => x,
        Err(e) => bail!("Can't parse original alignment from read name: {e}"),
    };
    AlignmentRecord::from_bam_record(&record, header)
}
