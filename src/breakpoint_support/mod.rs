//! Count reads supporting each candidate SV breakpoint
//!
//! Reads are re-aligned to contigs assembled across candidate breakpoints, and the contig name
//! encodes the breakpoint coordinates. A read supports a breakpoint when it aligns end-to-end to
//! the contig across the junction, and explains the read strictly better than the read's original
//! alignment.
//!

mod breakpoint_counts;

use std::borrow::Borrow;

use log::{debug, error, warn};
use rust_htslib::bam::HeaderView;
use rust_htslib::bam::record::Cigar;
use simple_error::{SimpleResult, bail};

pub use self::breakpoint_counts::{BreakpointCounts, SupportScanStats};
use crate::alignment_record::{
    AlignmentRecord, EDIT_DISTANCE_AUX_TAG, ORIGINAL_EDIT_DISTANCE_AUX_TAG,
};
use crate::original_alignment::{decode_original_alignment, get_original_sam_line};

/// Highest edit distance of a contig alignment accepted as breakpoint support
pub const MAX_EDIT_DISTANCE: i64 = 5;

/// Minimum number of '_' delimited fields in a contig name which encodes a breakpoint
const MIN_BREAKPOINT_KEY_FIELDS: usize = 6;

/// Build the breakpoint group id from the fields of a contig name
///
/// The id is formatted as "f0_f1\tf2:f3\tf4:f5". Returns None if the name has fewer than six
/// fields.
///
pub fn get_breakpoint_id(reference_name: &str) -> Option<String> {
    let mut fields = reference_name.split('_').collect::<Vec<_>>();
    while fields.last().is_some_and(|x| x.is_empty()) {
        fields.pop();
    }
    if fields.len() < MIN_BREAKPOINT_KEY_FIELDS {
        return None;
    }
    Some(format!(
        "{}_{}\t{}:{}\t{}:{}",
        fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]
    ))
}

#[derive(Debug, Eq, PartialEq)]
enum SupportOutcome {
    Unmapped,
    PartialMatch,
    EdgeOfContig,
    HighEditDistance,
    NoImprovement,
    MalformedBreakpointKey,
    Supporting(String),
}

/// Per-record filters for breakpoint support, fixed for one nominal read length
struct SupportFilter {
    full_match: [Cigar; 1],

    /// Contig start range which keeps 90% of the read overlapping the breakpoint
    min_start: i64,
    max_start: i64,
}

impl SupportFilter {
    fn new(read_length: usize) -> Self {
        let read_length = read_length as i64;
        Self {
            full_match: [Cigar::Match(read_length as u32)],
            min_start: read_length / 10,
            max_start: (read_length * 9) / 10 + 1,
        }
    }

    fn evaluate(
        &self,
        record: &AlignmentRecord,
        header: &HeaderView,
    ) -> SimpleResult<SupportOutcome> {
        if record.is_unmapped() {
            return Ok(SupportOutcome::Unmapped);
        }
        if record.cigar.as_slice() != self.full_match.as_slice() {
            return Ok(SupportOutcome::PartialMatch);
        }
        if record.alignment_start < self.min_start || record.alignment_start > self.max_start {
            return Ok(SupportOutcome::EdgeOfContig);
        }

        let edit_distance = match record.get_int_tag(EDIT_DISTANCE_AUX_TAG) {
            Some(x) if x <= MAX_EDIT_DISTANCE => x,
            Some(_) => return Ok(SupportOutcome::HighEditDistance),
            None => {
                debug!(
                    "Skipping contig alignment without edit distance: {}",
                    record.read_name
                );
                return Ok(SupportOutcome::HighEditDistance);
            }
        };

        let original = match decode_original_alignment(&record.read_name, header) {
            Ok(x) => x,
            Err(e) => {
                error!(
                    "Error processing original alignment: [{}]",
                    get_original_sam_line(&record.read_name)
                );
                error!("Contig read: [{}]", record.to_sam_string());
                return Err(e);
            }
        };
        match original.get_int_tag(ORIGINAL_EDIT_DISTANCE_AUX_TAG) {
            Some(original_edit_distance) if edit_distance < original_edit_distance => {}
            _ => return Ok(SupportOutcome::NoImprovement),
        }

        match get_breakpoint_id(&record.reference_name) {
            Some(breakpoint_id) => Ok(SupportOutcome::Supporting(breakpoint_id)),
            None => {
                warn!(
                    "Error analyzing breakpoint for: {}",
                    record.to_sam_string()
                );
                Ok(SupportOutcome::MalformedBreakpointKey)
            }
        }
    }
}

/// Scan contig alignments and count the reads supporting each breakpoint
///
/// # Arguments
/// * `read_length` - Nominal read length, supporting reads must match the contig over this length
/// * `header` - Header used to parse the original alignment encoded in each read name
///
/// A read name which can't be parsed as an original alignment aborts the scan with an error.
///
pub fn scan_breakpoint_support<I>(
    alignments: I,
    read_length: usize,
    header: &HeaderView,
) -> SimpleResult<(BreakpointCounts, SupportScanStats)>
where
    I: IntoIterator,
    I::Item: Borrow<AlignmentRecord>,
{
    if read_length == 0 {
        bail!("Read length must be greater than 0 to count breakpoint support");
    }

    let filter = SupportFilter::new(read_length);
    let mut counts = BreakpointCounts::new();
    let mut stats = SupportScanStats::default();

    for record in alignments {
        stats.scanned_record_count += 1;
        match filter.evaluate(record.borrow(), header)? {
            SupportOutcome::Unmapped => stats.unmapped_record_count += 1,
            SupportOutcome::PartialMatch => stats.partial_match_record_count += 1,
            SupportOutcome::EdgeOfContig => stats.edge_record_count += 1,
            SupportOutcome::HighEditDistance => stats.high_edit_distance_record_count += 1,
            SupportOutcome::NoImprovement => stats.no_improvement_record_count += 1,
            SupportOutcome::MalformedBreakpointKey => stats.malformed_breakpoint_key_count += 1,
            SupportOutcome::Supporting(breakpoint_id) => {
                stats.supporting_record_count += 1;
                counts.increment(&breakpoint_id);
            }
        }
    }

    Ok((counts, stats))
}

/// Breakpoint support counter which retains the result of its last counting pass
///
#[derive(Default)]
pub struct BreakpointSupportCounter {
    counts: BreakpointCounts,
    stats: SupportScanStats,
}

impl BreakpointSupportCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one counting pass over `alignments`, replacing any previous result
    ///
    /// On error the result of the previous pass is retained.
    ///
    pub fn count_support<I>(
        &mut self,
        alignments: I,
        read_length: usize,
        header: &HeaderView,
    ) -> SimpleResult<&BreakpointCounts>
    where
        I: IntoIterator,
        I::Item: Borrow<AlignmentRecord>,
    {
        let (counts, stats) = scan_breakpoint_support(alignments, read_length, header)?;
        self.counts = counts;
        self.stats = stats;
        Ok(&self.counts)
    }

    /// Breakpoint counts from the last completed counting pass
    pub fn counts(&self) -> &BreakpointCounts {
        &self.counts
    }

    pub fn stats(&self) -> &SupportScanStats {
        &self.stats
    }
}
