//! Track stats for the whole svreconcile run
//!

use std::collections::BTreeMap;
use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::alignment_record::AlignmentRecord;
use crate::breakpoint_support::SupportScanStats;
use crate::combine_chimera::{CombineResult, MergedIndel};

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CombineStats {
    pub read_group_count: usize,
    pub input_record_count: usize,
    pub output_record_count: usize,

    /// Records passed through without being offered to the combiner
    pub secondary_record_count: usize,

    pub merged_insertion_count: usize,
    pub merged_deletion_count: usize,

    /// Read groups left unmerged because the segments are genuinely separate alignments
    pub distant_group_count: usize,

    /// Count of unmerged read groups by reason, excluding single-alignment groups
    pub unmerged_reason_counts: BTreeMap<String, usize>,

    /// Merged read groups where hard-clipping under-reported the read length of an input segment
    pub corrected_read_length_count: usize,
}

impl CombineStats {
    pub fn record_result(&mut self, read_group: &[AlignmentRecord], result: &CombineResult) {
        self.read_group_count += 1;
        self.input_record_count += read_group.len();
        match result {
            CombineResult::Merged(x) => {
                self.output_record_count += 1;
                match x.indel {
                    MergedIndel::Insertion(_) => self.merged_insertion_count += 1,
                    MergedIndel::Deletion(_) => self.merged_deletion_count += 1,
                }
                if read_group
                    .iter()
                    .zip(x.corrected_read_lengths.iter())
                    .any(|(read, &len)| read.read_length() != len)
                {
                    self.corrected_read_length_count += 1;
                }
            }
            CombineResult::Unmerged { reads, reason } => {
                self.output_record_count += reads.len();
                if reason.is_distant() {
                    self.distant_group_count += 1;
                }
                if reads.len() > 1 {
                    *self
                        .unmerged_reason_counts
                        .entry(reason.to_string())
                        .or_insert(0) += 1;
                }
            }
        }
    }
}

#[derive(Deserialize, Serialize)]
pub struct CombineRunStats {
    pub alignment_filename: String,
    pub min_indel_buffer: usize,
    pub max_indel_size: usize,
    pub combine_stats: CombineStats,
}

#[derive(Deserialize, Serialize)]
pub struct CountSupportRunStats {
    pub alignment_filename: String,
    pub read_length: usize,
    pub breakpoint_count: usize,
    pub total_support_count: usize,
    pub scan_stats: SupportScanStats,
}

/// Write run_stats structure out in json format
pub fn write_run_stats<T: Serialize>(output_dir: &Utf8Path, run_stats: &T) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
}
