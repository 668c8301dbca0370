//! Merge the partial alignments of one read into a single gapped alignment
//!
//! Local re-alignment against assembled contigs can split a read carrying an indel into two
//! clipped alignments on either side of the event, and sometimes a third alignment of the
//! inserted sequence itself. This module reconciles such a set back into one alignment with an
//! explicit insertion or deletion, or reports why the set has to be left unmerged.
//!

mod split_segment;

use rust_htslib::bam::record::Cigar;
use rust_htslib::htslib;
use simple_error::{SimpleResult, bail};

use self::split_segment::SplitSegment;
use crate::alignment_record::{
    AlignmentRecord, EDIT_DISTANCE_AUX_TAG, MISMATCH_STRING_AUX_TAG, MISSING_QUAL, SA_AUX_TAG,
    Strand,
};
use crate::cigar_utils::compress_cigar;

/// Default upper limit on the size of an indel produced by merging two segments
///
/// Segments implying a larger indel are distant alignments and are never merged.
pub const DEFAULT_MAX_INDEL_SIZE: usize = 50_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergedIndel {
    Insertion(usize),
    Deletion(usize),
}

/// Explanation for a read group which could not be merged into a single alignment
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnmergedReason {
    /// Nothing to merge
    SingleAlignment,

    /// At least one segment is unmapped or has no aligned bases
    UnalignedSegment,

    /// The segments don't form two flanks and at most one internal segment
    AmbiguousSegments,

    DifferentReference,
    DifferentStrand,

    /// Flank order on the read disagrees with flank order on the reference
    InconsistentReadOrder,

    ExceedsMaxIndelSize,

    /// The flanks describe a contiguous alignment with no indel between them
    ZeroLengthIndel,

    /// One of the merged match segments would be shorter than the indel buffer
    InsufficientFlank,

    /// Hard-clipped bases of the read are not stored in any of the segments
    IncompleteReadSequence,
}

impl UnmergedReason {
    /// True when the segments are genuinely separate alignments, rather than a malformed or
    /// degenerate indel candidate
    pub fn is_distant(&self) -> bool {
        use UnmergedReason::*;
        matches!(
            self,
            DifferentReference | DifferentStrand | InconsistentReadOrder | ExceedsMaxIndelSize
        )
    }
}

#[derive(Debug)]
pub struct MergedAlignment {
    pub record: AlignmentRecord,
    pub indel: MergedIndel,

    /// True length of the read, for each input record in input order
    ///
    /// Hard-clipped inputs under-report the read length, this provides the corrected value without
    /// modifying the inputs.
    pub corrected_read_lengths: Vec<usize>,
}

#[derive(Debug)]
pub enum CombineResult {
    Merged(MergedAlignment),

    /// Input records unmodified, in ascending order of alignment start
    Unmerged {
        reads: Vec<AlignmentRecord>,
        reason: UnmergedReason,
    },
}

/// Indel geometry of a merged read, before the read sequence is assembled
struct JunctionGeometry {
    left_match: usize,
    indel: MergedIndel,
    right_match: usize,
}

pub struct ChimeraCombiner {
    /// Minimum length of the aligned match on each side of a merged indel
    min_indel_buffer: usize,

    max_indel_size: usize,
}

impl ChimeraCombiner {
    pub fn new(min_indel_buffer: Option<usize>, max_indel_size: usize) -> SimpleResult<Self> {
        let Some(min_indel_buffer) = min_indel_buffer else {
            bail!("Minimum indel buffer must be configured before combining split alignments");
        };
        Ok(Self {
            min_indel_buffer,
            max_indel_size,
        })
    }

    /// Combine all partial alignments of one read
    ///
    /// The inputs are never modified. If the group can't be merged the inputs are returned sorted
    /// by alignment start, together with the reason.
    ///
    pub fn combine(&self, reads: &[AlignmentRecord]) -> CombineResult {
        match self.merge_split_alignments(reads) {
            Ok(x) => CombineResult::Merged(x),
            Err(reason) => {
                let mut reads = reads.to_vec();
                reads.sort_by_key(|x| x.alignment_start);
                CombineResult::Unmerged { reads, reason }
            }
        }
    }

    fn merge_split_alignments(
        &self,
        reads: &[AlignmentRecord],
    ) -> Result<MergedAlignment, UnmergedReason> {
        if reads.len() < 2 {
            return Err(UnmergedReason::SingleAlignment);
        }
        if reads.iter().any(|x| !x.is_aligned()) {
            return Err(UnmergedReason::UnalignedSegment);
        }

        let segments = reads.iter().map(SplitSegment::new).collect::<Vec<_>>();
        let (left, right, internal) = assign_segment_roles(&segments)?;

        if left.record.reference_name != right.record.reference_name {
            return Err(UnmergedReason::DifferentReference);
        }
        let strand = left.strand();
        if right.strand() != strand {
            return Err(UnmergedReason::DifferentStrand);
        }
        let internal = internal.map(|x| x.oriented_to(strand));

        let geometry = self.get_junction_geometry(left, right, internal.as_ref())?;

        let read_size = segments.iter().map(|x| x.read_size).max().unwrap_or(0);
        let (read_bases, base_qualities) = assemble_read_sequence(&segments, strand, read_size)
            .ok_or(UnmergedReason::IncompleteReadSequence)?;

        let cigar = {
            let indel_cigar = match geometry.indel {
                MergedIndel::Insertion(len) => Cigar::Ins(len as u32),
                MergedIndel::Deletion(len) => Cigar::Del(len as u32),
            };
            compress_cigar(&[
                Cigar::SoftClip(left.read_start as u32),
                Cigar::Match(geometry.left_match as u32),
                indel_cigar,
                Cigar::Match(geometry.right_match as u32),
                Cigar::SoftClip((read_size - right.read_end) as u32),
            ])
        };

        let mut record = left.record.clone();
        record.cigar = cigar;
        record.read_bases = read_bases;
        record.base_qualities = base_qualities;
        record.flags &= !(htslib::BAM_FSUPPLEMENTARY as u16);
        // These tags describe the split alignment and are invalid for the merged record
        record.int_tags.remove(EDIT_DISTANCE_AUX_TAG);
        record.string_tags.remove(MISMATCH_STRING_AUX_TAG);
        record.string_tags.remove(SA_AUX_TAG);

        Ok(MergedAlignment {
            record,
            indel: geometry.indel,
            corrected_read_lengths: vec![read_size; reads.len()],
        })
    }

    /// Find the indel type and size, and the match length on each side of it
    ///
    /// The indel size is derived from the total aligned read length and the reference span of the
    /// two flanks, so it does not depend on where the aligner placed the clip boundaries when the
    /// flanks overlap.
    ///
    fn get_junction_geometry(
        &self,
        left: &SplitSegment,
        right: &SplitSegment,
        internal: Option<&SplitSegment>,
    ) -> Result<JunctionGeometry, UnmergedReason> {
        if left.read_start >= right.read_start
            || left.read_end >= right.read_end
            || left.ref_end >= right.ref_end
        {
            return Err(UnmergedReason::InconsistentReadOrder);
        }

        let ref_span = right.ref_end - left.ref_start;
        let aligned_read_size = (right.read_end - left.read_start) as i64;
        let indel_size = aligned_read_size - ref_span;

        if indel_size.unsigned_abs() as usize > self.max_indel_size {
            return Err(UnmergedReason::ExceedsMaxIndelSize);
        }

        let (left_match, indel, right_match) = if indel_size > 0 {
            // Insertion: left flank is trimmed back to the right flank start on reference overlap,
            // and the right flank absorbs any small reference gap.
            let mut left_match = std::cmp::min(left.ref_span(), right.ref_start - left.ref_start);
            if let Some(internal) = internal {
                let insert_start = left.read_start as i64 + left_match;
                let insert_end = insert_start + indel_size;
                if (internal.read_end as i64) <= insert_start
                    || (internal.read_start as i64) >= insert_end
                {
                    return Err(UnmergedReason::AmbiguousSegments);
                }

                // The internal segment pins the junction when a flank stopped short of it
                if internal.read_start > left.read_end {
                    left_match = (internal.read_start - left.read_start) as i64;
                } else if internal.read_end < right.read_start {
                    left_match = ref_span - (right.read_end - internal.read_end) as i64;
                }
            }
            let right_match = ref_span - left_match;
            (
                left_match,
                MergedIndel::Insertion(indel_size as usize),
                right_match,
            )
        } else if indel_size < 0 {
            if internal.is_some() {
                return Err(UnmergedReason::AmbiguousSegments);
            }
            // Deletion: read overlap between the flanks is resolved by trimming the left flank
            let left_match = (std::cmp::min(left.read_end, right.read_start) - left.read_start) as i64;
            let right_match = aligned_read_size - left_match;
            (
                left_match,
                MergedIndel::Deletion((-indel_size) as usize),
                right_match,
            )
        } else {
            return Err(UnmergedReason::ZeroLengthIndel);
        };

        let min_flank = std::cmp::max(self.min_indel_buffer, 1) as i64;
        if left_match < min_flank || right_match < min_flank {
            return Err(UnmergedReason::InsufficientFlank);
        }

        Ok(JunctionGeometry {
            left_match: left_match as usize,
            indel,
            right_match: right_match as usize,
        })
    }
}

/// Select the left and right flanking segments, and the optional internal segment
///
/// Two segments are always treated as flanks. Three segments require exactly one internal
/// segment. Larger groups are not resolved.
///
fn assign_segment_roles<'a, 'b>(
    segments: &'b [SplitSegment<'a>],
) -> Result<
    (
        &'b SplitSegment<'a>,
        &'b SplitSegment<'a>,
        Option<SplitSegment<'a>>,
    ),
    UnmergedReason,
> {
    let mut sorted = segments.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|x| x.ref_start);

    match sorted.len() {
        2 => Ok((sorted[0], sorted[1], None)),
        3 => {
            let (internal, flanks): (Vec<_>, Vec<_>) =
                sorted.into_iter().partition(|x| x.is_internal());
            if internal.len() != 1 {
                return Err(UnmergedReason::AmbiguousSegments);
            }
            Ok((flanks[0], flanks[1], Some(internal[0].clone())))
        }
        _ => Err(UnmergedReason::AmbiguousSegments),
    }
}

/// Rebuild the full read sequence and qualities from every segment aligned on `strand`
///
/// Segments whose stored sequence doesn't match their cigar are not used. Returns None if any
/// read position isn't stored in at least one segment.
///
fn assemble_read_sequence(
    segments: &[SplitSegment],
    strand: Strand,
    read_size: usize,
) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut bases = vec![None; read_size];
    let mut quals = vec![MISSING_QUAL; read_size];
    for segment in segments.iter().filter(|x| x.strand() == strand) {
        let record = segment.record;
        if record.read_bases.len() != record.read_consumed_length() {
            continue;
        }
        let has_quals = record.base_qualities.len() == record.read_bases.len();
        for (offset, base) in record.read_bases.iter().enumerate() {
            let read_pos = segment.leading_hard_clip + offset;
            if read_pos >= read_size || bases[read_pos].is_some() {
                continue;
            }
            bases[read_pos] = Some(*base);
            if has_quals {
                quals[read_pos] = record.base_qualities[offset];
            }
        }
    }
    let bases = bases.into_iter().collect::<Option<Vec<_>>>()?;
    Some((bases, quals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar_utils::{cigar_to_string, get_cigar_read_offset, parse_cigar};

    const MIN_INDEL_BUFFER: usize = 33;

    fn get_test_combiner() -> ChimeraCombiner {
        ChimeraCombiner::new(Some(MIN_INDEL_BUFFER), DEFAULT_MAX_INDEL_SIZE).unwrap()
    }

    fn get_test_record(pos: i64, cigar: &str, length: usize) -> AlignmentRecord {
        AlignmentRecord {
            read_name: "read1".to_string(),
            reference_name: "chr21".to_string(),
            alignment_start: pos,
            mapq: 60,
            cigar: parse_cigar(cigar).unwrap(),
            read_bases: vec![b'A'; length],
            base_qualities: vec![30; length],
            ..Default::default()
        }
    }

    fn get_merged(result: CombineResult) -> MergedAlignment {
        match result {
            CombineResult::Merged(x) => x,
            CombineResult::Unmerged { reason, .. } => panic!("Unexpected unmerged result: {reason}"),
        }
    }

    fn get_unmerged(result: CombineResult) -> (Vec<AlignmentRecord>, UnmergedReason) {
        match result {
            CombineResult::Merged(x) => panic!(
                "Unexpected merged result: {}",
                cigar_to_string(&x.record.cigar)
            ),
            CombineResult::Unmerged { reads, reason } => (reads, reason),
        }
    }

    #[test]
    fn test_missing_min_indel_buffer() {
        assert!(ChimeraCombiner::new(None, DEFAULT_MAX_INDEL_SIZE).is_err());
    }

    #[test]
    fn test_single_alignment_unchanged() {
        let reads = vec![get_test_record(6162064, "129S120M", 249)];
        let (out, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::SingleAlignment);
        assert_eq!(out, reads);
    }

    #[test]
    fn test_insert() {
        let reads = vec![
            get_test_record(6162064, "129S120M", 249),
            get_test_record(6161985, "79M170S", 249),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 6161985);
        assert_eq!(cigar_to_string(&merged.record.cigar), "79M50I120M");
        assert_eq!(merged.indel, MergedIndel::Insertion(50));

        // Match and insert lengths account for the whole read
        assert_eq!(get_cigar_read_offset(&merged.record.cigar, true), 249);
        assert_eq!(merged.record.reference_span(), 79 + 120);
    }

    #[test]
    fn test_overlapping_insert() {
        let reads = vec![
            get_test_record(6161985, "129M120S", 249),
            get_test_record(6162064, "129S120M", 249),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 6161985);
        assert_eq!(cigar_to_string(&merged.record.cigar), "79M50I120M");
    }

    #[test]
    fn test_delete() {
        let reads = vec![
            get_test_record(16085602, "60S65M", 125),
            get_test_record(16085517, "60M65S", 125),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 16085517);
        assert_eq!(cigar_to_string(&merged.record.cigar), "60M25D65M");
        assert_eq!(merged.record.read_length(), 125);
        assert_eq!(merged.indel, MergedIndel::Deletion(25));
    }

    #[test]
    fn test_overlapping_delete() {
        let reads = vec![
            get_test_record(16085605, "49S62M", 111),
            get_test_record(16085517, "53M58S", 111),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 16085517);
        assert_eq!(cigar_to_string(&merged.record.cigar), "49M39D62M");
        assert_eq!(merged.record.read_length(), 111);
    }

    #[test]
    fn test_insert_region_aligned() {
        let reads = vec![
            get_test_record(16085517, "200M300S", 500),
            get_test_record(16085717, "300S200M", 500),
            get_test_record(33141553, "199S102M199S", 500),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 16085517);
        assert_eq!(cigar_to_string(&merged.record.cigar), "200M100I200M");
    }

    #[test]
    fn test_insert_with_padding_on_right_due_to_snp() {
        let reads = vec![
            get_test_record(30726101, "90M94S", 184),
            get_test_record(30826191, "90S51M43S", 184),
            get_test_record(30726192, "141S43M", 184),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 30726101);
        assert_eq!(cigar_to_string(&merged.record.cigar), "90M50I44M");
    }

    #[test]
    fn test_internal_segment_pins_left_junction() {
        // The left flank stops one base short of the inserted sequence
        let reads = vec![
            get_test_record(30726101, "89M95S", 184),
            get_test_record(30826191, "90S51M43S", 184),
            get_test_record(30726192, "141S43M", 184),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 30726101);
        assert_eq!(cigar_to_string(&merged.record.cigar), "90M50I44M");
    }

    #[test]
    fn test_internal_segment_outside_insertion() {
        let reads = vec![
            get_test_record(16085517, "200M300S", 500),
            get_test_record(16085717, "300S200M", 500),
            get_test_record(33141553, "10S50M440S", 500),
        ];
        let (out, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::AmbiguousSegments);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_distant_reads_not_modified() {
        let reads = vec![
            get_test_record(11032656, "63M31S", 94),
            get_test_record(214990735, "34S60M", 94),
        ];
        let (out, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert!(reason.is_distant());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].alignment_start, 11032656);
        assert_eq!(out[1].alignment_start, 214990735);
        assert_eq!(out[0], reads[0]);
        assert_eq!(out[1], reads[1]);
    }

    #[test]
    fn test_distant_reads_sorted_by_start() {
        let reads = vec![
            get_test_record(214990735, "34S60M", 94),
            get_test_record(11032656, "63M31S", 94),
        ];
        let (out, _) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(out[0].alignment_start, 11032656);
        assert_eq!(out[1].alignment_start, 214990735);
    }

    #[test]
    fn test_hard_clipping() {
        let reads = vec![
            get_test_record(6169757, "217M75S", 292),
            get_test_record(6170072, "215H77M", 77),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.alignment_start, 6169757);
        assert_eq!(cigar_to_string(&merged.record.cigar), "215M100D77M");
        assert_eq!(merged.corrected_read_lengths, vec![292, 292]);
        assert_eq!(merged.record.read_length(), 292);

        // Inputs are left untouched
        assert_eq!(reads[1].read_length(), 77);
    }

    #[test]
    fn test_hard_clipped_bases_not_stored() {
        let reads = vec![
            get_test_record(1000, "100M50H", 100),
            get_test_record(1200, "110H40M", 40),
        ];
        let (_, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::IncompleteReadSequence);
    }

    #[test]
    fn test_zero_length_indel_rejected() {
        let reads = vec![
            get_test_record(1000, "50M50S", 100),
            get_test_record(1050, "50S50M", 100),
        ];
        let (out, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::ZeroLengthIndel);
        assert_eq!(out, reads);
    }

    #[test]
    fn test_insufficient_flank() {
        let reads = vec![
            get_test_record(1000, "20M80S", 100),
            get_test_record(1020, "70S30M", 100),
        ];
        let (_, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::InsufficientFlank);
    }

    #[test]
    fn test_different_reference() {
        let mut right = get_test_record(16085602, "60S65M", 125);
        right.reference_name = "chr22".to_string();
        let reads = vec![get_test_record(16085517, "60M65S", 125), right];
        let (_, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::DifferentReference);
    }

    #[test]
    fn test_different_strand() {
        let mut right = get_test_record(16085602, "60S65M", 125);
        right.flags = htslib::BAM_FREVERSE as u16;
        let reads = vec![get_test_record(16085517, "60M65S", 125), right];
        let (_, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::DifferentStrand);
    }

    #[test]
    fn test_read_order_inconsistent_with_reference_order() {
        // The right side of the read aligns upstream of the left side
        let reads = vec![
            get_test_record(16085517, "65S60M", 125),
            get_test_record(16085602, "65M60S", 125),
        ];
        let (_, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::InconsistentReadOrder);
    }

    #[test]
    fn test_unresolved_multi_segment_groups() {
        // Three segments without an internal segment
        let reads = vec![
            get_test_record(1000, "60M65S", 125),
            get_test_record(1085, "60S65M", 125),
            get_test_record(5000, "60S65M", 125),
        ];
        let (_, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::AmbiguousSegments);

        // More than three segments
        let reads = vec![
            get_test_record(16085517, "200M300S", 500),
            get_test_record(16085717, "300S200M", 500),
            get_test_record(33141553, "199S51M250S", 500),
            get_test_record(33141753, "250S51M199S", 500),
        ];
        let (out, reason) = get_unmerged(get_test_combiner().combine(&reads));
        assert_eq!(reason, UnmergedReason::AmbiguousSegments);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_merged_record_tags() {
        let mut left = get_test_record(16085517, "60M65S", 125);
        left.int_tags.insert("NM".to_string(), 1);
        left.int_tags.insert("YX".to_string(), 4);
        for (tag, val) in [
            ("MD", "60"),
            ("SA", "chr21,16085603,+,60S65M,60,0;"),
            ("RG", "grp1"),
        ] {
            left.string_tags.insert(tag.to_string(), val.to_string());
        }
        left.flags = htslib::BAM_FSUPPLEMENTARY as u16;
        let reads = vec![left, get_test_record(16085602, "60S65M", 125)];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(merged.record.get_int_tag("NM"), None);
        assert_eq!(merged.record.get_int_tag("YX"), Some(4));
        assert!(!merged.record.string_tags.contains_key("MD"));
        assert!(!merged.record.string_tags.contains_key("SA"));
        assert_eq!(
            merged.record.string_tags.get("RG").map(|x| x.as_str()),
            Some("grp1")
        );
        assert_eq!(merged.record.flags, 0);
        assert_eq!(merged.record.read_name, "read1");
    }

    #[test]
    fn test_merged_record_keeps_mate_fields() {
        let paired_flags =
            (htslib::BAM_FPAIRED | htslib::BAM_FPROPER_PAIR | htslib::BAM_FMREVERSE) as u16;
        let mut left = get_test_record(16085517, "60M65S", 125);
        left.flags = paired_flags;
        left.mate_reference_name = "chr21".to_string();
        left.mate_alignment_start = 16085900;
        left.template_length = 508;
        let mut right = get_test_record(16085602, "60S65M", 125);
        right.flags = paired_flags | htslib::BAM_FSUPPLEMENTARY as u16;

        let merged = get_merged(get_test_combiner().combine(&[left, right]));
        assert_eq!(merged.record.flags, paired_flags);
        assert_eq!(merged.record.mate_reference_name, "chr21");
        assert_eq!(merged.record.mate_alignment_start, 16085900);
        assert_eq!(merged.record.template_length, 508);
    }

    #[test]
    fn test_reverse_strand_insert_with_forward_internal_segment() {
        let reverse = htslib::BAM_FREVERSE as u16;
        let mut left = get_test_record(30726101, "90M94S", 184);
        left.flags = reverse;
        let mut right = get_test_record(30726192, "141S43M", 184);
        right.flags = reverse;

        // The forward-strand internal segment covers read positions 90-141 in reverse orientation
        let internal = get_test_record(30826191, "43S51M90S", 184);

        let merged = get_merged(get_test_combiner().combine(&[left, internal, right]));
        assert_eq!(merged.record.alignment_start, 30726101);
        assert_eq!(cigar_to_string(&merged.record.cigar), "90M50I44M");
        assert_eq!(merged.record.strand(), Strand::Reverse);
        assert_eq!(merged.indel, MergedIndel::Insertion(50));
    }

    #[test]
    fn test_reverse_strand_internal_segment_outside_insertion() {
        let reverse = htslib::BAM_FREVERSE as u16;
        let mut left = get_test_record(30726101, "90M94S", 184);
        left.flags = reverse;
        let mut right = get_test_record(30726192, "141S43M", 184);
        right.flags = reverse;

        // Read positions 140-150 on the forward strand map to 34-44 in reverse orientation, inside
        // the left flank
        let internal = get_test_record(30826191, "140S10M34S", 184);

        let (_, reason) = get_unmerged(get_test_combiner().combine(&[left, internal, right]));
        assert_eq!(reason, UnmergedReason::AmbiguousSegments);
    }

    #[test]
    fn test_segment_without_stored_sequence() {
        // The right flank has no stored sequence, but the left flank covers the whole read
        let mut right = get_test_record(16085602, "60S65M", 125);
        right.read_bases.clear();
        right.base_qualities.clear();
        let reads = vec![get_test_record(16085517, "60M65S", 125), right];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(cigar_to_string(&merged.record.cigar), "60M25D65M");
        assert_eq!(merged.record.read_length(), 125);

        let mut left = get_test_record(16085517, "60M65S", 125);
        left.read_bases.truncate(100);
        let mut right = get_test_record(16085602, "60S65M", 125);
        right.read_bases.truncate(100);
        let (_, reason) = get_unmerged(get_test_combiner().combine(&[left, right]));
        assert_eq!(reason, UnmergedReason::IncompleteReadSequence);
    }

    #[test]
    fn test_merge_keeps_outer_soft_clip() {
        let reads = vec![
            get_test_record(16085517, "5S55M65S", 125),
            get_test_record(16085602, "60S60M5S", 125),
        ];
        let merged = get_merged(get_test_combiner().combine(&reads));
        assert_eq!(cigar_to_string(&merged.record.cigar), "5S55M30D60M5S");
    }
}
