use crate::alignment_record::{AlignmentRecord, Strand};
use crate::cigar_utils::{get_hard_clip_sizes, get_read_clip_positions};

/// One partial alignment of a read, described in both read and reference coordinates
///
/// Read coordinates include hard-clipped bases, so that segments of the same read which were
/// hard-clipped differently can be compared directly.
///
#[derive(Clone, Debug)]
pub(super) struct SplitSegment<'a> {
    pub record: &'a AlignmentRecord,

    /// Read position of the first aligned base
    pub read_start: usize,

    /// Read position one base after the last aligned base
    pub read_end: usize,

    /// Read length including all clipped bases
    pub read_size: usize,

    pub leading_hard_clip: usize,

    /// 1-based reference start
    pub ref_start: i64,

    /// 1-based reference position one base after the alignment end
    pub ref_end: i64,
}

impl<'a> SplitSegment<'a> {
    pub fn new(record: &'a AlignmentRecord) -> Self {
        let (read_start, read_end, read_size) = get_read_clip_positions(&record.cigar);
        let (leading_hard_clip, _) = get_hard_clip_sizes(&record.cigar);
        Self {
            record,
            read_start,
            read_end,
            read_size,
            leading_hard_clip,
            ref_start: record.alignment_start,
            ref_end: record.alignment_end(),
        }
    }

    pub fn strand(&self) -> Strand {
        self.record.strand()
    }

    pub fn ref_span(&self) -> i64 {
        self.ref_end - self.ref_start
    }

    /// A segment clipped on both sides, which can only align inside an inserted region
    pub fn is_internal(&self) -> bool {
        self.read_start > 0 && self.read_end < self.read_size
    }

    /// Express the read coordinates of this segment in the orientation of `strand`
    ///
    pub fn oriented_to(mut self, strand: Strand) -> Self {
        if self.strand() != strand {
            let read_start = self.read_size - self.read_end;
            self.read_end = self.read_size - self.read_start;
            self.read_start = read_start;
        }
        self
    }
}
