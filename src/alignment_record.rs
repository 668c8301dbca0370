//! Alignment model shared by the split-alignment combiner and the breakpoint support counter
//!

use std::collections::BTreeMap;

use rust_htslib::bam::{
    self, HeaderView,
    record::{Aux, Cigar, CigarString},
};
use rust_htslib::htslib;
use simple_error::{SimpleResult, bail};

use crate::cigar_utils::{
    cigar_to_string, get_cigar_read_offset, get_cigar_ref_offset, has_aligned_segments,
};

pub const EDIT_DISTANCE_AUX_TAG: &str = "NM";
pub const ORIGINAL_EDIT_DISTANCE_AUX_TAG: &str = "YX";
pub const MISMATCH_STRING_AUX_TAG: &str = "MD";
pub const SA_AUX_TAG: &str = "SA";

/// Quality value used by BAM to mark a missing base quality
pub const MISSING_QUAL: u8 = 255;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

/// One genomic alignment of a read
///
/// Reference coordinates follow SAM conventions: `alignment_start` is the 1-based position of the
/// first reference base covered by the cigar, and is 0 for an unplaced read.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentRecord {
    pub read_name: String,
    pub flags: u16,

    /// "*" for an unplaced read
    pub reference_name: String,

    pub alignment_start: i64,
    pub mapq: u8,
    pub cigar: Vec<Cigar>,

    /// Reference of the mate alignment, "*" or empty when the mate is unplaced
    pub mate_reference_name: String,

    /// 1-based start of the mate alignment, 0 when the mate is unplaced
    pub mate_alignment_start: i64,

    pub template_length: i64,

    /// Stored read sequence, hard-clipped bases are absent
    pub read_bases: Vec<u8>,

    /// Same length as `read_bases`, 255 marks a missing value
    pub base_qualities: Vec<u8>,

    pub int_tags: BTreeMap<String, i64>,
    pub string_tags: BTreeMap<String, String>,
}

impl AlignmentRecord {
    pub fn strand(&self) -> Strand {
        if (self.flags as u32 & htslib::BAM_FREVERSE) != 0 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn is_unmapped(&self) -> bool {
        (self.flags as u32 & htslib::BAM_FUNMAP) != 0
    }

    /// True if the read is mapped with at least one aligned base
    pub fn is_aligned(&self) -> bool {
        !self.is_unmapped() && has_aligned_segments(&self.cigar)
    }

    /// Total length of reference-consuming cigar operations
    pub fn reference_span(&self) -> i64 {
        get_cigar_ref_offset(&self.cigar)
    }

    /// Total length of read-consuming cigar operations, excluding hard clips
    pub fn read_consumed_length(&self) -> usize {
        get_cigar_read_offset(&self.cigar, false)
    }

    /// 1-based position one base after the right-most aligned reference position
    pub fn alignment_end(&self) -> i64 {
        self.alignment_start + self.reference_span()
    }

    /// Length of the stored read sequence
    pub fn read_length(&self) -> usize {
        self.read_bases.len()
    }

    pub fn get_int_tag(&self, tag: &str) -> Option<i64> {
        self.int_tags.get(tag).copied()
    }

    fn has_mate_reference(&self) -> bool {
        !(self.mate_reference_name.is_empty() || self.mate_reference_name == "*")
    }

    /// Canonical SAM text representation of the record
    ///
    pub fn to_sam_string(&self) -> String {
        let seq = if self.read_bases.is_empty() {
            "*".to_string()
        } else {
            String::from_utf8_lossy(&self.read_bases).to_string()
        };
        let qual = if self.base_qualities.is_empty()
            || self.base_qualities.iter().all(|&q| q == MISSING_QUAL)
        {
            "*".to_string()
        } else {
            self.base_qualities
                .iter()
                .map(|&q| (q.saturating_add(33)) as char)
                .collect()
        };
        let mate_reference_name = if !self.has_mate_reference() {
            "*".to_string()
        } else if self.mate_reference_name == self.reference_name {
            "=".to_string()
        } else {
            self.mate_reference_name.clone()
        };
        let mut fields = vec![
            self.read_name.clone(),
            self.flags.to_string(),
            self.reference_name.clone(),
            self.alignment_start.to_string(),
            self.mapq.to_string(),
            cigar_to_string(&self.cigar),
            mate_reference_name,
            self.mate_alignment_start.to_string(),
            self.template_length.to_string(),
            seq,
            qual,
        ];
        for (tag, val) in self.int_tags.iter() {
            fields.push(format!("{tag}:i:{val}"));
        }
        for (tag, val) in self.string_tags.iter() {
            fields.push(format!("{tag}:Z:{val}"));
        }
        fields.join("\t")
    }

    /// Translate an htslib record into the alignment model
    ///
    /// Integer aux tags of any width are kept in `int_tags`, string tags in `string_tags`, all other
    /// aux types are dropped.
    ///
    pub fn from_bam_record(record: &bam::Record, header: &HeaderView) -> SimpleResult<Self> {
        let read_name = match std::str::from_utf8(record.qname()) {
            Ok(x) => x.to_string(),
            Err(_) => bail!("Read name is not valid UTF-8"),
        };

        let get_reference_name = |tid: i32| -> SimpleResult<String> {
            if tid < 0 {
                return Ok("*".to_string());
            }
            match std::str::from_utf8(header.tid2name(tid as u32)) {
                Ok(x) => Ok(x.to_string()),
                Err(_) => bail!("Reference name is not valid UTF-8 in read {read_name}"),
            }
        };
        let reference_name = get_reference_name(record.tid())?;
        let mate_reference_name = get_reference_name(record.mtid())?;

        let mut int_tags = BTreeMap::new();
        let mut string_tags = BTreeMap::new();
        for aux in record.aux_iter() {
            let (tag, val) = match aux {
                Ok(x) => x,
                Err(e) => bail!("Can't parse aux tags in read {read_name}: {e}"),
            };
            let tag = String::from_utf8_lossy(tag).to_string();
            let int_val = match val {
                Aux::I8(x) => x as i64,
                Aux::U8(x) => x as i64,
                Aux::I16(x) => x as i64,
                Aux::U16(x) => x as i64,
                Aux::I32(x) => x as i64,
                Aux::U32(x) => x as i64,
                Aux::String(x) => {
                    string_tags.insert(tag, x.to_string());
                    continue;
                }
                _ => continue,
            };
            int_tags.insert(tag, int_val);
        }

        Ok(Self {
            read_name,
            flags: record.flags(),
            reference_name,
            alignment_start: record.pos() + 1,
            mapq: record.mapq(),
            cigar: record.cigar().take().0,
            mate_reference_name,
            mate_alignment_start: record.mpos() + 1,
            template_length: record.insert_size(),
            read_bases: record.seq().as_bytes(),
            base_qualities: record.qual().to_vec(),
            int_tags,
            string_tags,
        })
    }

    /// Translate the alignment model back into an htslib record for output
    ///
    pub fn to_bam_record(&self, header: &HeaderView) -> SimpleResult<bam::Record> {
        let get_tid = |reference_name: &str| -> SimpleResult<i32> {
            if reference_name.is_empty() || reference_name == "*" {
                return Ok(-1);
            }
            match header.tid(reference_name.as_bytes()) {
                Some(x) => Ok(x as i32),
                None => bail!(
                    "Reference '{reference_name}' for read {} is not found in the output header",
                    self.read_name
                ),
            }
        };
        let tid = get_tid(&self.reference_name)?;
        let mtid = get_tid(&self.mate_reference_name)?;

        let quals = if self.base_qualities.len() == self.read_bases.len() {
            self.base_qualities.clone()
        } else {
            vec![MISSING_QUAL; self.read_bases.len()]
        };

        let mut record = bam::Record::new();
        record.set(
            self.read_name.as_bytes(),
            Some(&CigarString(self.cigar.clone())),
            &self.read_bases,
            &quals,
        );
        record.set_flags(self.flags);
        record.set_tid(tid);
        record.set_pos(self.alignment_start - 1);
        record.set_mapq(self.mapq);
        record.set_mtid(mtid);
        record.set_mpos(if mtid < 0 { -1 } else { self.mate_alignment_start - 1 });
        record.set_insert_size(self.template_length);
        if tid >= 0 {
            let begin = (self.alignment_start - 1) as usize;
            let end = std::cmp::max(self.alignment_end() - 1, self.alignment_start) as usize;
            record.set_bin(bam_reg2bin(begin, end));
        }

        for (tag, val) in self.int_tags.iter() {
            let val = match i32::try_from(*val) {
                Ok(x) => x,
                Err(_) => bail!(
                    "Value {val} of tag {tag} in read {} exceeds BAM integer range",
                    self.read_name
                ),
            };
            if let Err(e) = record.push_aux(tag.as_bytes(), Aux::I32(val)) {
                bail!("Can't add tag {tag} to read {}: {e}", self.read_name);
            }
        }
        for (tag, val) in self.string_tags.iter() {
            if let Err(e) = record.push_aux(tag.as_bytes(), Aux::String(val.as_str())) {
                bail!("Can't add tag {tag} to read {}: {e}", self.read_name);
            }
        }

        Ok(record)
    }
}

/// Recreation of htslib hts_reg2bin in rust
///
/// begin and end should follow bed zero-based half-closed format
///
fn hts_reg2bin(begin: usize, end: usize, min_shift: u8, depth: u8) -> usize {
    let end = end - 1;
    let mut level = depth;
    let mut shift = min_shift;
    let mut offset = ((1 << (depth * 3)) - 1) / 7;

    while level > 0 {
        if begin >> shift == end >> shift {
            return offset + (begin >> shift);
        }
        level -= 1;
        shift += 3;
        offset -= 1 << (level * 3);
    }
    0
}

pub fn bam_reg2bin(begin: usize, end: usize) -> u16 {
    hts_reg2bin(begin, end, 14, 5) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar_utils::parse_cigar;
    use rust_htslib::bam::{Header, header};

    fn get_test_header() -> HeaderView {
        let mut _header = Header::new();
        _header.push_record(
            header::HeaderRecord::new(b"SQ")
                .push_tag(b"SN", "chr1")
                .push_tag(b"LN", 10000000),
        );
        HeaderView::from_header(&_header)
    }

    #[test]
    fn test_derived_queries() {
        let record = AlignmentRecord {
            alignment_start: 100,
            cigar: parse_cigar("5H5S10M3D4I6M2S").unwrap(),
            read_bases: vec![b'A'; 27],
            ..Default::default()
        };
        assert_eq!(record.reference_span(), 19);
        assert_eq!(record.read_consumed_length(), 27);
        assert_eq!(record.alignment_end(), 119);
        assert_eq!(record.strand(), Strand::Forward);
        assert!(record.is_aligned());
    }

    #[test]
    fn test_from_bam_record() {
        let header = get_test_header();
        let sam_line = b"qname\t16\tchr1\t10\t60\t5S15M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE\tNM:i:2\tYX:i:7\tRG:Z:grp1";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        let record = AlignmentRecord::from_bam_record(&rec, &header).unwrap();

        assert_eq!(record.read_name, "qname");
        assert_eq!(record.reference_name, "chr1");
        assert_eq!(record.alignment_start, 10);
        assert_eq!(record.strand(), Strand::Reverse);
        assert_eq!(record.read_bases, b"ACGCCGTATCGTCTCGAGGA".to_vec());
        assert_eq!(record.get_int_tag("NM"), Some(2));
        assert_eq!(record.get_int_tag("YX"), Some(7));
        assert_eq!(record.string_tags.get("RG").map(|x| x.as_str()), Some("grp1"));
    }

    #[test]
    fn test_unmapped_from_bam_record() {
        let header = get_test_header();
        let sam_line =
            b"qname\t4\t*\t0\t255\t*\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        let record = AlignmentRecord::from_bam_record(&rec, &header).unwrap();
        assert!(record.is_unmapped());
        assert!(!record.is_aligned());
        assert_eq!(record.reference_name, "*");
        assert_eq!(record.alignment_start, 0);
    }

    #[test]
    fn test_to_sam_string() {
        let header = get_test_header();
        let sam_line = "qname\t0\tchr1\t10\t60\t5S15M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE\tNM:i:2\tRG:Z:grp1";
        let rec = bam::Record::from_sam(&header, sam_line.as_bytes()).unwrap();
        let record = AlignmentRecord::from_bam_record(&rec, &header).unwrap();
        assert_eq!(record.to_sam_string(), sam_line);
    }

    #[test]
    fn test_bam_record_roundtrip() {
        let header = get_test_header();
        let sam_line = b"qname\t0\tchr1\t10\t60\t5S10M5D5M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE\tNM:i:5";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        let record = AlignmentRecord::from_bam_record(&rec, &header).unwrap();

        let out = record.to_bam_record(&header).unwrap();
        assert_eq!(out.pos(), 9);
        assert_eq!(out.tid(), 0);
        assert_eq!(out.cigar().to_string(), "5S10M5D5M");
        assert_eq!(AlignmentRecord::from_bam_record(&out, &header).unwrap(), record);
    }

    #[test]
    fn test_mate_fields_roundtrip() {
        let header = get_test_header();
        let sam_line = "qname\t99\tchr1\t10\t60\t20M\t=\t300\t310\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line.as_bytes()).unwrap();
        let record = AlignmentRecord::from_bam_record(&rec, &header).unwrap();
        assert_eq!(record.mate_reference_name, "chr1");
        assert_eq!(record.mate_alignment_start, 300);
        assert_eq!(record.template_length, 310);
        assert_eq!(record.to_sam_string(), sam_line);

        let out = record.to_bam_record(&header).unwrap();
        assert_eq!(out.mtid(), 0);
        assert_eq!(out.mpos(), 299);
        assert_eq!(out.insert_size(), 310);
    }

    #[test]
    fn test_to_bam_record_unknown_reference() {
        let header = get_test_header();
        let record = AlignmentRecord {
            read_name: "qname".to_string(),
            reference_name: "chr9".to_string(),
            alignment_start: 10,
            cigar: parse_cigar("4M").unwrap(),
            read_bases: b"ACGT".to_vec(),
            ..Default::default()
        };
        assert!(record.to_bam_record(&header).is_err());
    }

    #[test]
    fn test_bam_reg2bin() {
        assert_eq!(bam_reg2bin(0, 1), 4681);
        assert_eq!(bam_reg2bin(0, 1 << 14), 4681);
        assert_eq!(bam_reg2bin(0, (1 << 14) + 1), 585);
    }
}
