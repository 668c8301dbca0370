//! CIGAR-processing utilities shared by the combiner and the breakpoint support counter
//!

use rust_htslib::bam::record::{Cigar, CigarString};
use simple_error::{SimpleResult, bail};

/// Is the cigar element any clip type?
///
pub fn is_clip(c: &Cigar) -> bool {
    matches!(c, Cigar::SoftClip(_) | Cigar::HardClip(_))
}

/// Is the cigar element any of the alignment match types?
///
pub fn is_alignment_match(c: &Cigar) -> bool {
    matches!(c, Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_))
}

/// Number of read bases consumed by the cigar element
///
/// Hard-clipped bases are only counted when `include_hard_clip` is set, because they are not
/// present in the stored read sequence.
///
pub fn get_cigarseg_read_offset(c: &Cigar, include_hard_clip: bool) -> usize {
    use Cigar::*;
    match c {
        Ins(len) | SoftClip(len) | Diff(len) | Equal(len) | Match(len) => *len as usize,
        HardClip(len) => {
            if include_hard_clip {
                *len as usize
            } else {
                0
            }
        }
        _ => 0,
    }
}

/// Number of reference bases consumed by the cigar element
///
pub fn get_cigarseg_ref_offset(c: &Cigar) -> i64 {
    use Cigar::*;
    match c {
        Del(len) | RefSkip(len) | Diff(len) | Equal(len) | Match(len) => *len as i64,
        _ => 0,
    }
}

/// Total reference span of the alignment
///
pub fn get_cigar_ref_offset(cigar: &[Cigar]) -> i64 {
    cigar.iter().map(get_cigarseg_ref_offset).sum()
}

/// Total read length consumed by the alignment
///
/// With `include_hard_clip` false this is the length of the stored read sequence.
///
pub fn get_cigar_read_offset(cigar: &[Cigar], include_hard_clip: bool) -> usize {
    cigar
        .iter()
        .map(|c| get_cigarseg_read_offset(c, include_hard_clip))
        .sum()
}

/// Total length of hard-clipped segments on the left and right side of the alignment
///
pub fn get_hard_clip_sizes(cigar: &[Cigar]) -> (usize, usize) {
    let leading = cigar
        .iter()
        .take_while(|c| is_clip(c))
        .filter_map(|c| match c {
            Cigar::HardClip(len) => Some(*len as usize),
            _ => None,
        })
        .sum();
    let trailing = cigar
        .iter()
        .rev()
        .take_while(|c| is_clip(c))
        .filter_map(|c| match c {
            Cigar::HardClip(len) => Some(*len as usize),
            _ => None,
        })
        .sum();
    (leading, trailing)
}

/// Report the following positions in read coordinates, counting hard-clipped bases as part of the
/// read:
/// 1. The first position after all left-side clipping
/// 2. The first position of all right-side clipping
/// 3. The full read length
///
pub fn get_read_clip_positions(cigar: &[Cigar]) -> (usize, usize, usize) {
    let mut read_pos = 0;
    let mut left_clip_size = 0;
    let mut right_clip_size = 0;
    let mut left_clip = true;
    for c in cigar.iter() {
        if is_clip(c) {
            if left_clip {
                left_clip_size += c.len() as usize;
            } else {
                right_clip_size += c.len() as usize;
            }
        } else {
            left_clip = false;
        }
        read_pos += get_cigarseg_read_offset(c, true);
    }
    (left_clip_size, read_pos - right_clip_size, read_pos)
}

/// Return true if the CIGAR string contains any aligned (M/X/=) segments
///
pub fn has_aligned_segments(cigar: &[Cigar]) -> bool {
    cigar.iter().any(is_alignment_match)
}

/// Compress CIGAR string down to canonical format:
///
/// 1. Convert any matching adjacent cigar elements into a single element
/// 2. Remove any zero-length elements
///
pub fn compress_cigar(cigar_in: &[Cigar]) -> Vec<Cigar> {
    let mut cigar_out: Vec<Cigar> = Vec::new();
    for c in cigar_in.iter().filter(|x| !x.is_empty()) {
        match cigar_out.last_mut() {
            Some(last) if std::mem::discriminant(&*last) == std::mem::discriminant(c) => {
                use Cigar::*;
                if let Match(n) | Equal(n) | Diff(n) | Del(n) | Ins(n) | HardClip(n)
                | SoftClip(n) | RefSkip(n) | Pad(n) = last
                {
                    *n += c.len();
                }
            }
            _ => cigar_out.push(*c),
        }
    }
    cigar_out
}

/// Parse a CIGAR string such as "79M50I120M"
///
pub fn parse_cigar(cigar_str: &str) -> SimpleResult<Vec<Cigar>> {
    match CigarString::try_from(cigar_str.as_bytes()) {
        Ok(x) => Ok(x.into()),
        Err(e) => bail!("Can't parse CIGAR string '{cigar_str}': {e}"),
    }
}

/// Format a cigar in SAM text format, using '*' for an empty cigar
///
pub fn cigar_to_string(cigar: &[Cigar]) -> String {
    if cigar.is_empty() {
        "*".to_string()
    } else {
        CigarString(cigar.to_vec()).to_string()
    }
}
