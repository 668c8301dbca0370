use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Read support count for each SV breakpoint
///
/// Counts only increase. Partial accumulators built over disjoint alignment sets can be combined
/// with `merge`.
///
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BreakpointCounts {
    counts: BTreeMap<String, usize>,
}

impl BreakpointCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, breakpoint_id: &str) {
        match self.counts.get_mut(breakpoint_id) {
            Some(x) => *x += 1,
            None => {
                self.counts.insert(breakpoint_id.to_string(), 1);
            }
        }
    }

    /// Sum the counts from another accumulator into this one
    pub fn merge(&mut self, other: Self) {
        for (breakpoint_id, count) in other.counts {
            *self.counts.entry(breakpoint_id).or_insert(0) += count;
        }
    }

    #[cfg(test)]
    pub fn get(&self, breakpoint_id: &str) -> Option<usize> {
        self.counts.get(breakpoint_id).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over (breakpoint_id, count) in breakpoint_id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total_support(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Outcome counts for each filter applied during a breakpoint support scan
///
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SupportScanStats {
    pub scanned_record_count: usize,
    pub unmapped_record_count: usize,

    /// Records without a single full-length match to the contig
    pub partial_match_record_count: usize,

    /// Records too close to either contig edge to span the breakpoint
    pub edge_record_count: usize,

    pub high_edit_distance_record_count: usize,

    /// Records that don't improve on the edit distance of the original alignment
    pub no_improvement_record_count: usize,

    pub malformed_breakpoint_key_count: usize,
    pub supporting_record_count: usize,
}

impl SupportScanStats {
    pub fn merge(&mut self, other: &Self) {
        self.scanned_record_count += other.scanned_record_count;
        self.unmapped_record_count += other.unmapped_record_count;
        self.partial_match_record_count += other.partial_match_record_count;
        self.edge_record_count += other.edge_record_count;
        self.high_edit_distance_record_count += other.high_edit_distance_record_count;
        self.no_improvement_record_count += other.no_improvement_record_count;
        self.malformed_breakpoint_key_count += other.malformed_breakpoint_key_count;
        self.supporting_record_count += other.supporting_record_count;
    }
}
