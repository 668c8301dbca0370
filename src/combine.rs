//! Run the combine command over one alignment file
//!

use camino::Utf8Path;
use log::{debug, info, warn};
use rust_htslib::bam::{self, HeaderView, Read};
use simple_error::SimpleResult;
use unwrap::unwrap;

use crate::alignment_record::AlignmentRecord;
use crate::cli;
use crate::combine_chimera::{ChimeraCombiner, CombineResult};
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::run_stats::{CombineRunStats, CombineStats, write_run_stats};

pub const COMBINED_ALIGNMENT_FILENAME: &str = "combined.bam";

/// Create the output bam header from the input header, with the svreconcile commandline added as
/// a "PG" entry
///
fn get_combined_alignment_header(input_header: &HeaderView) -> bam::Header {
    let mut new_header = bam::Header::from_template(input_header);

    let cmdline = std::env::args().collect::<Vec<_>>().join(" ");
    let mut pg_record = bam::header::HeaderRecord::new(b"PG");
    pg_record.push_tag(b"PN", PROGRAM_NAME);
    pg_record.push_tag(b"ID", format!("{PROGRAM_NAME}-{PROGRAM_VERSION}"));
    pg_record.push_tag(b"VN", PROGRAM_VERSION);
    pg_record.push_tag(b"CL", &cmdline);

    new_header.push_record(&pg_record);
    new_header
}

/// True if the header declares coordinate sort order
///
fn is_coordinate_sorted(header: &HeaderView) -> bool {
    String::from_utf8_lossy(header.as_bytes())
        .lines()
        .filter(|x| x.starts_with("@HD"))
        .any(|x| x.split('\t').any(|field| field == "SO:coordinate"))
}

/// Partial alignments of one read, in both the htslib and structured representations
#[derive(Default)]
struct ReadGroup {
    bam_records: Vec<bam::Record>,
    alignments: Vec<AlignmentRecord>,
}

impl ReadGroup {
    fn read_name(&self) -> Option<&str> {
        self.alignments.first().map(|x| x.read_name.as_str())
    }

    fn push(&mut self, bam_record: bam::Record, alignment: AlignmentRecord) {
        self.bam_records.push(bam_record);
        self.alignments.push(alignment);
    }

    fn clear(&mut self) {
        self.bam_records.clear();
        self.alignments.clear();
    }
}

/// Combine one read group and write the result
///
/// Unmerged records are written unchanged, in alignment start order.
///
fn combine_read_group(
    combiner: &ChimeraCombiner,
    header: &HeaderView,
    read_group: &mut ReadGroup,
    bam_writer: &mut bam::Writer,
    stats: &mut CombineStats,
) -> SimpleResult<()> {
    let result = combiner.combine(&read_group.alignments);
    stats.record_result(&read_group.alignments, &result);

    match result {
        CombineResult::Merged(merged) => {
            debug!(
                "Merged {} alignments of read {} into {:?}",
                read_group.alignments.len(),
                merged.record.read_name,
                merged.indel
            );
            let record = merged.record.to_bam_record(header)?;
            unwrap!(
                bam_writer.write(&record),
                "Failed to write combined alignment record"
            );
        }
        CombineResult::Unmerged { reason, .. } => {
            if read_group.alignments.len() > 1 {
                debug!(
                    "Alignments of read {} left unmerged: {reason}",
                    read_group.read_name().unwrap_or_default()
                );
            }
            read_group.bam_records.sort_by_key(|x| x.pos());
            for record in read_group.bam_records.iter() {
                unwrap!(
                    bam_writer.write(record),
                    "Failed to write combined alignment record"
                );
            }
        }
    }
    read_group.clear();
    Ok(())
}

/// Combine the split alignments of every read in `alignment_filename`, and write the result to
/// `output_dir`
///
/// Secondary alignments are passed through without being offered to the combiner.
///
fn combine_alignment_file(
    combiner: &ChimeraCombiner,
    alignment_filename: &str,
    output_dir: &Utf8Path,
    thread_count: usize,
) -> SimpleResult<CombineStats> {
    let mut bam_reader = unwrap!(
        bam::Reader::from_path(alignment_filename),
        "Unable to open alignment file: '{alignment_filename}'"
    );
    let header = bam_reader.header().clone();
    if is_coordinate_sorted(&header) {
        warn!(
            "Alignment file '{alignment_filename}' is coordinate sorted. Split alignments are only combined when all records of a read are adjacent, so input should be grouped by read name"
        );
    }

    let filename = output_dir.join(COMBINED_ALIGNMENT_FILENAME);
    info!("Writing combined alignments to bam file: '{filename}'");

    let mut bam_writer = {
        let output_bam_header = get_combined_alignment_header(&header);
        unwrap!(
            bam::Writer::from_path(&filename, &output_bam_header, bam::Format::Bam),
            "Unable to create combined alignment file: '{filename}'"
        )
    };
    unwrap!(
        bam_writer.set_threads(thread_count),
        "Unable to set thread count for bam writer"
    );

    let mut stats = CombineStats::default();
    let mut read_group = ReadGroup::default();
    for r in bam_reader.records() {
        let record = unwrap!(r, "Failed to parse alignment record");

        if record.is_secondary() {
            stats.secondary_record_count += 1;
            unwrap!(
                bam_writer.write(&record),
                "Failed to write combined alignment record"
            );
            continue;
        }

        let alignment = AlignmentRecord::from_bam_record(&record, &header)?;
        if read_group
            .read_name()
            .is_some_and(|x| x != alignment.read_name)
        {
            combine_read_group(combiner, &header, &mut read_group, &mut bam_writer, &mut stats)?;
        }
        read_group.push(record, alignment);
    }
    if read_group.read_name().is_some() {
        combine_read_group(combiner, &header, &mut read_group, &mut bam_writer, &mut stats)?;
    }

    Ok(stats)
}

pub fn run_combine(
    shared_settings: &cli::SharedSettings,
    settings: &cli::CombineSettings,
) -> SimpleResult<()> {
    let combiner = ChimeraCombiner::new(settings.min_indel_buffer, settings.max_indel_size)?;

    info!(
        "Combining split alignments from file '{}'",
        settings.bam_filename
    );

    let combine_stats = combine_alignment_file(
        &combiner,
        &settings.bam_filename,
        &settings.output_dir,
        shared_settings.thread_count,
    )?;

    info!(
        "Finished combining {} read groups. Merged insertions: {} Merged deletions: {} Distant alignment groups: {}",
        combine_stats.read_group_count,
        combine_stats.merged_insertion_count,
        combine_stats.merged_deletion_count,
        combine_stats.distant_group_count,
    );

    let run_stats = CombineRunStats {
        alignment_filename: settings.bam_filename.clone(),
        min_indel_buffer: settings.min_indel_buffer.unwrap_or_default(),
        max_indel_size: settings.max_indel_size,
        combine_stats,
    };
    write_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}
