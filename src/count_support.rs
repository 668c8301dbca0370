//! Run the count-support command over one contig alignment file
//!

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::mpsc::channel;

use camino::Utf8Path;
use log::{info, warn};
use rust_htslib::bam::{self, Read};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::alignment_record::AlignmentRecord;
use crate::breakpoint_support::{
    BreakpointCounts, BreakpointSupportCounter, SupportScanStats, scan_breakpoint_support,
};
use crate::cli;
use crate::run_stats::{CountSupportRunStats, write_run_stats};
use crate::worker_thread_data::{BamReaderWorkerThreadDataSet, get_bam_reader_worker_thread_data};

pub const BREAKPOINT_SUPPORT_FILENAME: &str = "breakpoint.support.tsv";

/// Count breakpoint support in a single streaming pass over the whole alignment file
///
fn count_support_single_pass(
    bam_filename: &str,
    read_length: usize,
) -> SimpleResult<(BreakpointCounts, SupportScanStats)> {
    let mut bam_reader = unwrap!(
        bam::Reader::from_path(bam_filename),
        "Unable to open contig alignment file: '{bam_filename}'"
    );
    let header = bam_reader.header().clone();

    let alignments = bam_reader.records().map(|r| {
        let record = unwrap!(r, "Failed to parse contig alignment record");
        unwrap!(
            AlignmentRecord::from_bam_record(&record, &header),
            "Failed to read contig alignment record"
        )
    });

    let mut counter = BreakpointSupportCounter::new();
    counter.count_support(alignments, read_length, &header)?;
    Ok((counter.counts().clone(), counter.stats().clone()))
}

/// Count breakpoint support from the alignments to one contig
///
/// If `tid` is None, the unplaced records at the end of the file are scanned instead.
///
fn count_contig_support(
    worker_thread_dataset: &BamReaderWorkerThreadDataSet,
    tid: Option<u32>,
    read_length: usize,
) -> SimpleResult<(BreakpointCounts, SupportScanStats)> {
    let worker_id = rayon::current_thread_index().unwrap();
    let bam_reader = &mut worker_thread_dataset[worker_id].lock().unwrap().bam_reader;

    let fetch_definition = match tid {
        Some(tid) => bam::FetchDefinition::CompleteTid(tid as i32),
        None => bam::FetchDefinition::Unmapped,
    };
    if let Err(e) = bam_reader.fetch(fetch_definition) {
        bail!("Failed to fetch contig alignments for contig index {tid:?}: {e}");
    }
    let header = bam_reader.header().clone();

    let alignments = bam_reader.records().map(|r| {
        let record = unwrap!(r, "Failed to parse contig alignment record");
        unwrap!(
            AlignmentRecord::from_bam_record(&record, &header),
            "Failed to read contig alignment record"
        )
    });
    scan_breakpoint_support(alignments, read_length, &header)
}

/// Count breakpoint support with the alignments to each contig scanned as a separate worker task
///
/// Each task builds its own partial counts, which are merged at the end.
///
fn count_support_by_contig(
    worker_thread_dataset: BamReaderWorkerThreadDataSet,
    read_length: usize,
    thread_count: usize,
) -> SimpleResult<(BreakpointCounts, SupportScanStats)> {
    let target_count = worker_thread_dataset[0]
        .lock()
        .unwrap()
        .bam_reader
        .header()
        .target_count();

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();

    worker_pool.scope(move |scope| {
        for tid in (0..target_count).map(Some).chain(std::iter::once(None)) {
            let worker_thread_dataset = worker_thread_dataset.clone();
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = count_contig_support(&worker_thread_dataset, tid, read_length);
                tx.send(result).unwrap();
            });
        }
    });

    let mut counts = BreakpointCounts::new();
    let mut stats = SupportScanStats::default();
    for result in rx {
        let (contig_counts, contig_stats) = result?;
        counts.merge(contig_counts);
        stats.merge(&contig_stats);
    }
    Ok((counts, stats))
}

fn write_breakpoint_support_table(
    f: &mut impl Write,
    counts: &BreakpointCounts,
) -> std::io::Result<()> {
    writeln!(f, "#breakpoint_group\tbreakend1\tbreakend2\tsupport_count")?;
    for (breakpoint_id, count) in counts.iter() {
        writeln!(f, "{breakpoint_id}\t{count}")?;
    }
    f.flush()
}

fn write_breakpoint_support(output_dir: &Utf8Path, counts: &BreakpointCounts) {
    let filename = output_dir.join(BREAKPOINT_SUPPORT_FILENAME);

    info!("Writing breakpoint support counts to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create breakpoint support file: '{filename}'"
    );
    let mut f = BufWriter::new(f);
    unwrap!(
        write_breakpoint_support_table(&mut f, counts),
        "Unable to write breakpoint support file: '{filename}'"
    );
}

pub fn run_count_support(
    shared_settings: &cli::SharedSettings,
    settings: &cli::CountSupportSettings,
) -> SimpleResult<()> {
    info!(
        "Counting breakpoint support from contig alignment file '{}'",
        settings.bam_filename
    );

    let thread_count = shared_settings.thread_count;
    let (counts, scan_stats) = if thread_count > 1 {
        match get_bam_reader_worker_thread_data(&settings.bam_filename, thread_count) {
            Ok(worker_thread_dataset) => {
                count_support_by_contig(worker_thread_dataset, settings.read_length, thread_count)?
            }
            Err(e) => {
                info!("Counting breakpoint support in a single pass: {e}");
                count_support_single_pass(&settings.bam_filename, settings.read_length)?
            }
        }
    } else {
        count_support_single_pass(&settings.bam_filename, settings.read_length)?
    };

    info!(
        "Finished counting breakpoint support. Scanned records: {} Supporting records: {} Breakpoints with support: {}",
        scan_stats.scanned_record_count,
        scan_stats.supporting_record_count,
        counts.len()
    );
    if counts.is_empty() {
        warn!(
            "No breakpoint support found. Check that contig alignment read names encode the original alignment and that read length {} is correct",
            settings.read_length
        );
    }

    write_breakpoint_support(&settings.output_dir, &counts);

    let run_stats = CountSupportRunStats {
        alignment_filename: settings.bam_filename.clone(),
        read_length: settings.read_length,
        breakpoint_count: counts.len(),
        total_support_count: counts.total_support(),
        scan_stats,
    };
    write_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}
