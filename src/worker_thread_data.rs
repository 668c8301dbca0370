use std::sync::{Arc, Mutex};

use rust_htslib::bam;
use simple_error::{SimpleResult, bail};

/// For worker threads making indexed bam reads, this provides a persistent worker specific reader
pub struct BamReaderWorkerThreadData {
    pub bam_reader: bam::IndexedReader,
}

impl BamReaderWorkerThreadData {
    pub fn new(bam_filename: &str) -> SimpleResult<Self> {
        let bam_reader = match bam::IndexedReader::from_path(bam_filename) {
            Ok(x) => x,
            Err(e) => bail!("Unable to open indexed alignment file '{bam_filename}': {e}"),
        };
        Ok(Self { bam_reader })
    }
}

pub type BamReaderWorkerThreadDataSet = Arc<Vec<Mutex<BamReaderWorkerThreadData>>>;

/// Create one indexed reader for each worker thread
///
/// Returns an error if the alignment file can't be opened with an index.
///
pub fn get_bam_reader_worker_thread_data(
    bam_filename: &str,
    thread_count: usize,
) -> SimpleResult<BamReaderWorkerThreadDataSet> {
    assert!(thread_count > 0);
    let mut worker_thread_data = Vec::new();
    for _ in 0..thread_count {
        worker_thread_data.push(Mutex::new(BamReaderWorkerThreadData::new(bam_filename)?));
    }
    Ok(Arc::new(worker_thread_data))
}
