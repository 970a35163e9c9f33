//! Partitioning of a transfer into per-worker byte ranges.

use crate::units::{GIB, MIB};

/// One contiguous byte range owned by exactly one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub worker_id: usize,
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
}

impl Chunk {
    /// Number of bytes in this chunk.
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Worker count scaled by archive size: 2 below 256 MiB, 4 below 1 GiB,
/// 8 below 4 GiB and 12 beyond.
pub fn connection_count(total_size: u64) -> usize {
    match total_size {
        s if s < 256 * MIB => 2,
        s if s < GIB => 4,
        s if s < 4 * GIB => 8,
        _ => 12,
    }
}

/// Split `[0, total_size)` into `workers` contiguous ranges.
///
/// The last chunk absorbs the division remainder. The worker count is
/// clamped so that no chunk is empty; a zero-sized transfer yields no chunks.
pub fn plan_chunks(total_size: u64, workers: usize) -> Vec<Chunk> {
    if total_size == 0 {
        return Vec::new();
    }

    let workers = (workers.max(1) as u64).min(total_size);
    let chunk_size = total_size / workers;

    (0..workers)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == workers - 1 {
                total_size - 1
            } else {
                start + chunk_size - 1
            };
            Chunk {
                worker_id: i as usize,
                start,
                end,
            }
        })
        .collect()
}
