//! Choice between the parallel and single-stream transfer paths.
//!
//! Parallel downloads land in a temporary file via range requests and are
//! extracted afterwards; single-stream downloads pipe one response body
//! straight into the extractor without touching disk.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use super::plan::connection_count;
use super::probe::TransferDescriptor;
use crate::config::MAX_CONNECTIONS;
use crate::error::{FetchError, FetchResult};
use crate::units::format_bytes;

/// User-selected strategy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    /// Probe and pick the best strategy.
    #[default]
    Auto,
    /// Always download in parallel; fail if the server cannot support it.
    Parallel,
    /// Always stream over one connection.
    Single,
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadMode::Auto => write!(f, "auto"),
            DownloadMode::Parallel => write!(f, "parallel"),
            DownloadMode::Single => write!(f, "single"),
        }
    }
}

impl FromStr for DownloadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(DownloadMode::Auto),
            "parallel" | "force-parallel" => Ok(DownloadMode::Parallel),
            "single" | "force-single" => Ok(DownloadMode::Single),
            other => Err(format!(
                "unknown download mode '{}' (expected auto, parallel or single)",
                other
            )),
        }
    }
}

/// The transfer path to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Range requests into a temporary file, then extraction.
    Parallel { workers: usize, total_size: u64 },
    /// One response body piped into the extractor.
    Stream,
}

/// Why a strategy was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// The mode left no choice.
    Forced,
    /// Range supported and the archive is large enough.
    AboveThreshold,
    /// Range supported but the archive is below the threshold.
    BelowThreshold { threshold: u64 },
    /// The server ignored the range request.
    RangeUnsupported,
    /// Range supported but no total size was reported.
    SizeUnknown,
}

/// Outcome of strategy selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub strategy: Strategy,
    pub reason: DecisionReason,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.strategy, self.reason) {
            (Strategy::Parallel { workers, total_size }, reason) => {
                write!(
                    f,
                    "parallel download ({} connections, {}",
                    workers,
                    format_bytes(total_size)
                )?;
                if reason == DecisionReason::Forced {
                    write!(f, ", forced")?;
                }
                write!(f, ")")
            }
            (Strategy::Stream, DecisionReason::Forced) => {
                write!(f, "single-connection download (streaming, forced)")
            }
            (Strategy::Stream, DecisionReason::BelowThreshold { threshold }) => {
                write!(
                    f,
                    "single-connection download (below {} parallel threshold)",
                    format_bytes(threshold)
                )
            }
            (Strategy::Stream, DecisionReason::RangeUnsupported) => {
                write!(
                    f,
                    "single-connection download (server does not support Range requests)"
                )
            }
            (Strategy::Stream, DecisionReason::SizeUnknown) => {
                write!(f, "single-connection download (size unknown)")
            }
            (Strategy::Stream, DecisionReason::AboveThreshold) => {
                write!(f, "single-connection download")
            }
        }
    }
}

/// Worker count for a parallel transfer of `total_size` bytes.
///
/// `connections` in `1..=32` overrides size-based scaling; `0` means automatic.
pub fn worker_count(total_size: u64, connections: usize) -> usize {
    if (1..=MAX_CONNECTIONS).contains(&connections) {
        connections
    } else {
        connection_count(total_size)
    }
}

/// Select a strategy from the mode and the probe result.
///
/// Only `Parallel` mode can fail, and only when its preconditions are unmet.
pub fn select_strategy(
    mode: DownloadMode,
    descriptor: &TransferDescriptor,
    connections: usize,
    threshold: u64,
) -> FetchResult<Decision> {
    let decision = match mode {
        DownloadMode::Single => Decision {
            strategy: Strategy::Stream,
            reason: DecisionReason::Forced,
        },
        DownloadMode::Parallel => {
            if !descriptor.range_supported {
                return Err(FetchError::RangeUnsupported {
                    url: descriptor.url.clone(),
                });
            }
            let total_size = descriptor
                .total_size
                .filter(|&s| s > 0)
                .ok_or_else(|| FetchError::SizeUnknown {
                    url: descriptor.url.clone(),
                })?;
            Decision {
                strategy: Strategy::Parallel {
                    workers: worker_count(total_size, connections),
                    total_size,
                },
                reason: DecisionReason::Forced,
            }
        }
        DownloadMode::Auto => auto_decision(descriptor, connections, threshold),
    };

    info!(
        mode = %mode,
        total_size = ?descriptor.total_size,
        range_supported = descriptor.range_supported,
        "→ {}",
        decision
    );
    Ok(decision)
}

fn auto_decision(descriptor: &TransferDescriptor, connections: usize, threshold: u64) -> Decision {
    let stream = |reason| Decision {
        strategy: Strategy::Stream,
        reason,
    };

    if !descriptor.range_supported {
        return stream(DecisionReason::RangeUnsupported);
    }
    match descriptor.total_size {
        None | Some(0) => stream(DecisionReason::SizeUnknown),
        Some(size) if size < threshold => stream(DecisionReason::BelowThreshold { threshold }),
        Some(size) => Decision {
            strategy: Strategy::Parallel {
                workers: worker_count(size, connections),
                total_size: size,
            },
            reason: DecisionReason::AboveThreshold,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PARALLEL_THRESHOLD;
    use crate::download::probe::parse_content_range;
    use crate::units::{GIB, MIB};

    const URL: &str = "https://storage.example.com/backup.tar.gz?sig=abc";

    fn descriptor(total_size: Option<u64>, range_supported: bool) -> TransferDescriptor {
        TransferDescriptor {
            url: URL.to_string(),
            total_size,
            range_supported,
        }
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("auto".parse::<DownloadMode>(), Ok(DownloadMode::Auto));
        assert_eq!("Parallel".parse::<DownloadMode>(), Ok(DownloadMode::Parallel));
        assert_eq!("force-parallel".parse::<DownloadMode>(), Ok(DownloadMode::Parallel));
        assert_eq!("single".parse::<DownloadMode>(), Ok(DownloadMode::Single));
        assert_eq!("force-single".parse::<DownloadMode>(), Ok(DownloadMode::Single));
        assert!("turbo".parse::<DownloadMode>().is_err());
    }

    #[test]
    fn test_mode_display_roundtrip() {
        for mode in [DownloadMode::Auto, DownloadMode::Parallel, DownloadMode::Single] {
            assert_eq!(mode.to_string().parse::<DownloadMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_auto_threshold_from_probe_trailer() {
        // 206 with "bytes 0-0/1048576" is 1 MiB: below the default threshold.
        let total = parse_content_range("bytes 0-0/1048576");
        let small = descriptor(total, true);
        let decision =
            select_strategy(DownloadMode::Auto, &small, 0, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(decision.strategy, Strategy::Stream);
        assert_eq!(
            decision.reason,
            DecisionReason::BelowThreshold {
                threshold: DEFAULT_PARALLEL_THRESHOLD
            }
        );

        // The same trailer clears a threshold set below it.
        let decision = select_strategy(DownloadMode::Auto, &small, 0, 512 * 1024).unwrap();
        assert_eq!(
            decision.strategy,
            Strategy::Parallel {
                workers: 2,
                total_size: 1_048_576
            }
        );
    }

    #[test]
    fn test_auto_at_threshold_is_parallel() {
        let d = descriptor(Some(64 * MIB), true);
        let decision =
            select_strategy(DownloadMode::Auto, &d, 0, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(decision.reason, DecisionReason::AboveThreshold);
        assert!(matches!(decision.strategy, Strategy::Parallel { workers: 2, .. }));

        let d = descriptor(Some(64 * MIB - 1), true);
        let decision =
            select_strategy(DownloadMode::Auto, &d, 0, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(decision.strategy, Strategy::Stream);
    }

    #[test]
    fn test_auto_range_unsupported() {
        let d = descriptor(Some(10 * GIB), false);
        let decision =
            select_strategy(DownloadMode::Auto, &d, 0, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(decision.strategy, Strategy::Stream);
        assert_eq!(decision.reason, DecisionReason::RangeUnsupported);
    }

    #[test]
    fn test_auto_size_unknown() {
        let d = descriptor(None, true);
        let decision =
            select_strategy(DownloadMode::Auto, &d, 0, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(decision.reason, DecisionReason::SizeUnknown);
    }

    #[test]
    fn test_force_parallel_preconditions() {
        let no_range = descriptor(Some(GIB), false);
        assert!(matches!(
            select_strategy(DownloadMode::Parallel, &no_range, 0, DEFAULT_PARALLEL_THRESHOLD),
            Err(FetchError::RangeUnsupported { .. })
        ));

        let no_size = descriptor(None, true);
        assert!(matches!(
            select_strategy(DownloadMode::Parallel, &no_size, 0, DEFAULT_PARALLEL_THRESHOLD),
            Err(FetchError::SizeUnknown { .. })
        ));
    }

    #[test]
    fn test_force_parallel_ignores_threshold() {
        let d = descriptor(Some(1000), true);
        let decision =
            select_strategy(DownloadMode::Parallel, &d, 3, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(
            decision.strategy,
            Strategy::Parallel {
                workers: 3,
                total_size: 1000
            }
        );
        assert_eq!(decision.reason, DecisionReason::Forced);
    }

    #[test]
    fn test_force_single_ignores_probe() {
        let d = descriptor(Some(10 * GIB), true);
        let decision =
            select_strategy(DownloadMode::Single, &d, 8, DEFAULT_PARALLEL_THRESHOLD).unwrap();
        assert_eq!(decision.strategy, Strategy::Stream);
        assert_eq!(decision.reason, DecisionReason::Forced);
    }

    #[test]
    fn test_worker_count_override() {
        assert_eq!(worker_count(5 * GIB, 0), 12);
        assert_eq!(worker_count(5 * GIB, 1), 1);
        assert_eq!(worker_count(5 * GIB, 32), 32);
        // Out-of-range overrides fall back to scaling.
        assert_eq!(worker_count(5 * GIB, 33), 12);
    }

    #[test]
    fn test_decision_display() {
        let decision = Decision {
            strategy: Strategy::Parallel {
                workers: 4,
                total_size: 512 * MIB,
            },
            reason: DecisionReason::AboveThreshold,
        };
        assert_eq!(
            decision.to_string(),
            "parallel download (4 connections, 512.0 MiB)"
        );

        let decision = Decision {
            strategy: Strategy::Stream,
            reason: DecisionReason::BelowThreshold {
                threshold: 64 * MIB,
            },
        };
        assert!(decision.to_string().contains("below 64.0 MiB"));
    }
}
