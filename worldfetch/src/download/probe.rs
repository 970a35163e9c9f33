//! Server capability discovery.
//!
//! A `GET` with `Range: bytes=0-0` is used instead of `HEAD` because signed
//! object-storage URLs are usually valid for a single verb only.

use std::io::{self, Read};

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use tracing::debug;

/// Upper bound on body bytes read and discarded after probing.
const PROBE_DRAIN_LIMIT: u64 = 1024;

/// What the server told us about the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    /// The download URL that was probed.
    pub url: String,
    /// Total size in bytes, when discoverable.
    pub total_size: Option<u64>,
    /// Whether the server answers byte-range requests with 206.
    pub range_supported: bool,
}

impl TransferDescriptor {
    /// Descriptor for a server we know nothing about.
    pub fn unknown(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            total_size: None,
            range_supported: false,
        }
    }
}

/// Probe `url` for range support and total size.
///
/// Never fails: transport errors, unexpected statuses and unusable headers
/// all degrade to [`TransferDescriptor::unknown`].
pub fn probe(client: &Client, url: &str) -> TransferDescriptor {
    let mut response = match client.get(url).header(RANGE, "bytes=0-0").send() {
        Ok(response) => response,
        Err(e) => {
            debug!(url, error = %e, "Probe request failed");
            return TransferDescriptor::unknown(url);
        }
    };

    let status = response.status();
    let content_range = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());

    // The server may have ignored the range and started the full payload.
    let _ = io::copy(
        &mut (&mut response).take(PROBE_DRAIN_LIMIT),
        &mut io::sink(),
    );

    let descriptor = match status {
        StatusCode::PARTIAL_CONTENT => {
            match content_range.as_deref().and_then(parse_content_range) {
                Some(total) if total > 0 => TransferDescriptor {
                    url: url.to_string(),
                    total_size: Some(total),
                    range_supported: true,
                },
                _ => TransferDescriptor::unknown(url),
            }
        }
        StatusCode::OK => TransferDescriptor {
            url: url.to_string(),
            total_size: content_length.filter(|&len| len > 0),
            range_supported: false,
        },
        _ => TransferDescriptor::unknown(url),
    };

    debug!(
        url,
        status = status.as_u16(),
        total_size = ?descriptor.total_size,
        range_supported = descriptor.range_supported,
        "Probe complete"
    );
    descriptor
}

/// Extract the total size from a `Content-Range` value (`bytes X-Y/TOTAL`).
///
/// Returns `None` when the total is missing, `*`, or not a number.
pub fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    let total = total.trim();
    if total.is_empty() || total == "*" {
        return None;
    }
    total.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_content_range_valid() {
        assert_eq!(parse_content_range("bytes 0-0/1048576"), Some(1_048_576));
        assert_eq!(parse_content_range("bytes 0-0/123456789"), Some(123_456_789));
    }

    #[test]
    fn test_parse_content_range_unbounded_total() {
        assert_eq!(parse_content_range("bytes 0-0/*"), None);
    }

    #[test]
    fn test_parse_content_range_malformed() {
        assert_eq!(parse_content_range(""), None);
        assert_eq!(parse_content_range("bytes 0-0"), None);
        assert_eq!(parse_content_range("bytes 0-0/"), None);
        assert_eq!(parse_content_range("bytes 0-0/abc"), None);
        assert_eq!(parse_content_range("bytes 0-0/-5"), None);
    }

    #[test]
    fn test_unknown_descriptor() {
        let descriptor = TransferDescriptor::unknown("http://example.com/a.tar.gz");
        assert_eq!(descriptor.total_size, None);
        assert!(!descriptor.range_supported);
    }

    #[test]
    fn test_probe_unreachable_host_degrades() {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        // Port 9 (discard) on localhost is almost never listening.
        let descriptor = probe(&client, "http://127.0.0.1:9/backup.tar.gz");
        assert_eq!(
            descriptor,
            TransferDescriptor::unknown("http://127.0.0.1:9/backup.tar.gz")
        );
    }

    proptest! {
        #[test]
        fn test_parse_content_range_roundtrip(
            start in 0u64..1_000_000,
            len in 0u64..1_000_000,
            total in 0u64..u64::MAX,
        ) {
            let header = format!("bytes {}-{}/{}", start, start + len, total);
            prop_assert_eq!(parse_content_range(&header), Some(total));
        }

        #[test]
        fn test_parse_content_range_garbage_total(total in "[a-zA-Z*]{1,8}") {
            let header = format!("bytes 0-0/{}", total);
            prop_assert_eq!(parse_content_range(&header), None);
        }
    }
}
