//! HTTP plumbing shared by the probe, the chunk workers and the streaming path.

use std::fs::File;
use std::io;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use crate::error::{FetchError, FetchResult};

/// Build a blocking client whose every request carries `timeout`.
///
/// The timeout covers the whole exchange including the body, so each probe,
/// chunk fetch and stream fetch has an independent deadline.
pub fn build_client(timeout: Duration) -> FetchResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FetchError::InvalidConfig(format!("failed to create HTTP client: {}", e)))
}

/// Open a single full-content stream for `url`.
///
/// Anything other than `200 OK` is rejected.
pub fn open_stream(client: &Client, url: &str, timeout: Duration) -> FetchResult<Response> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| FetchError::from_reqwest(url, timeout.as_secs(), e))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::UnexpectedStatus {
            url: url.to_string(),
            expected: StatusCode::OK.as_u16(),
            actual: status.as_u16(),
        });
    }

    Ok(response)
}

/// Write all of `buf` at `offset` without touching the shared file cursor.
#[cfg(unix)]
pub(crate) fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

/// Write all of `buf` at `offset` without touching the shared file cursor.
#[cfg(windows)]
pub(crate) fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempfile;

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_write_all_at_disjoint_offsets() {
        let file = tempfile().unwrap();
        file.set_len(10).unwrap();

        write_all_at(&file, b"world", 5).unwrap();
        write_all_at(&file, b"hello", 0).unwrap();

        let mut content = String::new();
        (&file).read_to_string(&mut content).unwrap();
        assert_eq!(content, "helloworld");
    }

    #[test]
    fn test_open_stream_unreachable() {
        let client = build_client(Duration::from_secs(2)).unwrap();
        let result = open_stream(
            &client,
            "http://127.0.0.1:9/backup.tar.gz",
            Duration::from_secs(2),
        );
        assert!(matches!(
            result,
            Err(FetchError::DownloadFailed { .. }) | Err(FetchError::Timeout { .. })
        ));
    }
}
