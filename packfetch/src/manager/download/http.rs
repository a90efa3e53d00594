//! HTTP transfer client.
//!
//! This module provides the byte-level transfer used for both catalog calls
//! and file downloads:
//! - A single GET per fetch, carrying a fixed identification header
//! - Cancellation that takes effect even while a request is stalled
//! - The skip-if-present download contract built on top of `fetch`
//!
//! The blocking request runs on a worker thread. The caller waits on the
//! worker and the cancellation token together, so an interrupted fetch
//! returns at once and the abandoned worker ends at its own timeout.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::header::ETAG;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::checksum::{digest_bytes, validate};
use super::error::{TransferError, TransferResult};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading response bodies (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound on the body buffer reserved up front from `Content-Length`.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Timeout for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How often a waiting fetch looks at the cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Suffix of the file a body is written to before it is renamed into place.
const PART_SUFFIX: &str = ".part";

/// Bytes returned by a successful fetch.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Full response body.
    pub bytes: Bytes,
    /// Entity tag reported by the server, without surrounding quotes.
    pub etag: Option<String>,
}

impl Fetched {
    /// Create a fetch result without transport metadata.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            etag: None,
        }
    }
}

/// Result of [`Transport::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Location of the file on disk.
    pub path: PathBuf,
    /// File name derived from the URL.
    pub file_name: String,
    /// Whether new bytes were fetched during this call.
    pub fresh: bool,
    /// Digest of the freshly fetched bytes. `None` when the existing file
    /// was accepted without a network call.
    pub digest: Option<String>,
}

/// Byte transport used by the acquisition engine.
///
/// Implementations must surface network failures as recoverable
/// [`TransferError`]s and must return [`TransferError::Cancelled`] once the
/// token is cancelled.
pub trait Transport: Send + Sync {
    /// Fetch the full body at `url`.
    fn fetch(&self, url: &str, cancel: &CancellationToken) -> TransferResult<Fetched>;

    /// Download `url` into `dest_dir`, skipping the network when possible.
    ///
    /// The file name is the final path segment of the URL. Unless `force` is
    /// set, an existing file is accepted as-is when `expected_digest` is
    /// absent or when the file validates against it. Otherwise the body is
    /// fetched, written to `<name>.part` and renamed over any existing file,
    /// so the final path never holds a partial body. Digest bookkeeping is
    /// left to the caller.
    fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        force: bool,
        expected_digest: Option<&str>,
        cancel: &CancellationToken,
    ) -> TransferResult<Downloaded> {
        let file_name =
            file_name_from_url(url).ok_or_else(|| TransferError::InvalidUrl(url.to_string()))?;
        let path = dest_dir.join(&file_name);

        let satisfied = path.is_file()
            && match expected_digest {
                None => true,
                Some(expected) => validate(&path, Some(expected)),
            };
        if !force && satisfied {
            debug!(path = %path.display(), "File already present, skipping transfer");
            return Ok(Downloaded {
                path,
                file_name,
                fresh: false,
                digest: None,
            });
        }

        let fetched = self.fetch(url, cancel)?;

        fs::create_dir_all(dest_dir).map_err(|e| TransferError::Write {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;
        let part_path = dest_dir.join(format!("{}{}", file_name, PART_SUFFIX));
        if let Err(e) = fs::write(&part_path, &fetched.bytes) {
            let _ = fs::remove_file(&part_path);
            return Err(TransferError::Write {
                path: part_path,
                source: e,
            });
        }
        fs::rename(&part_path, &path).map_err(|e| TransferError::Write {
            path: path.clone(),
            source: e,
        })?;

        let digest = digest_bytes(&fetched.bytes);
        debug!(
            path = %path.display(),
            bytes = fetched.bytes.len(),
            etag = fetched.etag.as_deref().unwrap_or("-"),
            digest = %digest,
            "Wrote fetched file"
        );

        Ok(Downloaded {
            path,
            file_name,
            fresh: true,
            digest: Some(digest),
        })
    }
}

/// Derive a local file name from the final path segment of a URL.
///
/// Query strings and fragments are ignored. Returns `None` when the URL ends
/// in `/` or the segment would escape the destination directory.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    let name = without_query.rsplit('/').next()?;

    match name {
        "" | "." | ".." => None,
        _ if name.contains('\\') => None,
        _ => Some(name.to_string()),
    }
}

/// HTTP transport backed by a blocking `reqwest` client.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    pub(crate) timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    ///
    /// `user_agent` is sent with every request.
    pub fn new(user_agent: &str) -> TransferResult<Self> {
        Self::with_timeout(user_agent, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(user_agent: &str, timeout: Duration) -> TransferResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransferError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Request timeout applied to every fetch.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, cancel: &CancellationToken) -> TransferResult<Fetched> {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        let timeout = self.timeout;
        let worker_url = url.to_string();
        let worker_cancel = cancel.clone();

        thread::Builder::new()
            .name("packfetch-fetch".to_string())
            .spawn(move || {
                let result = fetch_blocking(&client, &worker_url, timeout, &worker_cancel);
                let _ = tx.send(result);
            })
            .map_err(|e| TransferError::Request {
                url: url.to_string(),
                reason: format!("failed to start fetch worker: {}", e),
            })?;

        loop {
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        debug!(url, "Fetch abandoned on cancellation");
                        return Err(TransferError::Cancelled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransferError::Request {
                        url: url.to_string(),
                        reason: "fetch worker exited without a result".to_string(),
                    });
                }
            }
        }
    }
}

/// Perform one GET on the calling thread.
fn fetch_blocking(
    client: &Client,
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> TransferResult<Fetched> {
    debug!(url, "GET");
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| request_error(url, timeout, cancel, e))?;

    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let etag = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim_start_matches("W/").trim_matches('"').to_string());

    let capacity = response.content_length().unwrap_or(0).min(MAX_PREALLOC) as usize;
    let mut body = Vec::with_capacity(capacity);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let bytes_read = match response.read(&mut buffer) {
            Ok(n) => n,
            Err(_) if cancel.is_cancelled() => return Err(TransferError::Cancelled),
            Err(e) => {
                return Err(TransferError::Request {
                    url: url.to_string(),
                    reason: format!("Read error: {}", e),
                })
            }
        };

        if bytes_read == 0 {
            break;
        }

        body.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(Fetched {
        bytes: Bytes::from(body),
        etag,
    })
}

/// Classify a failed request. A failure observed after cancellation is the
/// cancellation, whatever the client reports.
fn request_error(
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    error: reqwest::Error,
) -> TransferError {
    if cancel.is_cancelled() {
        TransferError::Cancelled
    } else if error.is_timeout() {
        TransferError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        TransferError::Request {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
