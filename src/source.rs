//! Sources of raw bytes, such as files or HTTP servers.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Errors reported when fetching a buffer.
#[derive(Debug)]
pub enum FetchError {
    /// Reading from the file system failed.
    Io(std::io::Error),

    /// The HTTP request could not be completed.
    #[cfg(feature = "http")]
    Http(reqwest::Error),

    /// The server responded with a non-success status code.
    Status { url: String, status: u16 },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Io(e) => write!(f, "failed to read file: {}", e),
            #[cfg(feature = "http")]
            FetchError::Http(e) => write!(f, "request failed: {}", e),
            FetchError::Status { url, status } => {
                write!(f, "request for {} failed with status {}", url, status)
            }
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Io(e) => Some(e),
            #[cfg(feature = "http")]
            FetchError::Http(e) => Some(e),
            FetchError::Status { .. } => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

/// Provides the contents of a resource identified by a URL or path.
///
/// The host application chooses an implementation once, at startup, and
/// passes it to functions that need to load data.
pub trait ByteSource {
    /// Fetch the complete contents of `url`.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_bytes(url)
    }
}

/// Reads resources from the local file system.
#[derive(Clone, Debug, Default)]
pub struct FileSource {
    base_dir: Option<PathBuf>,
}

impl FileSource {
    /// Create a source which resolves relative paths against the current
    /// directory.
    pub fn new() -> FileSource {
        FileSource { base_dir: None }
    }

    /// Create a source which resolves relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> FileSource {
        FileSource {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }
}

impl ByteSource for FileSource {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(std::fs::read(self.resolve(url))?)
    }
}

/// Fetches resources over HTTP(S) using a blocking client.
#[cfg(feature = "http")]
#[derive(Clone, Debug, Default)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new() -> HttpSource {
        HttpSource {
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[cfg(feature = "http")]
impl ByteSource for HttpSource {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Return true if `url` should be fetched over the network rather than read
/// from the file system.
pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Fetch `url` and decode its contents as UTF-8 text.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn fetch_text(source: &dyn ByteSource, url: &str) -> Result<String, FetchError> {
    let bytes = source.fetch_bytes(url)?;
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
}
