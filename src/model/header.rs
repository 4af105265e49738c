//! Voltage-recorder ASCII header parsing.
//!
//! Data and weights files begin with a fixed-prefix, NUL-padded ASCII header
//! of whitespace-separated `KEY VALUE` lines. The prefix is mapped read-only
//! so a file never gets copied into the heap just to read a dozen keys.

use std::path::Path;

use memmap2::Mmap;

use crate::core::errors::{Result, SendError};

/// Default header prefix length, overridden by an `HDR_SIZE` key if present
/// and different.
pub const DEFAULT_HEADER_SIZE: usize = 4096;

/// An insertion-ordered key/value header, as parsed from a voltage-recorder
/// file prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    entries: Vec<(String, String)>,
}

impl Header {
    /// Look up a key's value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a key's value, returning a structured parse error if absent.
    pub fn require(&self, path: &Path, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| SendError::HeaderParse {
            path: path.to_path_buf(),
            details: format!("missing required key {key}"),
        })
    }

    /// Parse a required key as some `FromStr` type.
    pub fn require_parsed<T>(&self, path: &Path, key: &str) -> Result<T>
    where
        T: std::str::FromStr,
    {
        let raw = self.require(path, key)?;
        raw.parse().map_err(|_| SendError::HeaderParse {
            path: path.to_path_buf(),
            details: format!("key {key} has value {raw:?} that does not parse"),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and parses voltage-recorder file headers.
pub struct HeaderReader;

impl HeaderReader {
    /// Read and parse the header of `path`.
    ///
    /// Reads [`DEFAULT_HEADER_SIZE`] bytes first; if the parsed `HDR_SIZE` key
    /// names a different size, the header is re-read at that size (the
    /// original read may have truncated a long header).
    pub fn read(path: &Path) -> Result<Header> {
        let file = std::fs::File::open(path).map_err(|e| SendError::io(path, e))?;
        // Mapping is read-only and the file is never truncated concurrently by
        // this process; this is the one `unsafe` block in the crate.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SendError::io(path, e))?;

        let header = Self::parse(path, &mmap, DEFAULT_HEADER_SIZE)?;

        match header.get("HDR_SIZE") {
            Some(raw) => {
                let declared: usize = raw.parse().map_err(|_| SendError::HeaderParse {
                    path: path.to_path_buf(),
                    details: format!("HDR_SIZE value {raw:?} is not a valid size"),
                })?;
                if declared == DEFAULT_HEADER_SIZE {
                    Ok(header)
                } else {
                    Self::parse(path, &mmap, declared)
                }
            }
            None => Err(SendError::HeaderParse {
                path: path.to_path_buf(),
                details: "missing HDR_SIZE key".to_string(),
            }),
        }
    }

    fn parse(path: &Path, bytes: &[u8], size: usize) -> Result<Header> {
        let prefix = &bytes[..size.min(bytes.len())];
        let text = String::from_utf8_lossy(prefix);

        let mut entries = Vec::new();
        for raw_line in text.split('\n') {
            let line = raw_line.replace('\0', "");
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.splitn(2, char::is_whitespace);
            let key = parts.next().unwrap_or("").trim();
            let value = parts.next().unwrap_or("").trim();
            if key.is_empty() {
                return Err(SendError::HeaderParse {
                    path: path.to_path_buf(),
                    details: format!("malformed header line: {line:?}"),
                });
            }
            entries.push((key.to_string(), value.to_string()));
        }

        Ok(Header { entries })
    }
}
