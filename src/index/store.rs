//! File-backed index store
//!
//! Blocking I/O. Async callers go through `tokio::task::spawn_blocking`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IndexError, IndexResult};

use super::codec::{default_codec, IndexCodec};
use super::format::{decode_lines, encode_lines};
use super::types::WorkIndex;

/// Reads and writes the whole index blob at one path
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
    codec: Option<Arc<dyn IndexCodec>>,
}

impl IndexStore {
    /// Create a store using this build's default codec
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            codec: default_codec(),
        }
    }

    /// Replace the codec (`None` leaves the store without one)
    pub fn codec(mut self, codec: Option<Arc<dyn IndexCodec>>) -> Self {
        self.codec = codec;
        self
    }

    /// Path of the index blob
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the blob on disk, if it exists
    pub fn size_on_disk(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Load the full index
    ///
    /// A missing file is an empty index and needs no codec.
    pub fn load(&self) -> IndexResult<WorkIndex> {
        let compressed = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(WorkIndex::new()),
            Err(source) => {
                return Err(IndexError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let codec = self.require_codec()?;
        let raw = codec
            .decompress(&compressed)
            .map_err(|e| self.codec_error(codec, e.to_string()))?;
        let text = String::from_utf8(raw)
            .map_err(|e| self.codec_error(codec, format!("index is not UTF-8: {}", e)))?;

        Ok(decode_lines(&text))
    }

    /// Overwrite the index with `index`
    ///
    /// Writes a sibling temp file and renames it into place, so readers see
    /// either the old or the new blob.
    pub fn save(&self, index: &WorkIndex) -> IndexResult<()> {
        let codec = self.require_codec()?;
        let compressed = codec
            .compress(encode_lines(index).as_bytes())
            .map_err(|e| self.codec_error(codec, e.to_string()))?;

        let write_err = |source| IndexError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = self.temp_path();
        let result = fs::File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(&compressed)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp_path, &self.path));

        if let Err(source) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(source));
        }

        Ok(())
    }

    fn require_codec(&self) -> IndexResult<&Arc<dyn IndexCodec>> {
        self.codec
            .as_ref()
            .ok_or_else(|| IndexError::CodecUnavailable {
                path: self.path.clone(),
            })
    }

    fn codec_error(&self, codec: &Arc<dyn IndexCodec>, reason: String) -> IndexError {
        IndexError::Codec {
            codec: codec.name(),
            path: self.path.clone(),
            reason,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        self.path
            .with_file_name(format!(".{}.tmp.{}", name, std::process::id()))
    }
}
