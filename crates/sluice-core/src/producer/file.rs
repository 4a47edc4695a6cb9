//! File-backed producer: reads fixed-size chunks on demand.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::{exhausted, BodyProducer};

/// Reads `chunk_size` bytes per chunk (the last one may be shorter).
/// `has_more` reads the next chunk ahead so end-of-file is known before the pacer commits.
pub struct FileProducer<R = File> {
    reader: R,
    chunk_size: usize,
    pending: Option<Vec<u8>>,
    eof: bool,
}

impl FileProducer<File> {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("open body file: {}", path.display()))?;
        Ok(Self::from_reader(file, chunk_size))
    }
}

impl<R: Read> FileProducer<R> {
    pub fn from_reader(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            pending: None,
            eof: false,
        }
    }

    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

impl<R: Read + Send> BodyProducer for FileProducer<R> {
    fn has_more(&mut self) -> io::Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        let chunk = self.read_chunk()?;
        if chunk.is_empty() {
            self.eof = true;
            return Ok(false);
        }
        self.pending = Some(chunk);
        Ok(true)
    }

    fn take_next(&mut self) -> io::Result<Vec<u8>> {
        if !self.has_more()? {
            return Err(exhausted());
        }
        self.pending.take().ok_or_else(exhausted)
    }
}
