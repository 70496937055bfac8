use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use zstd::stream::read::Decoder;

use crate::config::PipelineOptions;
use crate::mem::maybe_throttle_low_memory;
use crate::util::open_with_backoff;

/// Fatal stream-level failures. Any of these ends the run.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unable to decode frame after reading {bytes} bytes")]
    WindowExceeded { bytes: usize },
    #[error("invalid UTF-8 sequence at decompressed offset {offset}")]
    InvalidUtf8 { offset: u64 },
    #[error("stream ended inside a multi-byte sequence ({bytes} undecoded bytes)")]
    TruncatedAtEof { bytes: usize },
    #[error("decompression failed: {0}")]
    Io(#[from] io::Error),
}

// ----------------------------- Helpers for full-error logging ------------------------------------

pub(crate) fn log_decode_failure(path: &Path, e: &FrameError) {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let msg = format!(
        "Aborting load after decode error\n  path : {}\n  error: {}\n\
         note : Rows committed before this point are kept; the in-flight batch was flushed. \
                This usually indicates a corrupt or truncated archive.",
        abs.display(),
        e
    );
    tracing::error!("{}", msg);
}

// ----------------------------- Counting ----------------------------------

/// A `Read` wrapper that counts compressed bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

// ----------------------------- Streaming ----------------------------------

/// Lazily yields `(line, bytes_consumed)` from a decompressed text stream.
///
/// Reads `chunk_bytes` at a time and decodes as much UTF-8 as is complete. A multi-byte
/// sequence cut by the chunk boundary is carried into the next read; if more than
/// `max_window_bytes` are read without anything becoming decodable, the stream fails
/// with [`FrameError::WindowExceeded`]. The trailing partial line is carried between
/// chunks, and at end-of-stream a final line without `\n` is dropped.
///
/// `bytes_consumed` is the compressed byte position when a counter is attached
/// (see [`open_archive`]), otherwise the decompressed byte count. After an error the
/// iterator is exhausted.
pub struct FrameLines<R: Read> {
    reader: R,
    chunk_bytes: usize,
    max_window_bytes: usize,
    text: String,
    pos: usize,
    undecoded: Vec<u8>,
    undecoded_read: usize,
    decompressed: u64,
    counter: Option<Arc<AtomicU64>>,
    throttle: bool,
    done: bool,
}

impl<R: Read> FrameLines<R> {
    pub fn new(reader: R, chunk_bytes: usize, max_window_bytes: usize) -> Self {
        Self {
            reader,
            chunk_bytes: chunk_bytes.max(1),
            max_window_bytes: max_window_bytes.max(1),
            text: String::new(),
            pos: 0,
            undecoded: Vec::new(),
            undecoded_read: 0,
            decompressed: 0,
            counter: None,
            throttle: false,
            done: false,
        }
    }

    fn with_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.counter = Some(counter);
        self
    }

    fn with_throttle(mut self, yes: bool) -> Self {
        self.throttle = yes;
        self
    }

    /// Progress position reported alongside each line.
    pub fn bytes_consumed(&self) -> u64 {
        match &self.counter {
            Some(c) => c.load(Ordering::Relaxed),
            None => self.decompressed,
        }
    }

    /// Read one chunk and append whatever decodes. `Ok(false)` on end-of-stream.
    fn fill(&mut self) -> Result<bool, FrameError> {
        let mut chunk = Vec::new();
        let n = (&mut self.reader)
            .take(self.chunk_bytes as u64)
            .read_to_end(&mut chunk)?;
        if self.throttle {
            maybe_throttle_low_memory(0.10);
        }

        if n == 0 {
            if !self.undecoded.is_empty() {
                return Err(FrameError::TruncatedAtEof { bytes: self.undecoded.len() });
            }
            let rest = self.text.len() - self.pos;
            if rest > 0 {
                tracing::debug!(bytes = rest, "dropping unterminated final line");
            }
            return Ok(false);
        }
        self.decompressed += n as u64;
        self.undecoded_read += n;

        let bytes = if self.undecoded.is_empty() {
            chunk
        } else {
            let mut b = std::mem::take(&mut self.undecoded);
            b.extend_from_slice(&chunk);
            b
        };

        match String::from_utf8(bytes) {
            Ok(s) => {
                self.undecoded_read = 0;
                self.append(&s);
            }
            Err(e) => {
                let err = e.utf8_error();
                let valid = err.valid_up_to();
                let mut bytes = e.into_bytes();
                if err.error_len().is_some() {
                    let offset = self.decompressed - (bytes.len() - valid) as u64;
                    return Err(FrameError::InvalidUtf8 { offset });
                }
                let tail = bytes.split_off(valid);
                if valid == 0 {
                    if self.undecoded_read > self.max_window_bytes {
                        return Err(FrameError::WindowExceeded { bytes: self.undecoded_read });
                    }
                } else {
                    let head = String::from_utf8(bytes)
                        .map_err(|_| FrameError::InvalidUtf8 { offset: self.decompressed })?;
                    self.append(&head);
                    self.undecoded_read = tail.len();
                }
                self.undecoded = tail;
            }
        }
        Ok(true)
    }

    fn append(&mut self, s: &str) {
        if self.pos >= self.text.len() {
            self.text.clear();
            self.text.push_str(s);
        } else {
            let mut next = String::with_capacity(self.text.len() - self.pos + s.len());
            next.push_str(&self.text[self.pos..]);
            next.push_str(s);
            self.text = next;
        }
        self.pos = 0;
    }
}

impl<R: Read> Iterator for FrameLines<R> {
    type Item = Result<(String, u64), FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(rel) = self.text[self.pos..].find('\n') {
                let end = self.pos + rel;
                let mut line = &self.text[self.pos..end];
                if let Some(stripped) = line.strip_suffix('\r') {
                    line = stripped;
                }
                let line = line.to_owned();
                self.pos = end + 1;
                return Some(Ok((line, self.bytes_consumed())));
            }
            match self.fill() {
                Ok(true) => continue,
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Open a zstd archive for line streaming. Returns the line iterator and the archive's
/// on-disk size (the denominator for percent-complete).
///
/// We request `window_log_max` up front to avoid "Frame requires too much memory"
/// on very large frames.
pub fn open_archive(path: &Path, opts: &PipelineOptions) -> Result<(FrameLines<Box<dyn Read>>, u64)> {
    let file = open_with_backoff(path, 16, 50)
        .with_context(|| format!("open {}", path.display()))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);
    let counter = Arc::new(AtomicU64::new(0));
    let cnt = CountingReader { inner: file, counter: counter.clone() };

    let mut decoder = Decoder::new(cnt)?;
    decoder.window_log_max(opts.window_log_max)?;
    let reader: Box<dyn Read> = Box::new(decoder);

    let lines = FrameLines::new(reader, opts.chunk_bytes, opts.max_window_bytes)
        .with_counter(counter)
        .with_throttle(true);
    Ok((lines, total))
}
