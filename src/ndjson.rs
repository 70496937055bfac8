use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffered NDJSON writer that stages into `<final>.tmp` and promotes on `finish`.
/// An aborted run leaves the previous output (if any) untouched.
pub struct NdjsonWriter {
    tmp_path: PathBuf,
    final_path: PathBuf,
    w: BufWriter<File>,
    lines: u64,
}

impl NdjsonWriter {
    pub fn create(final_path: &Path, buf_bytes: usize) -> Result<Self> {
        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut tmp: OsString = final_path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp_path = PathBuf::from(tmp);
        let f = create_with_backoff(&tmp_path, 16, 50)
            .with_context(|| format!("create {}", tmp_path.display()))?;
        Ok(Self {
            tmp_path,
            final_path: final_path.to_path_buf(),
            w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f),
            lines: 0,
        })
    }

    /// Serialize `record` as one JSON line.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.w, record)?;
        self.w.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flush and atomically promote the staged file to the final path.
    pub fn finish(mut self) -> Result<()> {
        self.w.flush().with_context(|| format!("flush {}", self.tmp_path.display()))?;
        drop(self.w);
        replace_file_atomic_backoff(&self.tmp_path, &self.final_path)
    }
}
