// ── Record writer ──
//
// Owns the two stream files. Each stream has its own lock; a record is
// rendered to a complete line first and written with a single call, then
// flushed before the lock is released.

use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::CoreError;
use crate::model::{FlowStatRecord, PortStatRecord, RecordStream};

/// One append-only stream file.
struct StreamFile {
    stream: RecordStream,
    path: PathBuf,
    file: Mutex<File>,
}

impl StreamFile {
    /// Create or truncate `path` and write the stream header.
    fn create(stream: RecordStream, path: &Path) -> Result<Self, CoreError> {
        let storage = |source| CoreError::Storage {
            stream: stream.into(),
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(storage)?;
        writeln!(file, "{}", stream.header()).map_err(storage)?;
        file.flush().map_err(storage)?;

        debug!(stream = %stream, path = %path.display(), "initialized record stream");
        Ok(Self {
            stream,
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    fn append(&self, record: &impl Display) -> Result<(), CoreError> {
        let line = format!("{record}\n");
        // A poisoned lock only means another writer panicked mid-call;
        // every write is a whole line, so the file itself is still sound.
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| CoreError::Storage {
                stream: self.stream.into(),
                path: self.path.clone(),
                source,
            })
    }
}

/// Append-only writer for the flow and port record streams.
///
/// Writes to the same stream are serialized; writes to different streams
/// proceed independently.
pub struct RecordWriter {
    flow: StreamFile,
    port: StreamFile,
}

impl RecordWriter {
    /// Open both streams, truncating any previous content, and write
    /// their headers. Running this again on the same paths resets both
    /// files to just the header line.
    pub fn create(
        flow_path: impl AsRef<Path>,
        port_path: impl AsRef<Path>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            flow: StreamFile::create(RecordStream::Flow, flow_path.as_ref())?,
            port: StreamFile::create(RecordStream::Port, port_path.as_ref())?,
        })
    }

    /// Append one record to the flow stream. Flushed before returning.
    pub fn append_flow(&self, record: &FlowStatRecord) -> Result<(), CoreError> {
        self.flow.append(record)
    }

    /// Append one record to the port stream. Flushed before returning.
    pub fn append_port(&self, record: &PortStatRecord) -> Result<(), CoreError> {
        self.port.append(record)
    }

    pub fn path(&self, stream: RecordStream) -> &Path {
        match stream {
            RecordStream::Flow => &self.flow.path,
            RecordStream::Port => &self.port.path,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl RecordWriter {
    /// Streams under `dir` whose port file handle is read-only, so every
    /// port append fails after a successful create.
    pub(crate) fn with_read_only_port(dir: &Path) -> Self {
        let mut writer = Self::create(dir.join("flow.csv"), dir.join("port.csv")).unwrap();
        writer.port.file = Mutex::new(File::open(&writer.port.path).unwrap());
        writer
    }
}
