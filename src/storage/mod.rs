// src/storage/mod.rs
pub mod row;

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use crate::utils::error::StorageError;

pub use row::{ResumeState, Schema, StoreRow};
use row::RawRow;

/// Handle on the output CSV of one run.
///
/// The file is read once (`load`) and afterwards only written: appended to in
/// scan mode, or replaced whole through a temp file in range mode.
pub struct ResumableStore {
    path: PathBuf,
}

impl ResumableStore {
    /// Creates a store for `path`, creating its parent directory if needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every processed key from the existing output.
    ///
    /// A missing or empty file is an empty state. A file that cannot be read
    /// as our CSV is moved to `<output>.corrupt` and also yields an empty
    /// state; only failing to move it aside is an error.
    pub fn load(&self) -> Result<ResumeState, StorageError> {
        if !self.path.exists() {
            return Ok(ResumeState::default());
        }

        match read_output(&self.path) {
            Ok(state) => {
                tracing::info!(
                    "Loaded {} processed keys ({} found) from {}",
                    state.len(),
                    state.found_count(),
                    self.path.display()
                );
                Ok(state)
            }
            Err(e) => {
                let moved_to = sibling(&self.path, ".corrupt");
                tracing::warn!(
                    "Existing output is unreadable ({}); moving it to {} and starting empty",
                    e,
                    moved_to.display()
                );
                fs::rename(&self.path, &moved_to).map_err(|e| StorageError::io(&self.path, e))?;
                Ok(ResumeState::default())
            }
        }
    }

    /// Replaces the output with a header-only file.
    pub fn start_fresh(&self, schema: Schema) -> Result<(), StorageError> {
        self.rewrite(&ResumeState::with_layout(schema), schema)
    }

    /// Opens the output for appending rows.
    ///
    /// An existing file keeps its own column layout; `schema` is only used when
    /// the file is new or empty. A last record torn by a crash (no line
    /// terminator, possibly inside an open quote) is cut off so the next row
    /// starts on a record boundary.
    pub fn appender(&self, schema: Schema) -> Result<AppendWriter, StorageError> {
        let existing = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() > 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let scan = if existing { Some(scan_output(&self.path)?) } else { None };
        let schema = scan
            .as_ref()
            .and_then(|scan| scan.state.layout())
            .unwrap_or(schema);

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;

        if let Some(torn_at) = scan.and_then(|scan| scan.torn_tail) {
            tracing::debug!("Cutting torn last record of {} at byte {}", self.path.display(), torn_at);
            file.set_len(torn_at).map_err(|e| StorageError::io(&self.path, e))?;
        }

        let len = file.metadata().map_err(|e| StorageError::io(&self.path, e))?.len();
        if len == 0 {
            let header = encode_line(&self.path, schema.headers())?;
            file.write_all(&header).map_err(|e| StorageError::io(&self.path, e))?;
        } else if !ends_with_newline(&mut file).map_err(|e| StorageError::io(&self.path, e))? {
            file.write_all(b"\n").map_err(|e| StorageError::io(&self.path, e))?;
        }

        Ok(AppendWriter { path: self.path.clone(), file, schema })
    }

    /// Rewrites the whole output from `state`, sorted by key.
    ///
    /// The rows go to `<output>.tmp` first, which then replaces the output, so
    /// a reader sees either the old file or the new one.
    pub fn rewrite(&self, state: &ResumeState, schema: Schema) -> Result<(), StorageError> {
        let tmp = sibling(&self.path, ".tmp");

        let file = File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(schema.headers()).map_err(|e| StorageError::csv(&tmp, e))?;
        for row in state.rows() {
            writer.write_record(row.fields(schema)).map_err(|e| StorageError::csv(&tmp, e))?;
        }
        let file = writer.into_inner().map_err(|e| StorageError::io(&tmp, e.into_error()))?;
        file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        tracing::debug!("Rewrote {} with {} rows", self.path.display(), state.len());
        Ok(())
    }
}

/// Appends complete rows to an output file, one flushed line per key.
pub struct AppendWriter {
    path: PathBuf,
    file: File,
    schema: Schema,
}

impl AppendWriter {
    /// Layout the rows are written in.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn append(&mut self, row: &StoreRow) -> Result<(), StorageError> {
        let line = encode_line(&self.path, row.fields(self.schema))?;
        self.file.write_all(&line).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.flush().map_err(|e| StorageError::io(&self.path, e))?;
        self.file.sync_data().map_err(|e| StorageError::io(&self.path, e))
    }
}

/// Unions several outputs by key into one sorted, timed output.
///
/// Later inputs win on a key present in several of them. Inputs that cannot be
/// read are skipped with a warning. Returns the number of rows written.
pub fn merge_outputs<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<usize, StorageError> {
    let mut merged = ResumeState::default();

    for input in inputs {
        let input = input.as_ref();
        match read_output(input) {
            Ok(state) => {
                tracing::info!("Merging {} rows from {}", state.len(), input.display());
                merged.merge(state);
            }
            Err(e) => tracing::warn!("Skipping {}: {}", input.display(), e),
        }
    }

    ResumableStore::new(output)?.rewrite(&merged, Schema::Timed)?;
    tracing::info!(
        "Merged {} inputs into {} ({} keys, {} found)",
        inputs.len(),
        output.display(),
        merged.len(),
        merged.found_count()
    );
    Ok(merged.len())
}

/// Parses an output file into a state, by header name.
fn read_output(path: &Path) -> Result<ResumeState, StorageError> {
    scan_output(path).map(|scan| scan.state)
}

/// What a pass over an output file found.
struct OutputScan {
    state: ResumeState,
    torn_tail: Option<u64>, // Byte offset where an unterminated last record starts
}

/// Reads every complete record of an output file.
///
/// Records whose field count differs from the header and records without a
/// numeric key are skipped. The last record only counts if the file ends with
/// a line terminator; otherwise a crash cut it and its start is reported.
fn scan_output(path: &Path) -> Result<OutputScan, StorageError> {
    let terminated = File::open(path)
        .and_then(|mut file| ends_with_newline(&mut file))
        .map_err(|e| StorageError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| StorageError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| StorageError::csv(path, e))?.clone();
    if headers.is_empty() {
        return Ok(OutputScan { state: ResumeState::default(), torn_tail: None });
    }
    if !headers.iter().any(|h| h == "scl") {
        return Err(StorageError::Malformed {
            path: path.to_path_buf(),
            reason: "no scl column in header".to_string(),
        });
    }

    let mut state = ResumeState::with_layout(Schema::from_headers(&headers));
    let mut skipped = 0usize;
    // Held back one step: the last record is only kept once the file is known to be terminated
    let mut pending: Option<(u64, Option<StoreRow>)> = None;

    for result in reader.records() {
        let record = result.map_err(|e| StorageError::csv(path, e))?;
        let start = record.position().map(|pos| pos.byte()).unwrap_or(0);

        let row = if record.len() == headers.len() {
            let raw: RawRow = record
                .deserialize(Some(&headers))
                .map_err(|e| StorageError::csv(path, e))?;
            raw.into_row()
        } else {
            None
        };

        if let Some((_, previous)) = pending.replace((start, row)) {
            match previous {
                Some(row) => {
                    state.insert(row);
                }
                None => skipped += 1,
            }
        }
    }

    let mut torn_tail = None;
    match pending {
        Some((start, _)) if !terminated => torn_tail = Some(start),
        Some((_, Some(row))) => {
            state.insert(row);
        }
        // Short last record, possibly still inside an open quote
        Some((start, None)) => torn_tail = Some(start),
        // The header line itself was cut
        None if !terminated => {
            state = ResumeState::default();
            torn_tail = Some(0);
        }
        None => {}
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} incomplete rows in {}", skipped, path.display());
    }
    if torn_tail.is_some() {
        tracing::warn!("Last record of {} is torn and will be scanned again", path.display());
    }

    Ok(OutputScan { state, torn_tail })
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// One CSV line, quoted as needed and newline-terminated.
fn encode_line<I, T>(path: &Path, fields: I) -> Result<Vec<u8>, StorageError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields).map_err(|e| StorageError::csv(path, e))?;
    writer.into_inner().map_err(|e| StorageError::io(path, e.into_error()))
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(suffix);
    path.with_file_name(name)
}
