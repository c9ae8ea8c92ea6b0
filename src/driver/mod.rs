// src/driver/mod.rs
pub mod report;

use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::extractors::{self, ExtractionEngine};
use crate::fetch::{Fetcher, RenderedPage};
use crate::storage::{ResumableStore, ResumeState, Schema, StoreRow};
use crate::utils::html_debug;
use crate::utils::AppError;

pub use report::{Progress, RunOutcome, RunReport, FULL_KEY_SPACE};

pub const DEFAULT_START_KEY: u64 = 1;
pub const DEFAULT_END_KEY: u64 = FULL_KEY_SPACE;
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;
pub const DEFAULT_RANGE_BATCH_SIZE: u64 = 100;
pub const DEFAULT_OUTPUT: &str = "clubs_france.csv";

// Found clubs announced at info level per window; the rest go to debug
const ANNOUNCED_PER_WINDOW: usize = 3;

/// Parameters of one run over the key space.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub start_key: Option<u64>, // None: resume after the highest key in the output
    pub end_key: u64,
    pub batch_size: u64,
    pub output: PathBuf,
    pub base_url: String,
    pub debug_dir: Option<PathBuf>,
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::Config("Batch size must be at least 1".to_string()));
        }
        if let Some(start) = self.start_key {
            if start > self.end_key {
                return Err(AppError::Config(format!(
                    "Start key {} is after end key {}",
                    start, self.end_key
                )));
            }
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!("Base URL must be http(s): {}", self.base_url)));
        }
        if self.output.as_os_str().is_empty() {
            return Err(AppError::Config("Output path is empty".to_string()));
        }
        Ok(())
    }
}

/// How results reach the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Resume after the last key; append one line per new key.
    Append,
    /// Re-scrape every key in range; rewrite the whole file sorted by key.
    OverwriteByKey,
}

impl PersistMode {
    fn schema(self) -> Schema {
        match self {
            PersistMode::Append => Schema::Compact,
            PersistMode::OverwriteByKey => Schema::Timed,
        }
    }
}

/// Walks a key range window by window: fetch, extract, persist, one key at a time.
pub struct BatchDriver<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    engine: ExtractionEngine,
    store: ResumableStore,
    config: ScanConfig,
    mode: PersistMode,
}

impl<'a, F: Fetcher + ?Sized> BatchDriver<'a, F> {
    pub fn new(fetcher: &'a F, config: ScanConfig, mode: PersistMode) -> Result<Self, AppError> {
        config.validate()?;
        let store = ResumableStore::new(&config.output)?;
        Ok(Self { fetcher, engine: ExtractionEngine::new(), store, config, mode })
    }

    /// Runs until the end key or until `cancel` fires.
    ///
    /// A cancelled key is dropped, not recorded. Everything processed before
    /// it is on disk when this returns.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport, AppError> {
        let started = Instant::now();
        let mut state = self.store.load()?;
        let end_key = self.config.end_key;
        let mut processed = Vec::new();

        let first_key = match self.first_key(&mut state)? {
            Some(first_key) if first_key <= end_key => first_key,
            _ => {
                tracing::info!(
                    "Nothing left to scan, output already reaches scl {}",
                    state.last_key().unwrap_or(end_key)
                );
                return Ok(RunReport::new(RunOutcome::Completed, &state, &processed, started.elapsed()));
            }
        };

        tracing::info!(
            "Scanning scl {} to {} into {} ({:?})",
            first_key,
            end_key,
            self.store.path().display(),
            self.mode
        );

        let mut writer = match self.mode {
            PersistMode::Append => {
                let writer = self.store.appender(self.mode.schema())?;
                tracing::debug!("Appending rows in {:?} layout", writer.schema());
                Some(writer)
            }
            PersistMode::OverwriteByKey => None,
        };
        let mut progress = Progress::new((end_key - first_key).saturating_add(1));
        let mut outcome = RunOutcome::Completed;
        let step = usize::try_from(self.config.batch_size).unwrap_or(usize::MAX);

        'windows: for window_start in (first_key..=end_key).step_by(step) {
            let window_end = window_start.saturating_add(self.config.batch_size - 1).min(end_key);
            let window_started = Instant::now();
            let mut window_found = 0usize;
            let window_len = (window_end - window_start).saturating_add(1);
            tracing::info!("Window {}-{} ({} keys)", window_start, window_end, window_len);

            for key in window_start..=window_end {
                if self.mode == PersistMode::Append && state.contains(key) {
                    continue;
                }

                let row = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    row = self.process_key(key) => Some(row),
                };
                let Some(row) = row else {
                    tracing::warn!("Interrupted at scl={}, saved up to scl={}", key, key.saturating_sub(1));
                    outcome = RunOutcome::Interrupted;
                    break 'windows;
                };

                if row.is_found() {
                    window_found += 1;
                    if window_found <= ANNOUNCED_PER_WINDOW {
                        tracing::info!("scl={}: {}", key, row.name);
                    } else {
                        tracing::debug!("scl={}: {}", key, row.name);
                    }
                }

                if let Some(writer) = writer.as_mut() {
                    writer.append(&row)?;
                }
                state.insert(row);
                processed.push(key);
            }

            progress.advance(window_len);
            if self.mode == PersistMode::OverwriteByKey {
                self.store.rewrite(&state, self.mode.schema())?;
            }
            progress.log_window(window_found, window_started.elapsed(), state.found_count(), started.elapsed());
        }

        if self.mode == PersistMode::OverwriteByKey {
            self.store.rewrite(&state, self.mode.schema())?;
        }

        let report = RunReport::new(outcome, &state, &processed, started.elapsed());
        report.log();
        tracing::info!("Output saved to {}", self.store.path().display());
        Ok(report)
    }

    /// Resolves where the scan starts and prepares the state for it.
    /// `None` when the output already holds the last possible key.
    fn first_key(&self, state: &mut ResumeState) -> Result<Option<u64>, AppError> {
        match (self.mode, self.config.start_key) {
            (PersistMode::Append, Some(start)) => {
                if !state.is_empty() {
                    tracing::info!(
                        "Explicit start at scl={}, replacing {} existing rows",
                        start,
                        state.len()
                    );
                }
                *state = ResumeState::with_layout(self.mode.schema());
                self.store.start_fresh(self.mode.schema())?;
                Ok(Some(start))
            }
            (PersistMode::Append, None) => {
                if state.is_empty() {
                    return Ok(Some(DEFAULT_START_KEY));
                }
                let resume = state.resume_key();
                if let Some(resume) = resume {
                    tracing::info!("{} keys already processed, resuming at scl={}", state.len(), resume);
                }
                Ok(resume)
            }
            (PersistMode::OverwriteByKey, start) => Ok(Some(start.unwrap_or(DEFAULT_START_KEY))),
        }
    }

    /// Fetches and extracts one key. Any failure is a confirmed-absent row.
    async fn process_key(&self, key: u64) -> StoreRow {
        let started = Instant::now();

        let page = match self.fetcher.fetch(key, &self.config.base_url).await {
            Ok(page) => page,
            Err(e) => {
                // Timeouts are what most invalid keys look like
                if !e.is_timeout() {
                    tracing::warn!("Fetch failed for scl={}: {}", key, e);
                }
                return StoreRow::absent(key, Some(started.elapsed().as_secs_f64()));
            }
        };

        match self.engine.extract(&page) {
            Ok(mut record) => {
                record.extraction_seconds = Some(started.elapsed().as_secs_f64());
                self.save_debug_markup(&page);
                StoreRow::from(&record)
            }
            Err(reason) => {
                tracing::trace!("scl={}: {}", key, reason);
                StoreRow::absent(key, Some(started.elapsed().as_secs_f64()))
            }
        }
    }

    fn save_debug_markup(&self, page: &RenderedPage) {
        let Some(dir) = &self.config.debug_dir else {
            return;
        };
        let path = dir.join(format!("{}.html", page.key));
        if let Err(e) = html_debug::create_debug_html(&page.markup, &path, &extractors::debug_patterns()) {
            tracing::warn!("Failed to create debug HTML for scl={}: {}", page.key, e);
        }
    }
}
