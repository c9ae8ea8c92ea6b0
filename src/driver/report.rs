// src/driver/report.rs
use crate::storage::ResumeState;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Size of the whole key space, used for the full-scan projection.
pub const FULL_KEY_SPACE: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Interrupted,
}

/// Statistics of one run, computed once from the final state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub tested: usize,
    pub found: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub with_address: usize,
    pub elapsed: Duration,
    pub total_found: usize, // Whole output, earlier runs included
}

impl RunReport {
    /// Builds the report for the keys processed by this run.
    pub fn new(outcome: RunOutcome, state: &ResumeState, processed: &[u64], elapsed: Duration) -> Self {
        let found_rows: Vec<_> = processed
            .iter()
            .filter_map(|key| state.get(*key))
            .filter(|row| row.is_found())
            .collect();

        Self {
            outcome,
            tested: processed.len(),
            found: found_rows.len(),
            with_email: found_rows.iter().filter(|row| !row.email.is_empty()).count(),
            with_phone: found_rows.iter().filter(|row| !row.phone.is_empty()).count(),
            with_address: found_rows.iter().filter(|row| !row.address.is_empty()).count(),
            elapsed,
            total_found: state.found_count(),
        }
    }

    pub fn not_found(&self) -> usize {
        self.tested - self.found
    }

    /// Share of tested keys holding a club, in percent.
    pub fn success_rate(&self) -> f64 {
        percent(self.found, self.tested)
    }

    pub fn seconds_per_key(&self) -> f64 {
        if self.tested == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() / self.tested as f64
    }

    pub fn keys_per_second(&self) -> f64 {
        rate(self.tested as u64, self.elapsed)
    }

    /// Time a scan of the whole key space would take at this run's pace.
    pub fn projected_full_scan(&self) -> Option<Duration> {
        eta(0, FULL_KEY_SPACE, self.keys_per_second())
    }

    pub fn log(&self) {
        match self.outcome {
            RunOutcome::Completed => tracing::info!("Scan completed"),
            RunOutcome::Interrupted => tracing::info!("Scan interrupted, everything processed so far is saved"),
        }
        tracing::info!(
            "Clubs found: {}/{} ({:.2}%), not found: {}, total in output: {}",
            self.found,
            self.tested,
            self.success_rate(),
            self.not_found(),
            self.total_found
        );
        tracing::info!(
            "Time: {:.2}s total, {:.2}s per key, {:.2} keys/s",
            self.elapsed.as_secs_f64(),
            self.seconds_per_key(),
            self.keys_per_second()
        );
        if let Some(projection) = self.projected_full_scan() {
            tracing::info!(
                "Estimate for {} keys: {:.2} hours",
                FULL_KEY_SPACE,
                projection.as_secs_f64() / 3600.0
            );
        }
        if self.found > 0 {
            tracing::info!(
                "Data quality: email {}/{} ({:.1}%), phone {}/{} ({:.1}%), address {}/{} ({:.1}%)",
                self.with_email,
                self.found,
                percent(self.with_email, self.found),
                self.with_phone,
                self.found,
                percent(self.with_phone, self.found),
                self.with_address,
                self.found,
                percent(self.with_address, self.found)
            );
        }
    }
}

/// Pace of a scan, for per-window progress lines.
#[derive(Debug, Clone)]
pub struct Progress {
    total_keys: u64,
    done: u64,
}

impl Progress {
    pub fn new(total_keys: u64) -> Self {
        Self { total_keys, done: 0 }
    }

    pub fn advance(&mut self, keys: u64) {
        self.done = self.done.saturating_add(keys).min(self.total_keys);
    }

    pub fn remaining(&self) -> u64 {
        self.total_keys - self.done
    }

    /// Time left at the pace observed over `elapsed`.
    pub fn eta(&self, elapsed: Duration) -> Option<Duration> {
        eta(self.done, self.total_keys, rate(self.done, elapsed))
    }

    /// Wall-clock time the scan should end at.
    pub fn finish_at(&self, elapsed: Duration) -> Option<DateTime<Local>> {
        let eta = chrono::Duration::from_std(self.eta(elapsed)?).ok()?;
        Local::now().checked_add_signed(eta)
    }

    pub fn log_window(&self, window_found: usize, window_time: Duration, total_found: usize, elapsed: Duration) {
        tracing::info!(
            "Window done: {} clubs in {:.1}s ({}/{} keys, {} left)",
            window_found,
            window_time.as_secs_f64(),
            self.done,
            self.total_keys,
            self.remaining()
        );
        match (self.eta(elapsed), self.finish_at(elapsed)) {
            (Some(eta), Some(finish)) => tracing::info!(
                "Total: {} clubs | Rate: {:.1} keys/s | ETA: {:.1}h (around {})",
                total_found,
                rate(self.done, elapsed),
                eta.as_secs_f64() / 3600.0,
                finish.format("%Y-%m-%d %H:%M")
            ),
            _ => tracing::info!("Total: {} clubs", total_found),
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

fn rate(keys: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        keys as f64 / secs
    } else {
        0.0
    }
}

fn eta(done: u64, total: u64, keys_per_second: f64) -> Option<Duration> {
    if keys_per_second <= 0.0 {
        return None;
    }
    let remaining = total.saturating_sub(done) as f64;
    Some(Duration::from_secs_f64(remaining / keys_per_second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreRow;

    fn club(key: u64, email: &str, phone: &str) -> StoreRow {
        StoreRow {
            name: format!("CLUB NUMERO {}", key),
            email: email.to_string(),
            phone: phone.to_string(),
            ..StoreRow::absent(key, None)
        }
    }

    #[test]
    fn test_report_counts_only_this_run() {
        let mut state = ResumeState::default();
        state.insert(club(1, "a@club.fr", "0556000000")); // earlier run
        state.insert(club(10, "b@club.fr", ""));
        state.insert(club(11, "", "0556111111"));
        state.insert(StoreRow::absent(12, None));
        state.insert(StoreRow::absent(13, None));

        let report = RunReport::new(RunOutcome::Completed, &state, &[10, 11, 12, 13], Duration::from_secs(8));
        assert_eq!(report.tested, 4);
        assert_eq!(report.found, 2);
        assert_eq!(report.not_found(), 2);
        assert_eq!(report.total_found, 3);
        assert_eq!((report.with_email, report.with_phone, report.with_address), (1, 1, 0));
        assert!((report.success_rate() - 50.0).abs() < 1e-9);
        assert!((report.seconds_per_key() - 2.0).abs() < 1e-9);
        assert!((report.keys_per_second() - 0.5).abs() < 1e-9);
        assert_eq!(report.projected_full_scan(), Some(Duration::from_secs(60_000)));
    }

    #[test]
    fn test_empty_run_has_no_projection() {
        let report = RunReport::new(RunOutcome::Interrupted, &ResumeState::default(), &[], Duration::ZERO);
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.seconds_per_key(), 0.0);
        assert_eq!(report.projected_full_scan(), None);
    }

    #[test]
    fn test_progress_eta() {
        let mut progress = Progress::new(1_000);
        assert_eq!(progress.eta(Duration::from_secs(10)), None);
        progress.advance(250);
        assert_eq!(progress.remaining(), 750);
        assert_eq!(progress.eta(Duration::from_secs(50)), Some(Duration::from_secs(150)));
        assert!(progress.finish_at(Duration::from_secs(50)).is_some());
        progress.advance(5_000);
        assert_eq!(progress.remaining(), 0);
    }
}
