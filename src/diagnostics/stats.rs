use serde::Serialize;
use std::time::Instant;

/// Collects diagnostic statistics for a preview session.
pub struct DiagnosticStats {
    converted_count: u64,
    skipped_count: u64,
    failed_count: u64,
    reallocation_count: u64,
    total_bytes: u64,
    start_time: Instant,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub converted_count: u64,
    pub skipped_count: u64,
    pub failed_count: u64,
    pub reallocation_count: u64,
    pub skip_rate: f64,
    pub bandwidth_bps: u64,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            converted_count: 0,
            skipped_count: 0,
            failed_count: 0,
            reallocation_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a successfully converted frame.
    pub fn record_converted(&mut self, bytes: usize) {
        self.converted_count += 1;
        self.total_bytes += bytes as u64;
    }

    /// Record a notification that found no image.
    pub fn record_skip(&mut self) {
        self.skipped_count += 1;
    }

    /// Record a frame whose conversion failed.
    pub fn record_failure(&mut self) {
        self.failed_count += 1;
    }

    /// Record a destination texture reallocation.
    pub fn record_reallocation(&mut self) {
        self.reallocation_count += 1;
    }

    /// Calculate conversion FPS based on elapsed time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.converted_count as f64 / elapsed
    }

    /// Skipped and failed frames as a percentage of all attempts (0.0 - 100.0).
    pub fn skip_rate(&self) -> f64 {
        let missed = self.skipped_count + self.failed_count;
        let total = self.converted_count + missed;
        if total == 0 {
            return 0.0;
        }
        (missed as f64 / total as f64) * 100.0
    }

    /// Converted bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            converted_count: self.converted_count,
            skipped_count: self.skipped_count,
            failed_count: self.failed_count,
            reallocation_count: self.reallocation_count,
            skip_rate: self.skip_rate(),
            bandwidth_bps: self.bandwidth_bps(),
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn initialises_with_zero_values() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.converted_count, 0);
        assert_eq!(stats.skipped_count, 0);
        assert_eq!(stats.failed_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.reallocation_count, 0);
    }

    #[test]
    fn record_converted_increments_count() {
        let mut stats = DiagnosticStats::new();
        stats.record_converted(1000);
        stats.record_converted(1000);
        assert_eq!(stats.converted_count, 2);
        assert_eq!(stats.total_bytes, 2000);
    }

    #[test]
    fn fps_is_positive_after_frames() {
        let mut stats = DiagnosticStats::new();
        for _ in 0..30 {
            stats.record_converted(1000);
        }
        thread::sleep(Duration::from_millis(100));
        let fps = stats.fps();
        assert!(fps > 0.0, "fps should be positive, got {fps}");
    }

    #[test]
    fn skip_rate_counts_skips_and_failures() {
        let mut stats = DiagnosticStats::new();
        stats.record_converted(1000);
        stats.record_converted(1000);
        stats.record_skip();
        stats.record_failure();
        // 2 missed out of 4 attempts
        assert!((stats.skip_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn skip_rate_zero_when_no_events() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.skip_rate(), 0.0);
    }

    #[test]
    fn bandwidth_bps_tracks_bytes() {
        let mut stats = DiagnosticStats::new();
        stats.record_converted(10_000);
        thread::sleep(Duration::from_millis(50));
        let bps = stats.bandwidth_bps();
        assert!(bps > 0, "bandwidth should be positive, got {bps}");
    }

    #[test]
    fn snapshot_serialises_to_camelcase() {
        let mut stats = DiagnosticStats::new();
        stats.record_converted(5000);
        stats.record_reallocation();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["convertedCount"], 1);
        assert_eq!(json["reallocationCount"], 1);
        assert!(json["skipRate"].is_number());
        assert!(json["bandwidthBps"].is_number());
        assert!(json.get("latencyMs").is_none());
    }
}
