//! Metrics recorder for upload sessions

use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!(
        "chunkdav_sessions_started_total",
        "Total number of upload sessions started"
    );
    describe_counter!(
        "chunkdav_sessions_completed_total",
        "Total number of upload sessions verified on the server"
    );
    describe_counter!(
        "chunkdav_sessions_failed_total",
        "Total number of upload sessions that failed, by stage"
    );
    describe_gauge!(
        "chunkdav_active_sessions",
        "Number of upload sessions currently running"
    );

    describe_counter!(
        "chunkdav_chunks_uploaded_total",
        "Total number of chunks staged on the server"
    );
    describe_counter!(
        "chunkdav_bytes_uploaded_total",
        "Total chunk bytes staged on the server"
    );

    describe_histogram!(
        "chunkdav_chunk_upload_duration_seconds",
        "Time to upload a single chunk"
    );
    describe_histogram!(
        "chunkdav_assembly_duration_seconds",
        "Time the server took to assemble staged chunks"
    );
    describe_histogram!(
        "chunkdav_session_duration_seconds",
        "Total duration of successful upload sessions"
    );
}

/// Record a chunk confirmed by the server
pub fn record_chunk_uploaded(size: u64, duration: Duration) {
    counter!("chunkdav_chunks_uploaded_total").increment(1);
    counter!("chunkdav_bytes_uploaded_total").increment(size);
    histogram!("chunkdav_chunk_upload_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_assembly_duration(duration: Duration) {
    histogram!("chunkdav_assembly_duration_seconds").record(duration.as_secs_f64());
}

/// Tracks one session from start to its terminal outcome
pub struct SessionMetrics {
    start_time: Instant,
}

impl SessionMetrics {
    pub fn start() -> Self {
        counter!("chunkdav_sessions_started_total").increment(1);
        gauge!("chunkdav_active_sessions").increment(1.0);

        Self {
            start_time: Instant::now(),
        }
    }

    pub fn complete(self) {
        counter!("chunkdav_sessions_completed_total").increment(1);
        gauge!("chunkdav_active_sessions").decrement(1.0);
        histogram!("chunkdav_session_duration_seconds").record(self.elapsed().as_secs_f64());
    }

    pub fn fail(self, stage: &str) {
        counter!("chunkdav_sessions_failed_total", "stage" => stage.to_string()).increment(1);
        gauge!("chunkdav_active_sessions").decrement(1.0);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Helper struct to time individual chunk uploads
pub struct ChunkTimer {
    start_time: Instant,
}

impl ChunkTimer {
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Stop timing and record the staged chunk
    pub fn stop(self, size: u64) {
        record_chunk_uploaded(size, self.start_time.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_session_metrics() {
        let metrics = SessionMetrics::start();
        assert!(metrics.elapsed() >= Duration::ZERO);
        metrics.fail("uploading");

        SessionMetrics::start().complete();
    }

    #[test]
    fn test_chunk_timer() {
        let timer = ChunkTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        timer.stop(1024);
    }
}
