//! Per-port frame counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time copy of a port's counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortCounters {
    pub frames_received: u64,
    pub bytes_received: u64,
    /// Frames read but not meant for this port (own frames, other ethertypes)
    pub frames_skipped: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
    pub duration: Duration,
}

impl PortCounters {
    pub fn receive_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.frames_received as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of sends that failed, as a percentage
    pub fn send_error_rate(&self) -> f64 {
        let attempts = self.frames_sent + self.send_errors;
        if attempts == 0 {
            return 0.0;
        }
        (self.send_errors as f64 / attempts as f64) * 100.0
    }
}

impl fmt::Display for PortCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx {} frames ({} bytes, {} skipped), tx {} frames ({} bytes, {} errors) over {:.0}s",
            self.frames_received,
            self.bytes_received,
            self.frames_skipped,
            self.frames_sent,
            self.bytes_sent,
            self.send_errors,
            self.duration.as_secs_f64()
        )
    }
}

/// Counters shared between a port's receive thread and its sender
#[derive(Debug, Clone)]
pub struct PortStats {
    frames_received: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    frames_skipped: Arc<AtomicU64>,
    frames_sent: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    send_errors: Arc<AtomicU64>,
    start_time: Instant,
}

impl PortStats {
    pub fn new() -> Self {
        Self {
            frames_received: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            frames_skipped: Arc::new(AtomicU64::new(0)),
            frames_sent: Arc::new(AtomicU64::new(0)),
            bytes_sent: Arc::new(AtomicU64::new(0)),
            send_errors: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self, size: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, size: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PortCounters {
        PortCounters {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            duration: self.start_time.elapsed(),
        }
    }
}

impl Default for PortStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters_accumulate() {
        let stats = PortStats::new();

        stats.record_received(64);
        stats.record_received(128);
        stats.record_skipped();
        stats.record_sent(60);
        stats.record_send_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.bytes_received, 192);
        assert_eq!(snapshot.frames_skipped, 1);
        assert_eq!(snapshot.frames_sent, 1);
        assert_eq!(snapshot.bytes_sent, 60);
        assert_eq!(snapshot.send_errors, 1);
        assert_eq!(snapshot.send_error_rate(), 50.0);
    }

    #[test]
    fn test_error_rate_without_sends() {
        assert_eq!(PortCounters::default().send_error_rate(), 0.0);
        assert_eq!(PortCounters::default().receive_rate(), 0.0);
    }

    #[test]
    fn test_shared_between_threads() {
        let stats = PortStats::new();
        let receiver = stats.clone();

        let handle = thread::spawn(move || {
            for _ in 0..100 {
                receiver.record_received(60);
            }
        });
        for _ in 0..100 {
            stats.record_sent(60);
        }
        handle.join().unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_received, 100);
        assert_eq!(snapshot.frames_sent, 100);
    }

    #[test]
    fn test_display() {
        let counters = PortCounters {
            frames_received: 10,
            bytes_received: 600,
            frames_sent: 5,
            bytes_sent: 300,
            ..Default::default()
        };
        let text = counters.to_string();
        assert!(text.contains("rx 10 frames (600 bytes"));
        assert!(text.contains("tx 5 frames (300 bytes, 0 errors)"));
    }
}
