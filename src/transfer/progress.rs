//! Transfer progress tracking

use std::time::{Duration, Instant};

/// Progress tracker for one file transfer
pub struct TransferProgress {
    total_bytes: i64,
    transferred_bytes: i64,
    start_time: Instant,
}

impl TransferProgress {
    /// Create a new progress tracker; total of -1 means unknown length
    pub fn new(total_bytes: i64) -> Self {
        Self {
            total_bytes,
            transferred_bytes: 0,
            start_time: Instant::now(),
        }
    }

    /// Record the running byte count reported by the transfer
    pub fn update(&mut self, bytes_transferred: i64) {
        self.transferred_bytes = bytes_transferred;
    }

    pub fn transferred_bytes(&self) -> i64 {
        self.transferred_bytes
    }

    pub fn total_bytes(&self) -> i64 {
        self.total_bytes
    }

    /// Current progress percentage, None while the total is unknown
    pub fn percentage(&self) -> Option<f64> {
        if self.total_bytes <= 0 {
            None
        } else {
            Some((self.transferred_bytes as f64 / self.total_bytes as f64) * 100.0)
        }
    }

    /// Transfer speed in bytes per second
    pub fn speed_bps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transferred_bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Elapsed time since the transfer started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_with_known_total() {
        let mut progress = TransferProgress::new(1000);
        progress.update(250);
        assert_eq!(progress.percentage(), Some(25.0));
        progress.update(1000);
        assert_eq!(progress.percentage(), Some(100.0));
    }

    #[test]
    fn test_percentage_unknown_total() {
        let mut progress = TransferProgress::new(-1);
        progress.update(4096);
        assert_eq!(progress.percentage(), None);
        assert_eq!(progress.transferred_bytes(), 4096);
    }
}
