//! Progress reporting for long-running parses.
//!
//! A [`Progress`] value is produced at four points of a parse: when it
//! starts, after each full batch, and when it completes or fails. Each value
//! is delivered twice: as a [`ParseEvent::Progress`](crate::event::ParseEvent::Progress)
//! in the event stream and, if one was configured, through a
//! [`ProgressCallback`] called synchronously with the same value.
//!
//! # Example
//!
//! ```rust
//! use chatimport::progress::{Progress, ProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     if let Some(pct) = progress.percentage() {
//!         println!("{:?}: {:.1}%", progress.stage, pct);
//!     }
//! });
//!
//! callback(&Progress::new(Stage::Parsing, 500, 1000, 42, "Parsed 42 messages"));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Phase of a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Parsing,
    Done,
    Error,
}

/// Snapshot of parse progress.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Phase of the parse.
    pub stage: Stage,

    /// Raw bytes consumed from the file so far. Never decreases.
    pub bytes_processed: u64,

    /// Size of the file in bytes.
    pub total_bytes: u64,

    /// Messages accepted so far.
    pub items_processed: usize,

    /// Human-readable status line.
    pub message: String,
}

impl Progress {
    /// Creates a new progress instance.
    pub fn new(
        stage: Stage,
        bytes_processed: u64,
        total_bytes: u64,
        items_processed: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            bytes_processed,
            total_bytes,
            items_processed,
            message: message.into(),
        }
    }

    /// Returns the progress as a percentage (0.0 - 100.0).
    ///
    /// Returns `None` while the file size is unknown (zero), unless the
    /// parse is already done.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatimport::progress::{Progress, Stage};
    ///
    /// let progress = Progress::new(Stage::Parsing, 500, 1000, 50, "");
    /// assert_eq!(progress.percentage(), Some(50.0));
    /// ```
    pub fn percentage(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return (self.stage == Stage::Done).then_some(100.0);
        }
        let pct = (self.bytes_processed as f64 / self.total_bytes as f64) * 100.0;
        Some(pct.min(100.0))
    }

    /// Returns whether the parse finished successfully.
    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Returns the remaining bytes to process.
    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.bytes_processed)
    }
}

/// Callback type for receiving progress updates.
///
/// Called on the thread that drives the event stream, before the matching
/// progress event is handed to the consumer.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Creates a progress callback that logs each update through `tracing`.
///
/// Useful for CLI applications that want progress output without drawing a
/// progress bar.
pub fn log_progress() -> ProgressCallback {
    Arc::new(|progress| {
        tracing::info!(
            stage = ?progress.stage,
            bytes = progress.bytes_processed,
            total = progress.total_bytes,
            items = progress.items_processed,
            "{}",
            progress.message
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let progress = Progress::new(Stage::Parsing, 500, 1000, 50, "");
        assert_eq!(progress.percentage(), Some(50.0));
    }

    #[test]
    fn test_progress_percentage_unknown_total() {
        let progress = Progress::new(Stage::Parsing, 500, 0, 50, "");
        assert_eq!(progress.percentage(), None);

        let done = Progress::new(Stage::Done, 0, 0, 0, "");
        assert_eq!(done.percentage(), Some(100.0));
    }

    #[test]
    fn test_progress_percentage_is_capped() {
        let progress = Progress::new(Stage::Parsing, 1500, 1000, 0, "");
        assert_eq!(progress.percentage(), Some(100.0));
    }

    #[test]
    fn test_progress_is_complete() {
        assert!(Progress::new(Stage::Done, 1000, 1000, 100, "").is_complete());
        assert!(!Progress::new(Stage::Parsing, 1000, 1000, 100, "").is_complete());
        assert!(!Progress::new(Stage::Error, 10, 1000, 1, "").is_complete());
    }

    #[test]
    fn test_progress_remaining_bytes() {
        let progress = Progress::new(Stage::Parsing, 300, 1000, 30, "");
        assert_eq!(progress.remaining_bytes(), 700);
        let over = Progress::new(Stage::Parsing, 3000, 1000, 30, "");
        assert_eq!(over.remaining_bytes(), 0);
    }

    #[test]
    fn test_stage_serde() {
        assert_eq!(serde_json::to_string(&Stage::Done).unwrap(), "\"done\"");
        assert_eq!(Stage::default(), Stage::Parsing);
    }

    #[test]
    fn test_progress_callback_type() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = counter.clone();

        let callback: ProgressCallback = Arc::new(move |progress| {
            counter_clone.store(progress.bytes_processed, Ordering::SeqCst);
        });

        callback(&Progress::new(Stage::Parsing, 42, 100, 0, ""));
        assert_eq!(counter.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_log_progress_does_not_panic() {
        let callback = log_progress();
        callback(&Progress::default());
    }
}
