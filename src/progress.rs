//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn CleanupProgressCallback>`] via
//! [`crate::config::CleanupConfigBuilder::progress_callback`] to hear about
//! each stage as the driver runs it. The CLI uses this to draw its progress
//! bar; library callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use svgmap_clean::{CleanupConfig, CleanupProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl CleanupProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, _index: usize, name: &str, bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {bytes} bytes");
//!     }
//! }
//!
//! let config = CleanupConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline driver as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 0-based.
pub trait CleanupProgressCallback: Send + Sync {
    /// Called once before the first stage.
    fn on_pipeline_start(&self, total_stages: usize) {
        let _ = total_stages;
    }

    /// Called just before a stage is applied.
    fn on_stage_start(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called when a stage's output passed validation.
    ///
    /// # Arguments
    /// * `bytes` — length of the accepted document
    fn on_stage_complete(&self, index: usize, name: &str, bytes: usize) {
        let _ = (index, name, bytes);
    }

    /// Called when a stage raised or produced malformed XML. No later stage
    /// runs after this.
    fn on_stage_failed(&self, index: usize, name: &str, error: &str) {
        let _ = (index, name, error);
    }

    /// Called once after the driver stops, whether it finished or aborted.
    fn on_pipeline_complete(&self, completed: usize, total_stages: usize) {
        let _ = (completed, total_stages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CleanupProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CleanupConfig`].
pub type ProgressCallback = Arc<dyn CleanupProgressCallback>;
