//! Defines structures and types for progress reporting.
//!
//! Progress is advisory: the loaders emit updates through a callback seam
//! so the library stays free of any terminal UI concern. The CLI binary
//! wires this to indicatif bars.

/// Represents a snapshot of the progress during a long-running operation.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// A description of the current stage (e.g., "Pass 1/2: Loading entries").
    pub stage_description: String,
    /// Number of items processed in the current stage.
    pub current_item: u64,
    /// Total number of items expected in the current stage (if calculable).
    pub total_items: Option<u64>,
    /// An optional message providing more context (e.g., the current term).
    pub message: Option<String>,
}

/// Type alias for the progress callback function.
///
/// The callback receives a `ProgressUpdate`; its return value is currently
/// ignored by the loaders (cancellation is not part of the load contract —
/// a run either completes or fails outright).
pub type ProgressCallback = Box<dyn FnMut(ProgressUpdate) -> bool + Send + Sync>;

impl ProgressUpdate {
    /// Creates a new progress update for the start of a stage.
    pub fn new_stage(description: String, total_items: Option<u64>) -> Self {
        ProgressUpdate {
            stage_description: description,
            current_item: 0,
            total_items,
            message: None,
        }
    }
}
