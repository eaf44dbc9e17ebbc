//! Progress reporting and cancellation for long imports.

/// Where an import stands. Sent once when a stage starts (`current_item == 0`)
/// and again after each stored word.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Stage label shown next to the bar, "Storing words" during a store.
    pub stage_description: String,
    /// Words finished so far.
    pub current_item: u64,
    /// Words in the document, when known up front.
    pub total_items: Option<u64>,
    /// The word just stored, as `Word: <value>`.
    pub message: Option<String>,
}

/// Receives every [`ProgressUpdate`]. Answering `false` stops the import
/// before the next word and rolls back the whole transaction.
pub type ProgressCallback = Box<dyn FnMut(ProgressUpdate) -> bool + Send + Sync>;

impl ProgressUpdate {
    pub fn new_stage(description: String, total_items: Option<u64>) -> Self {
        ProgressUpdate {
            stage_description: description,
            current_item: 0,
            total_items,
            message: None,
        }
    }
}
