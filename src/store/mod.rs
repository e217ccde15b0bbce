pub mod db;
pub mod task_note_store;

use thiserror::Error;

pub use task_note_store::TaskNoteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task {0} not found")]
    TaskNotFound(u32),

    #[error("Note {0} not found")]
    NoteNotFound(u32),
}
