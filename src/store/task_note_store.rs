use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::note::{Note, NoteChanges};
use crate::models::task::{Priority, Task};
use crate::store::StoreError;
use crate::store::db::{DB, load_db, save_db};

const TASKS_FILE: &str = "tasks.json";
const NOTES_FILE: &str = "notes.json";

/// Per-user task and note lists persisted as JSON files.
///
/// Every mutation is applied to a copy, written to disk, and only then swapped
/// in, so a failed write leaves memory and disk in agreement.
pub struct TaskNoteStore {
    tasks: Mutex<DB<Vec<Task>>>,
    notes: Mutex<DB<Vec<Note>>>,
    tasks_path: PathBuf,
    notes_path: PathBuf,
}

/// Smallest positive integer not already taken.
pub fn next_free_id(used: impl IntoIterator<Item = u32>) -> u32 {
    let used: HashSet<u32> = used.into_iter().collect();
    (1..).find(|id| !used.contains(id)).unwrap_or(1)
}

impl TaskNoteStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let tasks_path = dir.join(TASKS_FILE);
        let notes_path = dir.join(NOTES_FILE);
        let tasks = load_db(&tasks_path)?;
        let notes = load_db(&notes_path)?;
        Ok(Self {
            tasks: Mutex::new(tasks),
            notes: Mutex::new(notes),
            tasks_path,
            notes_path,
        })
    }

    pub async fn add_task(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
        priority: Priority,
    ) -> Result<Task, StoreError> {
        let mut db = self.tasks.lock().await;
        let mut next = db.clone();
        let list = next.entry(user_id.to_string()).or_default();
        let task = Task {
            id: next_free_id(list.iter().map(|t| t.id)),
            title: title.to_string(),
            description: description.to_string(),
            priority,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        list.push(task.clone());
        save_db(&self.tasks_path, &next).await?;
        *db = next;
        debug!(user_id, task_id = task.id, "task added");
        Ok(task)
    }

    /// Newest first.
    pub async fn get_tasks(&self, user_id: &str, include_completed: bool) -> Vec<Task> {
        let db = self.tasks.lock().await;
        let mut tasks: Vec<Task> = db
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|t| include_completed || !t.completed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tasks
    }

    pub async fn get_task(&self, user_id: &str, id: u32) -> Option<Task> {
        let db = self.tasks.lock().await;
        db.get(user_id)?.iter().find(|t| t.id == id).cloned()
    }

    pub async fn complete_task(&self, user_id: &str, id: u32) -> Result<Task, StoreError> {
        let mut db = self.tasks.lock().await;
        let mut next = db.clone();
        let task = next
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|t| t.id == id))
            .ok_or(StoreError::TaskNotFound(id))?;
        task.completed = true;
        task.completed_at = Some(Utc::now());
        let task = task.clone();
        save_db(&self.tasks_path, &next).await?;
        *db = next;
        Ok(task)
    }

    pub async fn delete_task(&self, user_id: &str, id: u32) -> Result<Task, StoreError> {
        let mut db = self.tasks.lock().await;
        let mut next = db.clone();
        let list = next.get_mut(user_id).ok_or(StoreError::TaskNotFound(id))?;
        let idx = list
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::TaskNotFound(id))?;
        let removed = list.remove(idx);
        save_db(&self.tasks_path, &next).await?;
        *db = next;
        Ok(removed)
    }

    pub async fn search_tasks(&self, user_id: &str, query: &str) -> Vec<Task> {
        self.get_tasks(user_id, true)
            .await
            .into_iter()
            .filter(|t| t.matches(query))
            .collect()
    }

    pub async fn add_note(
        &self,
        user_id: &str,
        title: &str,
        content: &str,
        tags: BTreeSet<String>,
    ) -> Result<Note, StoreError> {
        let mut db = self.notes.lock().await;
        let mut next = db.clone();
        let list = next.entry(user_id.to_string()).or_default();
        let now = Utc::now();
        let note = Note {
            id: next_free_id(list.iter().map(|n| n.id)),
            title: title.to_string(),
            content: content.to_string(),
            tags,
            created_at: now,
            updated_at: now,
        };
        list.push(note.clone());
        save_db(&self.notes_path, &next).await?;
        *db = next;
        debug!(user_id, note_id = note.id, "note added");
        Ok(note)
    }

    /// Most recently updated first.
    pub async fn get_notes(&self, user_id: &str) -> Vec<Note> {
        let db = self.notes.lock().await;
        let mut notes = db.get(user_id).cloned().unwrap_or_default();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        notes
    }

    pub async fn get_note(&self, user_id: &str, id: u32) -> Option<Note> {
        let db = self.notes.lock().await;
        db.get(user_id)?.iter().find(|n| n.id == id).cloned()
    }

    pub async fn update_note(
        &self,
        user_id: &str,
        id: u32,
        changes: NoteChanges,
    ) -> Result<Note, StoreError> {
        let mut db = self.notes.lock().await;
        let mut next = db.clone();
        let note = next
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|n| n.id == id))
            .ok_or(StoreError::NoteNotFound(id))?;
        if let Some(title) = changes.title {
            note.title = title;
        }
        if let Some(content) = changes.content {
            note.content = content;
        }
        if let Some(tags) = changes.tags {
            note.tags = tags;
        }
        note.updated_at = Utc::now();
        let note = note.clone();
        save_db(&self.notes_path, &next).await?;
        *db = next;
        Ok(note)
    }

    pub async fn delete_note(&self, user_id: &str, id: u32) -> Result<Note, StoreError> {
        let mut db = self.notes.lock().await;
        let mut next = db.clone();
        let list = next.get_mut(user_id).ok_or(StoreError::NoteNotFound(id))?;
        let idx = list
            .iter()
            .position(|n| n.id == id)
            .ok_or(StoreError::NoteNotFound(id))?;
        let removed = list.remove(idx);
        save_db(&self.notes_path, &next).await?;
        *db = next;
        Ok(removed)
    }

    pub async fn search_notes(&self, user_id: &str, query: &str) -> Vec<Note> {
        self.get_notes(user_id)
            .await
            .into_iter()
            .filter(|n| n.matches(query))
            .collect()
    }
}
