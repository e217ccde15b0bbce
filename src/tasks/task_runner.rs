use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinHandle;
use tracing::info;

type BackgroundTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Collects background jobs during startup and spawns them together.
pub struct TaskRunner {
    tasks: Vec<(&'static str, BackgroundTask)>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name, Box::pin(task)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn start_all(self) -> Vec<JoinHandle<()>> {
        self.tasks
            .into_iter()
            .map(|(name, task)| {
                info!(task = name, "starting background task");
                tokio::spawn(task)
            })
            .collect()
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}
