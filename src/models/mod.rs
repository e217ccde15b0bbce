pub mod chat;
pub mod event;
pub mod intent;
pub mod note;
pub mod task;
