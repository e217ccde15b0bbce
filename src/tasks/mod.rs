pub mod agenda_loop;
pub mod task_runner;
