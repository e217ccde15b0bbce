pub mod calendar_service;
pub mod classifier;
pub mod i18n;
pub mod openai_service;
pub mod presentation;
