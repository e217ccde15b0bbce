pub mod calcom_client;
pub mod openai_client;
