pub mod callback;
pub mod machine;
pub mod parse;
pub mod session;
