pub mod agent;
pub mod config;
pub mod display;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod prompt;
pub mod recipe;
pub mod refusal;
pub mod server;
pub mod service;
pub mod session;
