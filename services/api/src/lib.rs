pub mod config;
pub mod error;
pub mod openai_adapter;
pub mod prompt_loader;
pub mod routes;
pub mod state;
