pub mod audit;
pub mod config;
pub mod error;
pub mod llm;
pub mod questions;
pub mod resolve;
pub mod scoring;
pub mod serper;
pub mod server;
pub mod types;
pub mod verdict;
