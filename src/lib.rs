pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod model;
pub mod output;
pub mod tools;
pub mod tts;
pub mod web;
