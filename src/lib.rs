//! Wellness Assist: a wellness chat assistant with doctor-consultation handoff.

pub mod agent;
pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod language;
pub mod llm;
pub mod routes;
pub mod service;
pub mod session;
pub mod store;
pub mod tools;
