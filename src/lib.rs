pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod integrations;
pub mod middleware;
pub mod render;
pub mod services;
pub mod types;

#[cfg(test)]
pub mod testing;
